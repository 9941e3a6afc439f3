// Nixora — Intent classification.
// Decides whether a user utterance plausibly needs a tool, via keyword
// heuristics — no ML model required, fast & deterministic. Deliberately
// over-inclusive: a false positive still lets the model answer without
// calling a tool; a false negative degrades to a plain answer.

/// Phrases that route a message onto the tool-enabled path.
const TOOL_KEYWORDS: &[&str] = &[
    "price",
    "how much",
    "token",
    "search",
    "find",
    "what is",
    "sui tokens",
    "balance",
    "wallet",
    "send",
    "transfer",
    "sui to",
    "yield",
    "defi",
    "apy",
    "trending",
];

/// Pure mapping from message text to tool-eligibility. Case-insensitive.
pub fn needs_tools(message: &str) -> bool {
    let m = message.to_lowercase();
    contains_any(&m, TOOL_KEYWORDS)
}

fn contains_any(s: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| s.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive() {
        assert_eq!(needs_tools("SEND 5 SUI"), needs_tools("send 5 sui"));
        assert!(needs_tools("What Is The PRICE of BTC?"));
    }

    #[test]
    fn test_plain_chat_skips_tools() {
        assert!(!needs_tools("hello"));
        assert!(!needs_tools("tell me a joke"));
    }

    #[test]
    fn test_tool_worthy_phrases() {
        assert!(needs_tools("send 0.01 sui to 0xabc"));
        assert!(needs_tools("what's my wallet balance"));
        assert!(needs_tools("best defi yield right now"));
        assert!(needs_tools("how much is ETH worth"));
        assert!(needs_tools("search for sui ecosystem news"));
    }
}
