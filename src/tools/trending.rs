// Nixora — Trending tokens (DexScreener).
// Per-token detail lookups fan out concurrently; individual failures drop
// that token rather than the whole result.

use crate::error::{AgentError, AgentResult};
use crate::tools::Toolbox;
use futures::future::join_all;
use log::{info, warn};
use serde_json::{json, Value};

/// Only the highest-placed profiles get the detail fan-out.
const MAX_TRENDING_TOKENS: usize = 10;

#[derive(Debug, Clone)]
pub struct TokenEntry {
    pub profile: Value,
    pub pair_data: Option<Value>,
    pub error: Option<String>,
}

/// Keep only tokens whose detail lookup succeeded. Order is preserved.
pub fn finalize(entries: Vec<TokenEntry>) -> Vec<Value> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let pair = entry.pair_data?;
            let mut token = entry.profile;
            token["dexScreenerData"] = pair;
            Some(token)
        })
        .collect()
}

async fn fetch_pair_data(toolbox: &Toolbox, token_address: &str) -> AgentResult<Value> {
    let url = format!(
        "{}/tokens/v1/sui/{}",
        toolbox.config.dexscreener_api_base.trim_end_matches('/'),
        token_address
    );
    let resp = toolbox.http.get(&url).send().await?;
    if !resp.status().is_success() {
        return Err(AgentError::tool(
            "getTrendingTokens",
            format!("pair lookup returned status {}", resp.status()),
        ));
    }

    let pairs: Value = resp.json().await?;
    pairs
        .as_array()
        .and_then(|a| a.first().cloned())
        .ok_or_else(|| AgentError::tool("getTrendingTokens", "no pair data found"))
}

pub async fn get_trending_tokens(toolbox: &Toolbox) -> AgentResult<Value> {
    let url = format!(
        "{}/token-profiles/latest/v1",
        toolbox.config.dexscreener_api_base.trim_end_matches('/')
    );
    let resp = toolbox.http.get(&url).header("Accept", "application/json").send().await?;
    if !resp.status().is_success() {
        return Err(AgentError::tool(
            "getTrendingTokens",
            format!("profile feed returned status {}", resp.status()),
        ));
    }

    let profiles: Value = resp.json().await?;
    let Some(profiles) = profiles.as_array() else {
        return Err(AgentError::tool("getTrendingTokens", "unexpected profile feed shape"));
    };

    let sui_tokens: Vec<Value> = profiles
        .iter()
        .filter(|t| t["chainId"] == "sui" && t["tokenAddress"].as_str().is_some_and(|a| !a.is_empty()))
        .take(MAX_TRENDING_TOKENS)
        .cloned()
        .collect();
    info!("[trending] {} sui profiles in feed", sui_tokens.len());

    let lookups = sui_tokens.iter().map(|token| async {
        let address = token["tokenAddress"].as_str().unwrap_or_default();
        match fetch_pair_data(toolbox, address).await {
            Ok(pair) => TokenEntry { profile: token.clone(), pair_data: Some(pair), error: None },
            Err(e) => {
                warn!("[trending] detail lookup failed for {address}: {e}");
                TokenEntry { profile: token.clone(), pair_data: None, error: Some(e.to_string()) }
            }
        }
    });
    let detailed = finalize(join_all(lookups).await);

    Ok(json!({
        "success": true,
        "data": detailed,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(address: &str, pair: Option<Value>) -> TokenEntry {
        TokenEntry {
            profile: json!({ "tokenAddress": address, "chainId": "sui" }),
            error: pair.is_none().then(|| "lookup failed".to_string()),
            pair_data: pair,
        }
    }

    #[test]
    fn test_finalize_keeps_only_resolved_tokens() {
        let entries: Vec<TokenEntry> = (0..10)
            .map(|i| {
                let pair = (i >= 3).then(|| json!({ "priceUsd": "1.0" }));
                entry(&format!("0x{i}::t::T"), pair)
            })
            .collect();
        // 3 of 10 lookups failed — exactly 7 survive.
        let kept = finalize(entries);
        assert_eq!(kept.len(), 7);
        assert!(kept.iter().all(|t| !t["dexScreenerData"].is_null()));
    }

    #[test]
    fn test_finalize_preserves_feed_order() {
        let kept = finalize(vec![
            entry("0xa::t::A", Some(json!({}))),
            entry("0xb::t::B", None),
            entry("0xc::t::C", Some(json!({}))),
        ]);
        assert_eq!(kept[0]["tokenAddress"], "0xa::t::A");
        assert_eq!(kept[1]["tokenAddress"], "0xc::t::C");
    }

    #[test]
    fn test_finalize_empty_when_all_fail() {
        let kept = finalize(vec![entry("0xa::t::A", None)]);
        assert!(kept.is_empty());
    }
}
