// Nixora — Tool-call reassembly.
// A model may split one function call's name and JSON arguments across many
// stream events. This accumulator concatenates them and tracks completeness
// with an incremental brace-depth scan (string- and escape-aware) instead of
// a naive "contains a closing brace" check, so nested objects and `}` inside
// string values do not trigger premature parse attempts.
//
// Invariant: at most one in-flight fragment per stream — the protocol
// handles a single tool call per turn.

use crate::types::{FunctionCall, ToolCall, ToolCallDelta};

#[derive(Debug, Default)]
pub struct ToolCallFragment {
    id: String,
    name: String,
    arguments: String,
    // Brace-scanner state, advanced as argument text arrives.
    depth: i32,
    in_string: bool,
    escaped: bool,
    seen_open: bool,
}

impl ToolCallFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one stream delta into the fragment. The first non-empty `id`
    /// and `name` win; later deltas never overwrite them. Argument text is
    /// concatenated in arrival order.
    pub fn push(&mut self, delta: &ToolCallDelta) {
        if self.id.is_empty() {
            if let Some(id) = delta.id.as_deref() {
                if !id.is_empty() {
                    self.id = id.to_string();
                }
            }
        }
        if self.name.is_empty() {
            if let Some(name) = delta.function_name.as_deref() {
                if !name.is_empty() {
                    self.name = name.to_string();
                }
            }
        }
        if let Some(args) = delta.arguments_delta.as_deref() {
            self.scan(args);
            self.arguments.push_str(args);
        }
    }

    fn scan(&mut self, text: &str) {
        for ch in text.chars() {
            if self.escaped {
                self.escaped = false;
                continue;
            }
            match ch {
                '\\' if self.in_string => self.escaped = true,
                '"' => self.in_string = !self.in_string,
                '{' if !self.in_string => {
                    self.depth += 1;
                    self.seen_open = true;
                }
                '}' if !self.in_string => self.depth -= 1,
                _ => {}
            }
        }
    }

    /// The arguments buffer forms a balanced JSON object.
    pub fn is_complete(&self) -> bool {
        self.seen_open && self.depth == 0
    }

    pub fn has_data(&self) -> bool {
        !self.name.is_empty() || !self.arguments.is_empty()
    }

    /// Consume the fragment into a `ToolCall`, resetting the accumulator.
    /// An id is generated when the backend never supplied one.
    pub fn take(&mut self) -> ToolCall {
        let frag = std::mem::take(self);
        let id = if frag.id.is_empty() {
            format!("call_{}", uuid::Uuid::new_v4())
        } else {
            frag.id
        };
        ToolCall {
            id,
            call_type: "function".into(),
            function: FunctionCall { name: frag.name, arguments: frag.arguments },
        }
    }
}
