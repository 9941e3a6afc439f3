// Nixora — Core types.
// The data structures that flow through the whole agent: chat messages,
// tool definitions and calls, stream chunks, and the client-facing frame
// protocol. They are independent of any specific model backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Messages ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message { role: Role::System, content: content.into(), tool_calls: None, tool_call_id: None, name: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message { role: Role::User, content: content.into(), tool_calls: None, tool_call_id: None, name: None }
    }

    /// Assistant turn that requested tool calls (content may be empty).
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            name: None,
        }
    }

    /// `role: tool` message carrying a serialized tool result.
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>, name: impl Into<String>) -> Self {
        Message {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
        }
    }
}

// ── Tool calling ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON text, possibly reassembled from many stream deltas.
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        ToolDefinition {
            tool_type: "function".into(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

// ── Streaming ──────────────────────────────────────────────────────────

/// One parsed event from the model's SSE stream. Carries either a content
/// delta, tool-call deltas, or both signals absent (heartbeat chunks).
#[derive(Debug, Clone, Default)]
pub struct StreamChunk {
    pub delta_text: Option<String>,
    pub tool_calls: Vec<ToolCallDelta>,
    pub finish_reason: Option<String>,
    /// Actual model name returned by the API, when present.
    pub model: Option<String>,
}

/// Partial tool-call data from a single stream event. A model may split one
/// call's name and JSON arguments across many of these.
#[derive(Debug, Clone)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub function_name: Option<String>,
    pub arguments_delta: Option<String>,
}

// ── Tool results ───────────────────────────────────────────────────────

/// Uniform handler outcome. Success/error is carried in-band because the
/// payload is forwarded verbatim into model context or chat text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub output: Value,
    pub success: bool,
}

impl ToolResult {
    pub fn ok(name: impl Into<String>, output: Value) -> Self {
        ToolResult { name: name.into(), output, success: true }
    }

    pub fn err(name: impl Into<String>, output: Value) -> Self {
        ToolResult { name: name.into(), output, success: false }
    }
}

// ── Transfer request ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDetails {
    pub recipient_address: String,
    /// Decimal string preserving the user's original precision.
    pub amount: String,
    pub token: String,
    pub estimated_gas: String,
    pub network_fee: String,
}

/// Description of transfer intent handed to the client-side wallet bridge.
/// Never carries key material; signing happens entirely in the wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub details: TransferDetails,
    pub message: String,
    pub timestamp: String,
}

impl TransferRequest {
    pub fn new(recipient_address: &str, amount: &str) -> Self {
        TransferRequest {
            status: "pending".into(),
            kind: "TRANSFER_REQUEST".into(),
            details: TransferDetails {
                recipient_address: recipient_address.into(),
                amount: amount.into(),
                token: "SUI".into(),
                estimated_gas: "0.000001".into(),
                network_fee: "0.00021".into(),
            },
            message: format!("Request to transfer {} SUI to {}", amount, recipient_address),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// ── Output frame protocol ──────────────────────────────────────────────
// The chat response is newline-delimited JSON envelopes with a `kind`
// field, so the consumer never has to pattern-match raw prose for markers.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    /// One content delta, forwarded in upstream order.
    Token { text: String },
    /// Raw tool result surfaced to the client before the continuation.
    ToolResult { name: String, data: Value },
    /// Transfer marker. `request` keeps the wallet-bridge envelope shape;
    /// `text` is the human-readable trailing prose.
    TransferRequest { request: Value, text: String },
    /// Terminal error envelope. Content already streamed is never retracted.
    Error { message: String },
    /// Exactly-once end-of-stream marker.
    Done,
}

/// Comment-style heartbeat line. Not a JSON frame by design so that naive
/// line parsers skip it the same way SSE comments are skipped.
pub const KEEPALIVE_LINE: &str = ": keepalive\n";

impl Frame {
    /// Serialize as one ndjson line.
    pub fn to_line(&self) -> String {
        // Frame serialization cannot fail: all payloads are already Values.
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| "{\"kind\":\"done\"}".into());
        line.push('\n');
        line
    }

    /// Parse one incoming line; `None` for keep-alives and blank lines.
    pub fn parse(line: &str) -> Option<Frame> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(':') {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }
}
