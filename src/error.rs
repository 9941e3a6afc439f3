// ── Nixora: Error Types ────────────────────────────────────────────────────
// Single canonical error enum for the agent, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (Provider, Tool, Validation…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • Tool-layer errors never cross the stream boundary as panics — the
//     dispatcher converts them into error-shaped `ToolResult`s.
//   • No variant carries secret material (API keys) in its message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Model backend HTTP or API-level failure. Fatal to the current turn.
    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    /// Tool execution failure. Recovered locally, the turn continues.
    #[error("Tool error: {tool}: {message}")]
    Tool { tool: String, message: String },

    /// Bad transfer amount / address. Returned as a structured rejection,
    /// never attempted on-chain.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Explicit deadline race lost on a slow analysis call.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Startup configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all. Prefer adding a specific variant over using this in new code.
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Create a provider error with name and message.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider { provider: provider.into(), message: message.into() }
    }

    /// Create a tool error with name and message.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool { tool: tool.into(), message: message.into() }
    }
}

// Allows `?` on functions still returning `Result<T, String>` inside
// functions that return `AgentResult<T>`.

impl From<String> for AgentError {
    fn from(s: String) -> Self {
        AgentError::Other(s)
    }
}

impl From<&str> for AgentError {
    fn from(s: &str) -> Self {
        AgentError::Other(s.to_string())
    }
}

/// All agent operations should return this type.
pub type AgentResult<T> = Result<T, AgentError>;
