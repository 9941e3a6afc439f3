// Nixora — OpenAI-compatible model backend.
// Handles Atoma, Ollama, and any OpenAI-compatible REST API. The streaming
// call parses SSE lines incrementally and forwards parsed chunks through a
// channel so the orchestrator sees tokens as they arrive, not buffered.

use crate::error::{AgentError, AgentResult};
use crate::types::{Message, StreamChunk, ToolCallDelta, ToolDefinition};
use async_trait::async_trait;
use futures::StreamExt;
use log::{error, info, warn};
use serde_json::{json, Value};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Maximum retry attempts for transient backend errors.
const MAX_RETRIES: u32 = 3;
/// Initial retry delay in milliseconds (doubles each attempt, capped).
const INITIAL_RETRY_DELAY_MS: u64 = 1_000;
const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Parsed stream items delivered to the orchestrator. A transport failure
/// mid-stream arrives as an `Err` item and ends the stream.
pub type ChunkStream = ReceiverStream<AgentResult<StreamChunk>>;

/// Tool-calling knobs for one request.
#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub temperature: f64,
    pub max_tokens: u32,
}

// ── Provider trait ─────────────────────────────────────────────────────
// Constructor-injected collaborator seam: the orchestrator and handlers
// only see this trait, so tests substitute scripted fakes.

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Streaming chat completion. `tools` may be empty for plain turns;
    /// when non-empty, `tool_choice` is automatic.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        options: ChatOptions,
    ) -> AgentResult<ChunkStream>;

    /// Non-streaming completion, used for synthesis/analysis sub-calls.
    async fn chat(&self, messages: &[Message], model: &str, options: ChatOptions) -> AgentResult<String>;
}

// ── OpenAI-compatible implementation ───────────────────────────────────

pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        OpenAiCompatProvider {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        options: ChatOptions,
        stream: bool,
    ) -> Value {
        let mut body = json!({
            "model": model,
            "messages": messages,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
            "stream": stream,
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }
        body
    }

    /// Send with retries on transient statuses. Auth errors are never
    /// retried; non-retryable errors surface immediately.
    async fn send_with_retry(&self, body: &Value) -> AgentResult<reqwest::Response> {
        let url = self.completions_url();
        let mut last_error = String::new();

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff_delay(attempt - 1);
                warn!(
                    "[provider] retry {}/{} after {}ms",
                    attempt,
                    MAX_RETRIES,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = format!("HTTP request failed: {e}");
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let code = status.as_u16();
            let detail = response.text().await.unwrap_or_default();
            last_error = format!("API error {}: {}", code, truncate(&detail, 200));
            error!("[provider] {}", last_error);

            if code == 401 || code == 403 || !is_retryable_status(code) {
                return Err(AgentError::provider("openai-compat", last_error));
            }
        }

        Err(AgentError::provider("openai-compat", last_error))
    }

    /// Parse a single SSE data line from an OpenAI-compatible stream.
    /// Returns `None` for `[DONE]` and for malformed lines, which are the
    /// caller's signal to skip — one bad line never ends the stream.
    fn parse_sse_chunk(data: &str) -> Option<StreamChunk> {
        if data == "[DONE]" {
            return None;
        }

        let v: Value = serde_json::from_str(data).ok()?;
        let model = v["model"].as_str().map(|s| s.to_string());
        let choice = v["choices"].get(0)?;
        let delta = &choice["delta"];
        let finish_reason = choice["finish_reason"].as_str().map(|s| s.to_string());
        let delta_text = delta["content"].as_str().map(|s| s.to_string());

        let mut tool_calls = Vec::new();
        if let Some(tcs) = delta["tool_calls"].as_array() {
            for tc in tcs {
                let func = &tc["function"];
                tool_calls.push(ToolCallDelta {
                    index: tc["index"].as_u64().unwrap_or(0) as usize,
                    id: tc["id"].as_str().map(|s| s.to_string()),
                    function_name: func["name"].as_str().map(|s| s.to_string()),
                    arguments_delta: func["arguments"].as_str().map(|s| s.to_string()),
                });
            }
        }

        Some(StreamChunk { delta_text, tool_calls, finish_reason, model })
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        options: ChatOptions,
    ) -> AgentResult<ChunkStream> {
        let body = Self::request_body(messages, tools, model, options, true);
        info!("[provider] stream request model={} tools={}", model, tools.len());

        let response = self.send_with_retry(&body).await?;

        // Reader task: split the byte stream into SSE lines, parse each,
        // forward chunks. Exits when the consumer drops the receiver.
        let (tx, rx) = mpsc::channel::<AgentResult<StreamChunk>>(32);
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(result) = byte_stream.next().await {
                let bytes = match result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(AgentError::provider(
                                "openai-compat",
                                format!("stream read error: {e}"),
                            )))
                            .await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete SSE lines; keep the partial tail buffered.
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer.drain(..=line_end);

                    let Some(data) = line.strip_prefix("data: ") else { continue };
                    if data == "[DONE]" {
                        return;
                    }
                    match Self::parse_sse_chunk(data) {
                        Some(chunk) => {
                            if tx.send(Ok(chunk)).await.is_err() {
                                return; // consumer gone — stop reading upstream
                            }
                        }
                        None => warn!("[provider] skipping malformed SSE line"),
                    }
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }

    async fn chat(&self, messages: &[Message], model: &str, options: ChatOptions) -> AgentResult<String> {
        let body = Self::request_body(messages, &[], model, options, false);
        let response = self.send_with_retry(&body).await?;
        let v: Value = response.json().await?;

        v["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AgentError::provider("openai-compat", "response carried no content"))
    }
}

// ── Retry helpers ──────────────────────────────────────────────────────

/// Transient statuses worth retrying.
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504 | 529)
}

/// Exponential backoff with ±25% jitter, floor 100ms. Jitter is sourced
/// from the system clock nanos — good enough to break lockstep without an
/// RNG dependency.
fn backoff_delay(attempt: u32) -> Duration {
    let base_ms = (INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt.min(10))).min(MAX_RETRY_DELAY_MS);
    let jitter_range = (base_ms / 4) as i64;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as i64;
    let offset = if jitter_range == 0 { 0 } else { (nanos % (2 * jitter_range + 1)) - jitter_range };
    Duration::from_millis((base_ms as i64 + offset).max(100) as u64)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_delta() {
        let chunk = OpenAiCompatProvider::parse_sse_chunk(
            r#"{"model":"m","choices":[{"delta":{"content":"hi"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.delta_text.as_deref(), Some("hi"));
        assert!(chunk.tool_calls.is_empty());
    }

    #[test]
    fn test_parse_tool_call_delta() {
        let chunk = OpenAiCompatProvider::parse_sse_chunk(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"getCryptoPrice","arguments":"{\"sym"}}]},"finish_reason":null}]}"#,
        )
        .unwrap();
        let tc = &chunk.tool_calls[0];
        assert_eq!(tc.id.as_deref(), Some("call_1"));
        assert_eq!(tc.function_name.as_deref(), Some("getCryptoPrice"));
        assert_eq!(tc.arguments_delta.as_deref(), Some("{\"sym"));
    }

    #[test]
    fn test_done_and_garbage_lines_are_skipped() {
        assert!(OpenAiCompatProvider::parse_sse_chunk("[DONE]").is_none());
        assert!(OpenAiCompatProvider::parse_sse_chunk("not json at all").is_none());
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(404));
    }
}
