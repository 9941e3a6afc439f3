// Nixora — Streaming chat orchestrator.
// Owns one chat turn end to end: intent check, model streaming, tool-call
// reassembly, dispatch, and the continuation or direct formatting that
// follows. Output is the ndjson frame protocol; a keep-alive comment line
// ticks while slow tools run and stops the moment the turn task drops its
// guard.
//
// Protocol invariant: at most one tool call is honored per turn. Once a
// call has been dispatched, later tool-call deltas in the same stream are
// ignored.

use crate::bridge;
use crate::config::Config;
use crate::error::{AgentError, AgentResult};
use crate::fragment::ToolCallFragment;
use crate::intent;
use crate::provider::{ChatOptions, ChatProvider};
use crate::tools::{registry, Toolbox};
use crate::types::{Frame, Message, ToolCall, KEEPALIVE_LINE};
use bytes::Bytes;
use futures::StreamExt;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// First model call when tools are in play: low temperature so argument
/// JSON stays well-formed.
const TOOL_TURN_OPTIONS: ChatOptions = ChatOptions { temperature: 0.5, max_tokens: 1000 };
/// Plain turns and post-tool continuations.
const PROSE_OPTIONS: ChatOptions = ChatOptions { temperature: 0.7, max_tokens: 1000 };

const SYSTEM_PROMPT: &str = "I am Nixora, a AI agent for the SUI blockchain. My name combines 'nix' \
(water spirit) and 'ora' (exploration/time/light), reflecting my mission to help users navigate the \
waters of sui blockchain. Your main goal is to simplify and enhance the user experience on the SUI \
blockchain by ingesting natural language requests to simplify blockchain transactions. Provide \
concise, direct responses focused on actionable information.\n\n\
I have the following capabilities:\n\
- Real time internet search and summary capabilities\n\
- Real time cryptocurrency prices via the getCryptoPrice function\n\
- Wallet balance and recent activity lookups for any SUI address\n\
- Send SUI to any wallet address via the initiateSuiTransfer function\n\
- Analyze DeFi yield opportunities from Navi Protocol liquidity pools\n\
- Trending SUI token discovery\n\n\
For SUI transfer requests:\n\
When users ask to \"send X SUI to ADDRESS\" or \"transfer X SUI to ADDRESS\", use the \
initiateSuiTransfer function. Extract the amount and recipient address from the request. Validate \
that the address starts with \"0x\" and is 66 characters long. When handling SUI transfers, always \
maintain exact decimal precision: if a user requests to send 0.01 SUI, use exactly \"0.01\" as the \
amount, not \"10\" or any other interpretation.";

// ── Keep-alive ─────────────────────────────────────────────────────────

/// Ticker that writes comment lines while a turn is in flight. Dropping
/// the guard aborts the ticker, so cancellation needs no extra signal.
struct KeepAliveGuard {
    handle: JoinHandle<()>,
}

impl KeepAliveGuard {
    fn spawn(tx: mpsc::Sender<Bytes>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                if tx.send(Bytes::from_static(KEEPALIVE_LINE.as_bytes())).await.is_err() {
                    return;
                }
            }
        });
        KeepAliveGuard { handle }
    }
}

impl Drop for KeepAliveGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ── Orchestrator ───────────────────────────────────────────────────────

pub struct Orchestrator {
    config: Arc<Config>,
    provider: Arc<dyn ChatProvider>,
    toolbox: Arc<Toolbox>,
}

impl Orchestrator {
    pub fn new(config: Arc<Config>, provider: Arc<dyn ChatProvider>, toolbox: Arc<Toolbox>) -> Self {
        Orchestrator { config, provider, toolbox }
    }

    /// Run one chat turn, returning the client-facing byte stream. The
    /// turn executes in a spawned task; dropping the returned stream
    /// cancels it (frame sends start failing) and stops the keep-alive.
    pub fn handle(self: &Arc<Self>, message: String, model_override: Option<String>) -> ReceiverStream<Bytes> {
        let (tx, rx) = mpsc::channel::<Bytes>(32);
        let this = Arc::clone(self);

        tokio::spawn(async move {
            let _keepalive = KeepAliveGuard::spawn(tx.clone());
            let model = model_override.unwrap_or_else(|| this.config.model.clone());

            if let Err(e) = this.run_turn(&tx, &message, &model).await {
                warn!("[orchestrator] turn failed: {e}");
                send_frame(&tx, &Frame::Error { message: e.to_string() }).await;
            }
            // Exactly one Done per turn, errors included.
            send_frame(&tx, &Frame::Done).await;
        });

        ReceiverStream::new(rx)
    }

    async fn run_turn(&self, tx: &mpsc::Sender<Bytes>, message: &str, model: &str) -> AgentResult<()> {
        let use_tools = intent::needs_tools(message);
        info!("[orchestrator] turn model={model} tools={use_tools}");

        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(message)];
        let (tools, options) = if use_tools {
            (registry(), TOOL_TURN_OPTIONS)
        } else {
            (Vec::new(), PROSE_OPTIONS)
        };

        let mut stream = self.provider.chat_stream(&messages, &tools, model, options).await?;
        let mut fragment = ToolCallFragment::new();
        let mut handled = false;

        while let Some(item) = stream.next().await {
            let chunk = item?;

            if let Some(text) = chunk.delta_text.filter(|t| !t.is_empty()) {
                if !send_frame(tx, &Frame::Token { text }).await {
                    return Ok(()); // client disconnected
                }
            }

            if handled {
                continue;
            }
            for delta in &chunk.tool_calls {
                fragment.push(delta);
                if fragment.is_complete() {
                    handled = true;
                    let call = fragment.take();
                    self.finish_tool_turn(tx, message, model, call).await?;
                    break;
                }
            }
        }

        if !handled && fragment.has_data() {
            return Err(AgentError::provider(
                "openai-compat",
                "stream ended with an incomplete tool call",
            ));
        }
        Ok(())
    }

    /// Dispatch a reassembled tool call and produce the rest of the turn.
    /// Transfer and DeFi results are formatted directly; every other tool
    /// result goes back through the model for a prose continuation.
    async fn finish_tool_turn(
        &self,
        tx: &mpsc::Sender<Bytes>,
        message: &str,
        model: &str,
        mut call: ToolCall,
    ) -> AgentResult<()> {
        if call.function.name == "initiateSuiTransfer" {
            call.function.arguments = normalize_transfer_arguments(&call.function.arguments);
        }

        let tool_name = call.function.name.clone();
        let result = self.toolbox.dispatch(&tool_name, &call.function.arguments).await;

        match tool_name.as_str() {
            "initiateSuiTransfer" if result.success => {
                let details = &result.output["details"];
                let envelope = bridge::transfer_envelope(
                    details["recipientAddress"].as_str().unwrap_or_default(),
                    details["amount"].as_str().unwrap_or_default(),
                );
                let text = result.output["message"].as_str().unwrap_or_default().to_string();
                send_frame(tx, &Frame::TransferRequest { request: envelope, text }).await;
                Ok(())
            }
            "getDefiYieldOpportunities" if result.success => {
                let text = result.output["analysis"].as_str().unwrap_or_default().to_string();
                send_frame(tx, &Frame::Token { text }).await;
                Ok(())
            }
            name => {
                info!("[orchestrator] tool turn continues through model: {name}");
                if !send_frame(tx, &Frame::ToolResult { name: result.name.clone(), data: result.output.clone() }).await
                {
                    return Ok(());
                }
                // Direct-mode tools that failed still take this path so
                // the model can explain the failure in prose.
                self.stream_continuation(tx, message, model, call, &result.output).await
            }
        }
    }

    async fn stream_continuation(
        &self,
        tx: &mpsc::Sender<Bytes>,
        message: &str,
        model: &str,
        call: ToolCall,
        tool_output: &serde_json::Value,
    ) -> AgentResult<()> {
        let tool_name = call.function.name.clone();
        let call_id = call.id.clone();
        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(message),
            Message::assistant_with_tools("", vec![call]),
            Message::tool(tool_output.to_string(), call_id, tool_name),
        ];

        let mut stream = self.provider.chat_stream(&messages, &[], model, PROSE_OPTIONS).await?;
        while let Some(item) = stream.next().await {
            let chunk = item?;
            if let Some(text) = chunk.delta_text.filter(|t| !t.is_empty()) {
                if !send_frame(tx, &Frame::Token { text }).await {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

/// Re-serialize transfer arguments with the amount normalized, so decimal
/// precision survives the model round-trip. Unparseable arguments pass
/// through untouched for the dispatcher to reject.
fn normalize_transfer_arguments(raw: &str) -> String {
    let Ok(mut args) = serde_json::from_str::<serde_json::Value>(raw.trim()) else {
        return raw.to_string();
    };
    let normalized = crate::amount::normalize(&args["amount"]);
    args["amount"] = serde_json::Value::String(normalized);
    args.to_string()
}

/// Send one frame; `false` means the client went away.
async fn send_frame(tx: &mpsc::Sender<Bytes>, frame: &Frame) -> bool {
    tx.send(Bytes::from(frame.to_line())).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_transfer_arguments_preserves_precision() {
        let out = normalize_transfer_arguments(r#"{"recipientAddress":"0xabc","amount":"0.01"}"#);
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["amount"], "0.01");
        assert_eq!(v["recipientAddress"], "0xabc");
    }

    #[test]
    fn test_normalize_transfer_arguments_coerces_numbers() {
        let out = normalize_transfer_arguments(r#"{"recipientAddress":"0xabc","amount":0.5}"#);
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["amount"], "0.5");
    }

    #[test]
    fn test_normalize_transfer_arguments_passes_garbage_through() {
        assert_eq!(normalize_transfer_arguments("not json"), "not json");
    }

    #[test]
    fn test_frame_lines_round_trip() {
        let frame = Frame::TransferRequest {
            request: json!({"type": "TRANSFER_REQUEST"}),
            text: "confirm in wallet".into(),
        };
        let parsed = Frame::parse(&frame.to_line()).unwrap();
        match parsed {
            Frame::TransferRequest { text, .. } => assert_eq!(text, "confirm in wallet"),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn test_keepalive_line_is_skipped_by_parser() {
        assert!(Frame::parse(KEEPALIVE_LINE).is_none());
    }
}
