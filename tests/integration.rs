// End-to-end orchestrator tests against a scripted model backend. No
// network: every model "response" is a prepared chunk script, and the only
// tools exercised are the ones that never leave the process.

use async_trait::async_trait;
use nixora::config::Config;
use nixora::error::{AgentError, AgentResult};
use nixora::orchestrator::Orchestrator;
use nixora::provider::{ChatOptions, ChatProvider, ChunkStream};
use nixora::sui::{SuiClient, SuiNetwork};
use nixora::tools::Toolbox;
use nixora::types::{Frame, Message, Role, StreamChunk, ToolCallDelta, ToolDefinition};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

const RECIPIENT: &str = "0x7d20dcdb2bca4f508ea9613994683eb4e76e9c4ed371169677c1be02aaf0b58e";

// ── Scripted backend ───────────────────────────────────────────────────

#[derive(Clone)]
struct RecordedCall {
    messages: Vec<Message>,
    tool_count: usize,
}

struct ScriptedProvider {
    scripts: Mutex<VecDeque<Vec<AgentResult<StreamChunk>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    fn new(scripts: Vec<Vec<AgentResult<StreamChunk>>>) -> Arc<Self> {
        Arc::new(ScriptedProvider {
            scripts: Mutex::new(scripts.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        _model: &str,
        _options: ChatOptions,
    ) -> AgentResult<ChunkStream> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tool_count: tools.len(),
        });

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::provider("scripted", "no script left for this call"))?;

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            for item in script {
                if tx.send(item).await.is_err() {
                    return;
                }
            }
        });
        Ok(ReceiverStream::new(rx))
    }

    async fn chat(&self, _messages: &[Message], _model: &str, _options: ChatOptions) -> AgentResult<String> {
        Ok("scripted analysis".to_string())
    }
}

// ── Script helpers ─────────────────────────────────────────────────────

fn token(text: &str) -> AgentResult<StreamChunk> {
    Ok(StreamChunk { delta_text: Some(text.to_string()), ..Default::default() })
}

fn tool_delta(id: Option<&str>, name: Option<&str>, args: &str) -> AgentResult<StreamChunk> {
    Ok(StreamChunk {
        tool_calls: vec![ToolCallDelta {
            index: 0,
            id: id.map(|s| s.to_string()),
            function_name: name.map(|s| s.to_string()),
            arguments_delta: Some(args.to_string()),
        }],
        ..Default::default()
    })
}

fn orchestrator(provider: Arc<ScriptedProvider>) -> Arc<Orchestrator> {
    let config = Arc::new(Config::from_env());
    let http = reqwest::Client::new();
    let sui = SuiClient::new(http.clone(), SuiNetwork::Devnet);
    let toolbox = Arc::new(Toolbox::new(
        Arc::clone(&config),
        http,
        provider.clone(),
        sui,
    ));
    Arc::new(Orchestrator::new(config, provider, toolbox))
}

/// Run one turn and collect the parsed frames (keep-alives dropped).
async fn collect_frames(orchestrator: &Arc<Orchestrator>, message: &str) -> Vec<Frame> {
    let mut stream = orchestrator.handle(message.to_string(), None);
    let mut raw = Vec::new();
    let deadline = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(bytes) = stream.next().await {
            raw.extend_from_slice(&bytes);
        }
    });
    deadline.await.expect("turn did not finish in time");

    String::from_utf8(raw)
        .expect("stream was not utf-8")
        .lines()
        .filter_map(Frame::parse)
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn plain_turn_streams_tokens_without_tools() {
    let provider = ScriptedProvider::new(vec![vec![token("Hi"), token(" there!")]]);
    let orch = orchestrator(provider.clone());

    let frames = collect_frames(&orch, "hello").await;
    assert!(matches!(&frames[0], Frame::Token { text } if text == "Hi"));
    assert!(matches!(&frames[1], Frame::Token { text } if text == " there!"));
    assert!(matches!(frames.last(), Some(Frame::Done)));

    let calls = provider.calls();
    assert_eq!(calls.len(), 1, "plain turns must not re-enter the model");
    assert_eq!(calls[0].tool_count, 0, "plain turns carry no tool catalog");
}

#[tokio::test]
async fn transfer_turn_emits_request_with_precision_intact() {
    // Arguments split across three deltas, with the closing brace alone.
    let args_head = format!("{{\"recipientAddress\":\"{RECIPIENT}\",\"amount\":");
    let provider = ScriptedProvider::new(vec![vec![
        tool_delta(Some("call_1"), Some("initiateSuiTransfer"), &args_head),
        tool_delta(None, None, "\"0.01\""),
        tool_delta(None, None, "}"),
    ]]);
    let orch = orchestrator(provider.clone());

    let frames = collect_frames(&orch, &format!("send 0.01 SUI to {RECIPIENT}")).await;

    let Some(Frame::TransferRequest { request, text }) = frames
        .iter()
        .find(|f| matches!(f, Frame::TransferRequest { .. }))
    else {
        panic!("no transfer request frame in {frames:?}");
    };
    assert_eq!(request["type"], "TRANSFER_REQUEST");
    let arguments: serde_json::Value = serde_json::from_str(
        request["tool_calls"][0]["function"]["arguments"].as_str().unwrap(),
    )
    .unwrap();
    assert_eq!(arguments["amount"], "0.01", "precision lost in round-trip");
    assert_eq!(arguments["recipientAddress"], RECIPIENT);
    assert!(text.contains("0.01 SUI"));
    assert!(matches!(frames.last(), Some(Frame::Done)));

    // Transfers format directly: exactly one model call, no continuation.
    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].tool_count > 0);
}

#[tokio::test]
async fn transfer_validation_failure_goes_back_through_model() {
    let provider = ScriptedProvider::new(vec![
        vec![tool_delta(
            Some("call_1"),
            Some("initiateSuiTransfer"),
            &format!("{{\"recipientAddress\":\"{RECIPIENT}\",\"amount\":\"500\"}}"),
        )],
        vec![token("That exceeds the transfer limit.")],
    ]);
    let orch = orchestrator(provider.clone());

    let frames = collect_frames(&orch, &format!("send 500 SUI to {RECIPIENT}")).await;

    // No transfer request frame: validation rejected the amount.
    assert!(!frames.iter().any(|f| matches!(f, Frame::TransferRequest { .. })));
    let Some(Frame::ToolResult { name, data }) =
        frames.iter().find(|f| matches!(f, Frame::ToolResult { .. }))
    else {
        panic!("no tool result frame in {frames:?}");
    };
    assert_eq!(name, "initiateSuiTransfer");
    assert_eq!(data["status"], "error");
    assert!(frames
        .iter()
        .any(|f| matches!(f, Frame::Token { text } if text.contains("limit"))));
}

#[tokio::test]
async fn unknown_tool_becomes_error_result_and_continuation() {
    let provider = ScriptedProvider::new(vec![
        vec![tool_delta(Some("call_9"), Some("teleportTokens"), "{}")],
        vec![token("I cannot do that.")],
    ]);
    let orch = orchestrator(provider.clone());

    let frames = collect_frames(&orch, "transfer my tokens somewhere weird").await;

    let Some(Frame::ToolResult { data, .. }) =
        frames.iter().find(|f| matches!(f, Frame::ToolResult { .. }))
    else {
        panic!("no tool result frame in {frames:?}");
    };
    assert!(data["error"].as_str().unwrap().contains("unknown tool"));
    assert!(matches!(frames.last(), Some(Frame::Done)));

    // The continuation call carries the tool transcript.
    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    let continuation = &calls[1];
    assert_eq!(continuation.tool_count, 0);
    assert!(continuation.messages.iter().any(|m| m.role == Role::Tool));
    assert!(continuation
        .messages
        .iter()
        .any(|m| m.tool_calls.as_ref().is_some_and(|tc| !tc.is_empty())));
}

#[tokio::test]
async fn mid_stream_backend_error_yields_error_frame_then_done() {
    let provider = ScriptedProvider::new(vec![vec![
        token("Partial"),
        Err(AgentError::provider("scripted", "connection reset")),
    ]]);
    let orch = orchestrator(provider.clone());

    let frames = collect_frames(&orch, "hello").await;
    assert!(matches!(&frames[0], Frame::Token { text } if text == "Partial"));
    assert!(frames
        .iter()
        .any(|f| matches!(f, Frame::Error { message } if message.contains("connection reset"))));
    // The stream still terminates cleanly, exactly once.
    assert!(matches!(frames.last(), Some(Frame::Done)));
    assert_eq!(frames.iter().filter(|f| matches!(f, Frame::Done)).count(), 1);
}

#[tokio::test]
async fn tool_deltas_after_first_complete_call_are_ignored() {
    let provider = ScriptedProvider::new(vec![
        vec![
            tool_delta(Some("call_1"), Some("teleportTokens"), "{}"),
            // A second call in the same stream: protocol says ignore it.
            tool_delta(Some("call_2"), Some("getCryptoPrice"), "{\"symbol\":\"BTC\"}"),
        ],
        vec![token("Sorry.")],
    ]);
    let orch = orchestrator(provider.clone());

    let frames = collect_frames(&orch, "what is the price of everything").await;
    let tool_results = frames
        .iter()
        .filter(|f| matches!(f, Frame::ToolResult { .. }))
        .count();
    assert_eq!(tool_results, 1, "only the first complete tool call may run");
    assert_eq!(provider.calls().len(), 2);
}
