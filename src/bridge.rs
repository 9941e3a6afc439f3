// Nixora — Transfer confirmation bridge.
// Server side of the wallet hand-off: builds the envelope the client
// pattern-matches on, recovers the transfer payload from envelopes or from
// prose with an embedded JSON island, converts display units to base
// units, and models the transfer lifecycle. Signing itself never happens
// here.

use crate::error::{AgentError, AgentResult};
use serde_json::{json, Value};

/// 10^9 MIST per SUI.
pub const MIST_PER_SUI: f64 = 1_000_000_000.0;

/// Convert a display-unit SUI amount to base units. Rounds to the nearest
/// MIST so "0.01" maps to exactly 10_000_000.
pub fn sui_to_mist(sui: f64) -> u64 {
    (sui * MIST_PER_SUI).round() as u64
}

/// Envelope the client-side bridge pattern-matches on. Keeps the tool-call
/// shape so the client can re-parse the arguments it was derived from.
pub fn transfer_envelope(recipient_address: &str, amount: &str) -> Value {
    let arguments = json!({
        "recipientAddress": recipient_address,
        "amount": amount,
    });
    json!({
        "type": "TRANSFER_REQUEST",
        "tool_calls": [{
            "function": {
                "name": "initiateSuiTransfer",
                // Arguments travel as a JSON string, mirroring the model API.
                "arguments": arguments.to_string(),
            }
        }],
    })
}

/// Excise the first balanced JSON object from mixed prose. Tracks brace
/// depth with string/escape awareness so braces inside string values never
/// truncate the island.
pub fn extract_json_island(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

// ── Payload recovery ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TransferPayload {
    pub recipient_address: String,
    /// Decimal string as the handler echoed it, precision intact.
    pub amount: String,
}

impl TransferPayload {
    /// Recover the payload from a `TRANSFER_REQUEST` envelope. Arguments
    /// may arrive as a JSON string (model wire shape) or an inline object.
    pub fn from_envelope(envelope: &Value) -> AgentResult<Self> {
        if envelope["type"] != "TRANSFER_REQUEST" {
            return Err(AgentError::Validation("not a transfer request envelope".into()));
        }

        let call = envelope["tool_calls"]
            .as_array()
            .and_then(|calls| calls.first())
            .ok_or_else(|| AgentError::Validation("envelope carries no tool call".into()))?;

        if call["function"]["name"] != "initiateSuiTransfer" {
            return Err(AgentError::Validation("envelope tool call is not a transfer".into()));
        }

        let raw_args = &call["function"]["arguments"];
        let args: Value = match raw_args {
            Value::String(s) => serde_json::from_str(s)?,
            Value::Object(_) => raw_args.clone(),
            _ => return Err(AgentError::Validation("malformed transfer arguments".into())),
        };

        let recipient_address = args["recipientAddress"]
            .as_str()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AgentError::Validation("transfer envelope missing recipient".into()))?
            .to_string();
        let amount = match &args["amount"] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Err(AgentError::Validation("transfer envelope missing amount".into())),
        };

        Ok(TransferPayload { recipient_address, amount })
    }

    /// Recover the payload from prose containing an embedded envelope.
    pub fn from_text(text: &str) -> AgentResult<Self> {
        let island = extract_json_island(text)
            .ok_or_else(|| AgentError::Validation("no transfer payload found in text".into()))?;
        let envelope: Value = serde_json::from_str(island)?;
        Self::from_envelope(&envelope)
    }
}

// ── Lifecycle ──────────────────────────────────────────────────────────
// One transfer moves forward through these states only; terminal states
// never transition. A rejected or failed transfer requires a fresh chat
// turn, never an automatic retry.

#[derive(Debug, Clone, PartialEq)]
pub enum TransferState {
    /// Handler validated the request.
    Drafted,
    /// Client rendered the marker and extracted the payload.
    Presented,
    /// Wallet collaborator is prompting the user.
    Signing,
    Confirmed { digest: String },
    Rejected,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Present,
    BeginSigning,
    WalletConfirmed { digest: String },
    UserRejected,
    WalletFailed { reason: String },
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Confirmed { .. } | TransferState::Rejected | TransferState::Failed { .. }
        )
    }

    /// Apply one lifecycle event. Out-of-order events and events on
    /// terminal states are rejected.
    pub fn apply(self, event: TransferEvent) -> AgentResult<TransferState> {
        use TransferEvent::*;
        use TransferState::*;

        let next = match (&self, event) {
            (Drafted, Present) => Presented,
            (Presented, BeginSigning) => Signing,
            (Signing, WalletConfirmed { digest }) => Confirmed { digest },
            (Signing, UserRejected) => Rejected,
            (Signing, WalletFailed { reason }) => Failed { reason },
            // The user can dismiss the confirmation card before signing.
            (Presented, UserRejected) => Rejected,
            (state, event) => {
                return Err(AgentError::Validation(format!(
                    "invalid transfer transition: {state:?} on {event:?}"
                )))
            }
        };
        Ok(next)
    }
}
