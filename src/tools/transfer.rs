// Nixora — Transfer preparation.
// Validates intent and builds the wallet-bridge request object. No chain
// call happens here: signing and submission belong to the user's wallet.

use crate::amount;
use crate::error::{AgentError, AgentResult};
use crate::types::TransferRequest;
use serde_json::{json, Value};

/// Minimum transferable amount in SUI (one MIST-representable microunit).
const MIN_AMOUNT_SUI: f64 = 0.000001;
/// Safety ceiling for a single assistant-prepared transfer.
const MAX_AMOUNT_SUI: f64 = 100.0;
/// `0x` plus 64 hex characters.
const ADDRESS_LEN: usize = 66;

fn validate_address(address: &str) -> AgentResult<()> {
    if !address.starts_with("0x") {
        return Err(AgentError::Validation(
            "invalid recipient address: must start with 0x".into(),
        ));
    }
    if address.len() != ADDRESS_LEN {
        return Err(AgentError::Validation(format!(
            "invalid recipient address: expected {} characters, got {}",
            ADDRESS_LEN,
            address.len()
        )));
    }
    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AgentError::Validation(
            "invalid recipient address: not hexadecimal".into(),
        ));
    }
    Ok(())
}

/// Validate and build the transfer request. The amount echoed back is the
/// normalized decimal string, never a re-rendered float, so "0.01" stays
/// "0.01".
pub fn initiate_sui_transfer(args: &Value) -> AgentResult<Value> {
    let recipient = args["recipientAddress"]
        .as_str()
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| AgentError::Validation("recipient address is required".into()))?
        .trim();

    if args["amount"].is_null() {
        return Err(AgentError::Validation("transfer amount is required".into()));
    }

    validate_address(recipient)?;

    let amount_str = amount::normalize(&args["amount"]);
    let amount_num: f64 = amount_str
        .parse()
        .map_err(|_| AgentError::Validation(format!("invalid amount '{amount_str}'")))?;

    if !amount_num.is_finite() || amount_num < MIN_AMOUNT_SUI {
        return Err(AgentError::Validation(format!(
            "amount is too small: minimum is {MIN_AMOUNT_SUI} SUI"
        )));
    }
    if amount_num > MAX_AMOUNT_SUI {
        return Err(AgentError::Validation(format!(
            "transfer amount {amount_str} SUI exceeds maximum limit of {MAX_AMOUNT_SUI} SUI"
        )));
    }

    Ok(json!(TransferRequest::new(recipient, &amount_str)))
}
