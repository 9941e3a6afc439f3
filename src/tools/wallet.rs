// Nixora — Wallet inspection tools.
// Balance and activity are read-only chain queries; neither ever touches
// key material.

use crate::error::{AgentError, AgentResult};
use crate::tools::{price, Toolbox};
use log::warn;
use serde_json::{json, Value};

const DEFAULT_ACTIVITY_LIMIT: usize = 20;
const MAX_ACTIVITY_LIMIT: usize = 50;
const MIST_PER_SUI: f64 = 1_000_000_000.0;

fn require_address(args: &Value) -> AgentResult<&str> {
    args["walletAddress"]
        .as_str()
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| AgentError::Validation("wallet address is required".into()))
}

/// Clamp a requested page size into the supported window.
fn clamp_limit(requested: Option<u64>) -> usize {
    match requested {
        Some(n) => (n as usize).clamp(1, MAX_ACTIVITY_LIMIT),
        None => DEFAULT_ACTIVITY_LIMIT,
    }
}

pub async fn get_wallet_balance(toolbox: &Toolbox, args: &Value) -> AgentResult<Value> {
    let address = require_address(args)?;

    // Balance, owned objects, and the SUI quote are independent queries.
    let (balance, objects, quote) = tokio::join!(
        toolbox.sui.get_balance(address),
        toolbox.sui.get_owned_objects(address),
        price::fetch_price(&toolbox.http, &toolbox.config.market_api_base, "SUI"),
    );
    let balance = balance?;
    let objects = objects?;

    // A market-data outage must not hide on-chain balances.
    let quote = match quote {
        Ok(q) => q,
        Err(e) => {
            warn!("[wallet] SUI price unavailable: {e}");
            None
        }
    };

    let total_mist: f64 = balance["totalBalance"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    let sui_balance = total_mist / MIST_PER_SUI;

    let tokens: Vec<Value> = objects["data"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|obj| {
                    let data = &obj["data"];
                    let coin_type = data["type"].as_str()?;
                    if !coin_type.contains("::coin::") {
                        return None;
                    }
                    let raw: f64 = data["content"]["fields"]["balance"]
                        .as_str()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0.0);
                    Some(json!({
                        "type": coin_type,
                        "balance": format!("{:.2}", raw / MIST_PER_SUI),
                        "symbol": coin_type.rsplit("::").next().unwrap_or(coin_type),
                    }))
                })
                .collect()
        })
        .unwrap_or_default();

    let sui_price = quote.as_ref().map(|q| q.price);
    Ok(json!({
        "address": address,
        "sui_balance": format!("{sui_balance:.2}"),
        "sui_price_usd": sui_price,
        "total_value_usd": sui_price.map(|p| format!("{:.2}", sui_balance * p)),
        "price_change_24h": quote.as_ref().map(|q| q.change_percent_24h),
        "price_change_1h": quote.as_ref().map(|q| q.change_percent_1h),
        "tokens": tokens,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn get_wallet_activity(toolbox: &Toolbox, args: &Value) -> AgentResult<Value> {
    let address = require_address(args)?;
    let cursor = args["cursor"].as_str().filter(|c| !c.trim().is_empty());
    let limit = clamp_limit(args["limit"].as_u64());

    let page = toolbox.sui.query_outbound_transactions(address, cursor, limit).await?;

    let transactions: Vec<Value> = page["data"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|tx| {
                    json!({
                        "digest": tx["digest"],
                        "timestampMs": tx["timestampMs"],
                        "checkpoint": tx["checkpoint"],
                        "status": tx["effects"]["status"]["status"],
                        "gasUsed": tx["effects"]["gasUsed"],
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(json!({
        "address": address,
        "transactions": transactions,
        "nextCursor": page["nextCursor"],
        "hasNextPage": page["hasNextPage"].as_bool().unwrap_or(false),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit_default_and_bounds() {
        assert_eq!(clamp_limit(None), 20);
        assert_eq!(clamp_limit(Some(5)), 5);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(500)), 50);
    }

    #[test]
    fn test_require_address_rejects_blank() {
        assert!(require_address(&json!({"walletAddress": "  "})).is_err());
        assert!(require_address(&json!({})).is_err());
        assert_eq!(require_address(&json!({"walletAddress": "0xabc"})).unwrap(), "0xabc");
    }
}
