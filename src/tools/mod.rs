// Nixora — Tool catalog & dispatcher.
// Every tool call the model requests goes through `Toolbox::dispatch` —
// the single point where raw argument JSON is parsed, the handler is
// routed, and failures are folded into error-shaped results. A failed tool
// call must never terminate the user-visible stream.

pub mod bluefin;
pub mod defi;
pub mod price;
pub mod search;
pub mod transfer;
pub mod trending;
pub mod wallet;

use crate::config::Config;
use crate::error::AgentError;
use crate::provider::ChatProvider;
use crate::sui::SuiClient;
use crate::types::{ToolDefinition, ToolResult};
use log::{info, warn};
use serde_json::{json, Value};
use std::sync::Arc;

// ── Registry ───────────────────────────────────────────────────────────
// Static catalog passed to the model. Each entry's parameter schema must
// exactly match what the corresponding handler consumes.

pub fn registry() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            "getCryptoPrice",
            "Get real-time cryptocurrency prices and changes",
            json!({
                "type": "object",
                "properties": {
                    "symbol": {
                        "type": "string",
                        "description": "The cryptocurrency symbol (e.g., BTC, ETH, SUI)",
                        "enum": ["BTC", "ETH", "SUI"]
                    }
                },
                "required": ["symbol"]
            }),
        ),
        ToolDefinition::function(
            "searchInternet",
            "Search the internet for information about any topic using Tavily Search API",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query or topic to research"
                    }
                },
                "required": ["query"]
            }),
        ),
        ToolDefinition::function(
            "getWalletBalance",
            "Get SUI and token balances for a given wallet address",
            json!({
                "type": "object",
                "properties": {
                    "walletAddress": {
                        "type": "string",
                        "description": "The SUI wallet address to query"
                    }
                },
                "required": ["walletAddress"]
            }),
        ),
        ToolDefinition::function(
            "getWalletActivity",
            "Get recent outbound transactions for a given wallet address",
            json!({
                "type": "object",
                "properties": {
                    "walletAddress": {
                        "type": "string",
                        "description": "The SUI wallet address to query"
                    },
                    "cursor": {
                        "type": "string",
                        "description": "Opaque pagination cursor from a previous page"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of transactions to return (default 20, max 50)"
                    }
                },
                "required": ["walletAddress"]
            }),
        ),
        ToolDefinition::function(
            "initiateSuiTransfer",
            "Initiate a SUI token transfer to a specified wallet address",
            json!({
                "type": "object",
                "properties": {
                    "recipientAddress": {
                        "type": "string",
                        "description": "The recipient's SUI wallet address"
                    },
                    "amount": {
                        "type": "string",
                        "description": "The amount of SUI to send (in SUI units)"
                    }
                },
                "required": ["recipientAddress", "amount"]
            }),
        ),
        ToolDefinition::function(
            "getDefiYieldOpportunities",
            "Get analysis of the best DeFi yield opportunities from Navi Protocol",
            json!({ "type": "object", "properties": {}, "required": [] }),
        ),
        ToolDefinition::function(
            "getTrendingTokens",
            "Get trending tokens and their detailed information from DexScreener",
            json!({ "type": "object", "properties": {}, "required": [] }),
        ),
    ]
}

// ── Toolbox ────────────────────────────────────────────────────────────

/// Collaborators shared by all tool handlers. Constructor-injected so the
/// orchestrator and tests control every external seam.
pub struct Toolbox {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub provider: Arc<dyn ChatProvider>,
    pub sui: SuiClient,
}

impl Toolbox {
    pub fn new(
        config: Arc<Config>,
        http: reqwest::Client,
        provider: Arc<dyn ChatProvider>,
        sui: SuiClient,
    ) -> Self {
        Toolbox { config, http, provider, sui }
    }

    /// Execute one tool call. Never panics and never returns a transport
    /// error to the caller: malformed arguments, unknown tools, and
    /// handler failures all come back as error-shaped `ToolResult`s.
    pub async fn dispatch(&self, name: &str, raw_arguments: &str) -> ToolResult {
        let preview: String = raw_arguments.chars().take(200).collect();
        info!("[tools] dispatch {name} args={preview}");

        let args: Value = match serde_json::from_str(raw_arguments.trim()) {
            Ok(v) => v,
            Err(e) => {
                warn!("[tools] malformed arguments for {name}: {e}");
                return ToolResult::err(name, json!({ "error": format!("malformed tool arguments: {e}") }));
            }
        };

        let outcome = match name {
            "getCryptoPrice" => price::get_crypto_price(self, &args).await,
            "searchInternet" => search::search_internet(self, &args).await,
            "getWalletBalance" => wallet::get_wallet_balance(self, &args).await,
            "getWalletActivity" => wallet::get_wallet_activity(self, &args).await,
            "initiateSuiTransfer" => transfer::initiate_sui_transfer(&args),
            "getDefiYieldOpportunities" => defi::get_defi_yield_opportunities(self).await,
            "getTrendingTokens" => trending::get_trending_tokens(self).await,
            _ => Err(AgentError::tool(name, "unknown tool")),
        };

        match outcome {
            Ok(output) => ToolResult::ok(name, output),
            Err(AgentError::Validation(message)) => {
                // Structured rejection — never attempted on-chain.
                ToolResult::err(name, json!({ "status": "error", "message": message }))
            }
            Err(e) => {
                warn!("[tools] {name} failed: {e}");
                ToolResult::err(name, json!({ "error": e.to_string() }))
            }
        }
    }
}
