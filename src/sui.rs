// Nixora — Sui chain collaborator.
// Thin JSON-RPC client over reqwest; response shapes are passed through
// with minimal reshaping so the node remains the source of truth.

use crate::error::{AgentError, AgentResult};
use log::debug;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;

// ── Network selection ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiNetwork {
    Devnet,
    Testnet,
    Mainnet,
}

impl SuiNetwork {
    pub fn rpc_url(&self) -> &'static str {
        match self {
            SuiNetwork::Devnet => "https://fullnode.devnet.sui.io",
            SuiNetwork::Testnet => "https://fullnode.testnet.sui.io",
            SuiNetwork::Mainnet => "https://fullnode.mainnet.sui.io",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SuiNetwork::Devnet => "devnet",
            SuiNetwork::Testnet => "testnet",
            SuiNetwork::Mainnet => "mainnet",
        }
    }
}

impl FromStr for SuiNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "devnet" => Ok(SuiNetwork::Devnet),
            "testnet" => Ok(SuiNetwork::Testnet),
            "mainnet" => Ok(SuiNetwork::Mainnet),
            other => Err(format!("unknown Sui network '{other}'")),
        }
    }
}

// ── RPC client ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct SuiClient {
    http: reqwest::Client,
    rpc_url: String,
}

impl SuiClient {
    pub fn new(http: reqwest::Client, network: SuiNetwork) -> Self {
        SuiClient { http, rpc_url: network.rpc_url().to_string() }
    }

    /// Point at an explicit node URL (tests, custom fullnodes).
    pub fn with_url(http: reqwest::Client, rpc_url: impl Into<String>) -> Self {
        SuiClient { http, rpc_url: rpc_url.into() }
    }

    /// Single JSON-RPC 2.0 round-trip. Returns the `result` member, or an
    /// error for transport failures and RPC-level `error` responses.
    pub async fn rpc_call(&self, method: &str, params: Value) -> AgentResult<Value> {
        debug!("[sui] rpc {} -> {}", method, self.rpc_url);

        let resp = self
            .http
            .post(&self.rpc_url)
            .timeout(Duration::from_secs(20))
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AgentError::Other(format!(
                "Sui RPC {} returned status {}",
                method,
                resp.status()
            )));
        }

        let body: Value = resp.json().await?;
        if let Some(err) = body.get("error") {
            let msg = err["message"].as_str().unwrap_or("RPC error occurred");
            return Err(AgentError::Other(format!("Sui RPC {method}: {msg}")));
        }

        Ok(body["result"].clone())
    }

    /// Native SUI balance for an address (base units as a decimal string).
    pub async fn get_balance(&self, owner: &str) -> AgentResult<Value> {
        self.rpc_call("suix_getBalance", json!([owner])).await
    }

    /// Owned objects with type and content shown, for coin filtering.
    pub async fn get_owned_objects(&self, owner: &str) -> AgentResult<Value> {
        self.rpc_call(
            "suix_getOwnedObjects",
            json!([owner, { "options": { "showType": true, "showContent": true } }]),
        )
        .await
    }

    /// Page of outbound transactions. The pagination cursor is the node's
    /// opaque token and is passed through unchanged.
    pub async fn query_outbound_transactions(
        &self,
        address: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> AgentResult<Value> {
        self.rpc_call(
            "suix_queryTransactionBlocks",
            json!([
                {
                    "filter": { "FromAddress": address },
                    "options": { "showInput": true, "showEffects": true, "showEvents": true },
                },
                cursor,
                limit,
                true, // descending order: newest first
            ]),
        )
        .await
    }

    /// Latest system state — epoch, reference gas price, protocol version.
    pub async fn latest_system_state(&self) -> AgentResult<Value> {
        self.rpc_call("suix_getLatestSuiSystemState", json!([])).await
    }
}
