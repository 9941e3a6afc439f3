// Nixora — DeFi yield analysis (Navi Protocol lending pools).
// Pool shaping is pure; the model call that turns pool numbers into prose
// runs under a hard timeout so a slow backend cannot pin the stream open.

use crate::error::{AgentError, AgentResult};
use crate::provider::ChatOptions;
use crate::tools::Toolbox;
use crate::types::Message;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Pools beyond this rank add noise, not signal, to the analysis prompt.
const TOP_POOL_COUNT: usize = 15;
const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(120);
/// Navi reports LTV as a fixed-point integer scaled by 1e27.
const LTV_SCALE: f64 = 1e27;

const ANALYST_SYSTEM_PROMPT: &str = "You are a DeFi expert analyzing yield and trading opportunities \
across multiple protocols. Provide clear, actionable insights based on the data provided, considering \
both Navi Protocol's lending markets and Bluefin's trading infrastructure.";

const DISCLAIMER: &str = "This analysis is for informational purposes only and should not be considered \
financial advice. Always conduct your own research and consider your risk tolerance before making any \
investment decisions. Cryptocurrency markets are highly volatile, and past performance does not \
guarantee future results.";

const REFERENCE_LINKS: &str = "View all Navi markets at https://app.naviprotocol.io/market\n\
Explore Bluefin's DEX at https://bluefin.io";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolSummary {
    pub token: String,
    #[serde(rename = "supplyAPY")]
    pub supply_apy: f64,
    #[serde(rename = "borrowAPY")]
    pub borrow_apy: f64,
    pub price: f64,
    #[serde(rename = "totalSupply")]
    pub total_supply: f64,
    #[serde(rename = "availableBorrow")]
    pub available_borrow: f64,
    pub ltv: f64,
    #[serde(rename = "totalAPY")]
    pub total_apy: f64,
}

pub(crate) fn num(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Shape raw Navi pool records into the analysis input: token symbol from
/// the coin type's last segment, LTV rescaled to [0,1], ordered by supply
/// APY, trimmed to the top pools.
pub fn format_pools(raw: &[Value]) -> Vec<PoolSummary> {
    let mut pools: Vec<PoolSummary> = raw
        .iter()
        .map(|pool| {
            let coin_type = pool["coinType"].as_str().unwrap_or("");
            let token = coin_type.rsplit("::").next().filter(|s| !s.is_empty()).unwrap_or("UNKNOWN");
            PoolSummary {
                token: token.to_string(),
                supply_apy: num(&pool["supplyIncentiveApyInfo"]["apy"]),
                borrow_apy: num(&pool["borrowIncentiveApyInfo"]["apy"]),
                price: num(&pool["oracle"]["price"]),
                total_supply: num(&pool["totalSupplyAmount"]),
                available_borrow: num(&pool["availableBorrow"]),
                ltv: num(&pool["ltv"]) / LTV_SCALE,
                total_apy: num(&pool["supplyIncentiveApyInfo"]["vaultApr"])
                    + num(&pool["supplyIncentiveApyInfo"]["boostedApr"]),
            }
        })
        .collect();

    pools.sort_by(|a, b| b.supply_apy.partial_cmp(&a.supply_apy).unwrap_or(std::cmp::Ordering::Equal));
    pools.truncate(TOP_POOL_COUNT);
    pools
}

async fn fetch_pools(toolbox: &Toolbox) -> AgentResult<Vec<Value>> {
    let url = format!("{}/api/navi/pools", toolbox.config.navi_api_base.trim_end_matches('/'));
    let resp = toolbox.http.get(&url).send().await?;
    if !resp.status().is_success() {
        return Err(AgentError::tool(
            "getDefiYieldOpportunities",
            format!("Navi API returned status {}", resp.status()),
        ));
    }

    let body: Value = resp.json().await?;
    match body["data"].as_array() {
        Some(data) => Ok(data.clone()),
        None => Err(AgentError::tool(
            "getDefiYieldOpportunities",
            "Navi API response carried no pool data",
        )),
    }
}

fn analysis_prompt(pools: &[PoolSummary]) -> String {
    format!(
        "Analyze the following DeFi pools from Navi Protocol and Bluefin.io to provide the best opportunities for:\n\
1. Highest yield farming (supply) opportunities on Navi Protocol\n\
2. Lowest borrowing rates on Navi Protocol\n\
3. Best risk-adjusted returns considering LTV ratios\n\
4. Trading opportunities on Bluefin's high-performance DEX\n\n\
Pool Data from Navi Protocol:\n{}\n\n\
Please provide a concise analysis with specific recommendations, comparing opportunities across both platforms.\n\n\
IMPORTANT DISCLAIMER to always include in your analysis:\n{}\n\n\
End your analysis with:\n\"{}\"",
        serde_json::to_string_pretty(pools).unwrap_or_default(),
        DISCLAIMER,
        REFERENCE_LINKS,
    )
}

pub async fn get_defi_yield_opportunities(toolbox: &Toolbox) -> AgentResult<Value> {
    let pools = format_pools(&fetch_pools(toolbox).await?);
    info!("[defi] analyzing {} pools", pools.len());

    let messages = [
        Message::system(ANALYST_SYSTEM_PROMPT),
        Message::user(analysis_prompt(&pools)),
    ];
    let options = ChatOptions { temperature: 0.7, max_tokens: 1500 };

    let analysis = tokio::time::timeout(
        ANALYSIS_TIMEOUT,
        toolbox.provider.chat(&messages, &toolbox.config.model, options),
    )
    .await
    .map_err(|_| AgentError::Timeout("DeFi analysis timed out".into()))??;

    Ok(json!({
        "success": true,
        "analysis": analysis,
        "opportunities": pools,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
