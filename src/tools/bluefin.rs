// Nixora — Bluefin liquidity-pool analysis.
// Same shape as the Navi handler: pure pool summarization feeding a
// deadline-raced model analysis. Served from the HTTP surface only; the
// agent's DeFi tool covers Bluefin through its prompt instead.

use crate::error::{AgentError, AgentResult};
use crate::provider::ChatOptions;
use crate::tools::defi::num;
use crate::tools::Toolbox;
use crate::types::Message;
use log::info;
use serde_json::{json, Value};
use std::time::Duration;

const TOP_POOL_COUNT: usize = 5;
const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(120);

const ANALYST_SYSTEM_PROMPT: &str = "You are a DeFi analyst specializing in Bluefin liquidity pools. \
Provide brief, data-driven analysis and always include a reference to view more details on the \
Bluefin trading platform.";

const POOLS_LINK: &str = "https://trade.bluefin.io/liquidity-pools";

fn window_stats(window: &Value) -> Value {
    json!({
        "apr": {
            "total": num(&window["apr"]["total"]),
            "feeApr": num(&window["apr"]["feeApr"]),
            "rewardApr": num(&window["apr"]["rewardApr"]),
        },
        "volume": num(&window["volume"]),
    })
}

/// Shape raw Bluefin pool records into the analysis input: top pools only,
/// with day/week APR windows, token pair, and reward streams flattened.
pub fn summarize_pools(raw: &[Value]) -> Vec<Value> {
    raw.iter()
        .take(TOP_POOL_COUNT)
        .map(|pool| {
            let mut day = window_stats(&pool["day"]);
            day["priceRange"] = json!({
                "min": num(&pool["day"]["priceMin"]),
                "max": num(&pool["day"]["priceMax"]),
            });
            let rewards: Vec<Value> = pool["rewards"]
                .as_array()
                .map(|rs| {
                    rs.iter()
                        .map(|r| {
                            json!({
                                "token": r["token"]["symbol"].as_str().unwrap_or(""),
                                "dailyRewardsUsd": num(&r["dailyRewardsUsd"]),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            json!({
                "symbol": pool["symbol"].as_str().unwrap_or("Unknown"),
                "tvl": num(&pool["tvl"]),
                "currentPrice": num(&pool["price"]),
                "dayStats": day,
                "weekStats": window_stats(&pool["week"]),
                "tokens": {
                    "tokenA": {
                        "symbol": pool["tokenA"]["info"]["symbol"].as_str().unwrap_or(""),
                        "amount": num(&pool["tokenA"]["amount"]),
                    },
                    "tokenB": {
                        "symbol": pool["tokenB"]["info"]["symbol"].as_str().unwrap_or(""),
                        "amount": num(&pool["tokenB"]["amount"]),
                    },
                },
                "rewards": rewards,
            })
        })
        .collect()
}

async fn fetch_pools(toolbox: &Toolbox) -> AgentResult<Vec<Value>> {
    let url = format!(
        "{}/api/v1/pools/info",
        toolbox.config.bluefin_api_base.trim_end_matches('/')
    );
    let resp = toolbox.http.get(&url).send().await?;
    if !resp.status().is_success() {
        return Err(AgentError::tool(
            "bluefin",
            format!("Bluefin API returned status {}", resp.status()),
        ));
    }

    let body: Value = resp.json().await?;
    match body {
        Value::Array(pools) => Ok(pools),
        other => Ok(vec![other]),
    }
}

fn analysis_prompt(pools: &[Value]) -> String {
    format!(
        "Analyze these DeFi liquidity pools data from Bluefin ({POOLS_LINK}):\n{}\n\n\
Please provide a concise comparative analysis with these sections:\n\
1. Overview: Compare TVL and trading conditions across the top {} pools\n\
2. APR Analysis: Highlight the pools with the best fee and reward APRs\n\
3. Risk Assessment: Compare price stability across pools\n\
4. Recommendation: Rank the pools based on TVL, APR, and risk metrics\n\n\
Note: Include a link to view more details at {POOLS_LINK}",
        serde_json::to_string_pretty(pools).unwrap_or_default(),
        pools.len(),
    )
}

pub async fn get_liquidity_pools(toolbox: &Toolbox) -> AgentResult<Value> {
    let pools = summarize_pools(&fetch_pools(toolbox).await?);
    info!("[bluefin] analyzing {} pools", pools.len());

    let messages = [
        Message::system(ANALYST_SYSTEM_PROMPT),
        Message::user(analysis_prompt(&pools)),
    ];
    let options = ChatOptions { temperature: 0.5, max_tokens: 2000 };

    let analysis = tokio::time::timeout(
        ANALYSIS_TIMEOUT,
        toolbox.provider.chat(&messages, &toolbox.config.model, options),
    )
    .await
    .map_err(|_| AgentError::Timeout("Bluefin pool analysis timed out".into()))??;

    Ok(json!({
        "success": true,
        "data": pools,
        "analysis": analysis,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(symbol: &str, tvl: f64, day_total_apr: f64) -> Value {
        json!({
            "symbol": symbol,
            "tvl": tvl,
            "price": "1.25",
            "day": {
                "apr": { "total": day_total_apr, "feeApr": day_total_apr / 2.0, "rewardApr": day_total_apr / 2.0 },
                "volume": "50000",
                "priceMin": "1.20",
                "priceMax": "1.30",
            },
            "week": { "apr": { "total": day_total_apr }, "volume": "350000" },
            "tokenA": { "info": { "symbol": "SUI" }, "amount": "1000" },
            "tokenB": { "info": { "symbol": "USDC" }, "amount": "1250" },
            "rewards": [{ "token": { "symbol": "BLUE" }, "dailyRewardsUsd": 42.0 }],
        })
    }

    #[test]
    fn test_summarize_keeps_top_pools_in_feed_order() {
        let raw: Vec<Value> = (0..8).map(|i| pool(&format!("P{i}"), 100.0 * i as f64, 5.0)).collect();
        let pools = summarize_pools(&raw);
        assert_eq!(pools.len(), TOP_POOL_COUNT);
        assert_eq!(pools[0]["symbol"], "P0");
        assert_eq!(pools[4]["symbol"], "P4");
    }

    #[test]
    fn test_summarize_flattens_windows_and_rewards() {
        let pools = summarize_pools(&[pool("SUI/USDC", 1_000_000.0, 12.0)]);
        let p = &pools[0];
        assert_eq!(p["dayStats"]["apr"]["total"], 12.0);
        assert_eq!(p["dayStats"]["priceRange"]["max"], 1.30);
        assert_eq!(p["weekStats"]["volume"], 350000.0);
        assert_eq!(p["tokens"]["tokenA"]["symbol"], "SUI");
        assert_eq!(p["rewards"][0]["token"], "BLUE");
        assert_eq!(p["rewards"][0]["dailyRewardsUsd"], 42.0);
    }

    #[test]
    fn test_summarize_defaults_missing_fields() {
        let pools = summarize_pools(&[json!({})]);
        assert_eq!(pools[0]["symbol"], "Unknown");
        assert_eq!(pools[0]["tvl"], 0.0);
        assert!(pools[0]["rewards"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_analysis_prompt_links_to_pools_page() {
        let prompt = analysis_prompt(&[]);
        assert!(prompt.contains(POOLS_LINK));
    }
}
