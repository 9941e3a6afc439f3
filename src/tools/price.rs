// Nixora — Market price tool (CryptoCompare-shaped API).

use crate::error::{AgentError, AgentResult};
use crate::tools::Toolbox;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
    #[serde(rename = "changePercent24h")]
    pub change_percent_24h: f64,
    #[serde(rename = "changePercent1h")]
    pub change_percent_1h: f64,
    #[serde(rename = "marketCap")]
    pub market_cap: f64,
}

/// Fetch a USD quote for one symbol. `Ok(None)` means the market API had no
/// data for that symbol — callers decide whether that is a 404 or a tool
/// error.
pub async fn fetch_price(http: &reqwest::Client, api_base: &str, symbol: &str) -> AgentResult<Option<PriceQuote>> {
    let symbol = symbol.trim().to_uppercase();
    let url = format!(
        "{}/data/pricemultifull?fsyms={}&tsyms=USD",
        api_base.trim_end_matches('/'),
        urlencoding::encode(&symbol)
    );
    debug!("[price] GET {url}");

    let resp = http.get(&url).header("Accept", "application/json").send().await?;
    if !resp.status().is_success() {
        return Err(AgentError::tool(
            "getCryptoPrice",
            format!("market API returned status {}", resp.status()),
        ));
    }

    let body: Value = resp.json().await?;
    let raw = &body["RAW"][&symbol]["USD"];
    if raw.is_null() {
        return Ok(None);
    }

    Ok(Some(PriceQuote {
        symbol,
        price: raw["PRICE"].as_f64().unwrap_or(0.0),
        change_percent_24h: raw["CHANGEPCT24HOUR"].as_f64().unwrap_or(0.0),
        change_percent_1h: raw["CHANGEPCTHOUR"].as_f64().unwrap_or(0.0),
        market_cap: raw["MKTCAP"].as_f64().unwrap_or(0.0),
    }))
}

pub async fn get_crypto_price(toolbox: &Toolbox, args: &Value) -> AgentResult<Value> {
    let symbol = args["symbol"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AgentError::Validation("cryptocurrency symbol is required".into()))?;

    match fetch_price(&toolbox.http, &toolbox.config.market_api_base, symbol).await? {
        Some(quote) => Ok(json!(quote)),
        None => Err(AgentError::tool(
            "getCryptoPrice",
            format!("no price data for symbol {}", symbol.to_uppercase()),
        )),
    }
}
