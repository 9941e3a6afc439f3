// Nixora — Environment-derived configuration.
// Loaded once at process start; read-only afterwards. Absent optional keys
// fall back to documented defaults rather than failing startup.

use crate::sui::SuiNetwork;
use log::warn;

/// Default chat model when `LLM_ENV` is unset or not `PROD`.
const DEV_MODEL: &str = "qwen2.5:3b";
/// Default chat model for `LLM_ENV=PROD`.
const PROD_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct";

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// OpenAI-compatible chat completions base URL.
    pub llm_base_url: String,
    pub llm_api_key: String,
    /// Default chat model; requests may override per-message.
    pub model: String,
    /// Alternate (larger) model offered to clients.
    pub alternate_model: String,
    /// Target Sui network for chain RPC calls.
    pub network: SuiNetwork,
    /// Tavily search API key. Search tool degrades gracefully when absent.
    pub tavily_api_key: Option<String>,
    /// Market-data collaborator (CryptoCompare-shaped).
    pub market_api_base: String,
    /// Navi lending-protocol open API.
    pub navi_api_base: String,
    /// Bluefin swap API (liquidity pool stats).
    pub bluefin_api_base: String,
    /// DexScreener token feed.
    pub dexscreener_api_base: String,
}

impl Config {
    pub fn from_env() -> Self {
        let is_prod = env_or("LLM_ENV", "").eq_ignore_ascii_case("prod");
        let default_model = if is_prod { PROD_MODEL } else { DEV_MODEL };

        let network = match env_or("SUI_NETWORK", "devnet").parse::<SuiNetwork>() {
            Ok(n) => n,
            Err(e) => {
                warn!("[config] {e}; falling back to devnet");
                SuiNetwork::Devnet
            }
        };

        let tavily_api_key = std::env::var("TAVILY_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if tavily_api_key.is_none() {
            warn!("[config] TAVILY_API_KEY not set — web search tool disabled");
        }

        Config {
            bind_addr: env_or("NIXORA_BIND", "127.0.0.1:3000"),
            llm_base_url: env_or("LLM_BASE_URL", "http://localhost:11434/v1"),
            llm_api_key: env_or("LLM_API_KEY", "ollama"),
            model: env_or("LLM_MODEL", default_model),
            alternate_model: env_or("LLM_ALT_MODEL", PROD_MODEL),
            network,
            tavily_api_key,
            market_api_base: env_or("MARKET_API_BASE", "https://min-api.cryptocompare.com"),
            navi_api_base: env_or("NAVI_API_BASE", "https://open-api.naviprotocol.io"),
            bluefin_api_base: env_or("BLUEFIN_API_BASE", "https://swap.api.sui-prod.bluefin.io"),
            dexscreener_api_base: env_or("DEXSCREENER_API_BASE", "https://api.dexscreener.com"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
