// Nixora — HTTP surface.
// One streaming chat endpoint plus plain JSON proxies for the data the
// web client renders outside the chat (prices, balances, yields). The
// proxies reuse the same tool handlers the agent dispatches to.

use crate::config::Config;
use crate::error::{AgentError, AgentResult};
use crate::orchestrator::Orchestrator;
use crate::tools::{bluefin, defi, price, trending, wallet, Toolbox};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
    pub toolbox: Arc<Toolbox>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/crypto-price", get(crypto_price))
        .route("/api/sui-price", get(sui_price))
        .route("/api/sui-wallet-balance", get(wallet_balance))
        .route("/api/sui-wallet-activity", get(wallet_activity))
        .route("/api/navi", get(navi_yields))
        .route("/api/bluefin", get(bluefin_pools))
        .route("/api/sui-trending-tokens", get(trending_tokens))
        .route("/api/sui-epoch", get(sui_epoch))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState) -> AgentResult<()> {
    let addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("[server] listening on {addr}");
    axum::serve(listener, router(state))
        .await
        .map_err(|e| AgentError::Other(format!("server error: {e}")))
}

// ── Error mapping ──────────────────────────────────────────────────────

struct ApiError(AgentError);

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        ApiError(e)
    }
}

fn error_status(e: &AgentError) -> StatusCode {
    match e {
        AgentError::Validation(_) => StatusCode::BAD_REQUEST,
        AgentError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (error_status(&self.0), Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Failure shape for the analysis feeds (`/api/navi`, `/api/bluefin`,
/// `/api/sui-trending-tokens`), whose success bodies carry a `success`
/// flag the client branches on.
fn feed_error_body(e: &AgentError) -> Value {
    json!({ "success": false, "error": e.to_string() })
}

fn feed_response(result: AgentResult<Value>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => (error_status(&e), Json(feed_error_body(&e))).into_response(),
    }
}

// ── Chat ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
}

async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    if req.message.trim().is_empty() {
        return ApiError(AgentError::Validation("message must not be empty".into())).into_response();
    }

    let frames = state
        .orchestrator
        .handle(req.message, req.model)
        .map(Ok::<_, Infallible>);

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(frames),
    )
        .into_response()
}

// ── Data proxies ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SymbolQuery {
    symbol: Option<String>,
}

async fn crypto_price(
    State(state): State<AppState>,
    Query(q): Query<SymbolQuery>,
) -> Result<Response, ApiError> {
    let symbol = q
        .symbol
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AgentError::Validation("cryptocurrency symbol is required".into()))?;

    quote_response(&state, symbol).await
}

async fn sui_price(State(state): State<AppState>) -> Result<Response, ApiError> {
    quote_response(&state, "SUI").await
}

async fn quote_response(state: &AppState, symbol: &str) -> Result<Response, ApiError> {
    match price::fetch_price(&state.toolbox.http, &state.config.market_api_base, symbol).await? {
        Some(quote) => Ok(Json(json!(quote)).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "cryptocurrency not found" })),
        )
            .into_response()),
    }
}

#[derive(Debug, Deserialize)]
struct AddressQuery {
    address: Option<String>,
    cursor: Option<String>,
    limit: Option<u64>,
}

impl AddressQuery {
    fn address(&self) -> Result<&str, ApiError> {
        self.address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| ApiError(AgentError::Validation("wallet address is required".into())))
    }
}

/// Chain-shaped passthrough: the web client formats these itself, unlike
/// the agent tool which pre-digests them for the model.
async fn wallet_balance(
    State(state): State<AppState>,
    Query(q): Query<AddressQuery>,
) -> Result<Json<Value>, ApiError> {
    let address = q.address()?;
    let (balance, objects) = tokio::join!(
        state.toolbox.sui.get_balance(address),
        state.toolbox.sui.get_owned_objects(address),
    );
    Ok(Json(json!({ "balance": balance?, "objects": objects?["data"] })))
}

async fn wallet_activity(
    State(state): State<AppState>,
    Query(q): Query<AddressQuery>,
) -> Result<Json<Value>, ApiError> {
    let args = json!({
        "walletAddress": q.address()?,
        "cursor": q.cursor,
        "limit": q.limit,
    });
    Ok(Json(wallet::get_wallet_activity(&state.toolbox, &args).await?))
}

async fn navi_yields(State(state): State<AppState>) -> Response {
    feed_response(defi::get_defi_yield_opportunities(&state.toolbox).await)
}

async fn bluefin_pools(State(state): State<AppState>) -> Response {
    feed_response(bluefin::get_liquidity_pools(&state.toolbox).await)
}

async fn trending_tokens(State(state): State<AppState>) -> Response {
    feed_response(trending::get_trending_tokens(&state.toolbox).await)
}

async fn sui_epoch(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let sys = state.toolbox.sui.latest_system_state().await?;
    Ok(Json(json!({
        "network": state.config.network.name(),
        "epoch": sys["epoch"],
        "epochStartTimestampMs": sys["epochStartTimestampMs"],
        "epochDurationMs": sys["epochDurationMs"],
        "referenceGasPrice": sys["referenceGasPrice"],
        "protocolVersion": sys["protocolVersion"],
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_accepts_optional_model() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(req.model.is_none());

        let req: ChatRequest =
            serde_json::from_str(r#"{"message":"hi","model":"qwen2.5:3b"}"#).unwrap();
        assert_eq!(req.model.as_deref(), Some("qwen2.5:3b"));
    }

    #[test]
    fn test_feed_errors_carry_success_flag() {
        let body = feed_error_body(&AgentError::tool("bluefin", "upstream 502"));
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("upstream 502"));

        let resp = feed_response(Err(AgentError::Timeout("slow".into())));
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_api_error_status_mapping() {
        let resp = ApiError(AgentError::Validation("bad".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError(AgentError::Timeout("slow".into())).into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);

        let resp = ApiError(AgentError::Other("boom".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
