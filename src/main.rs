use log::info;
use nixora::config::Config;
use nixora::orchestrator::Orchestrator;
use nixora::provider::OpenAiCompatProvider;
use nixora::server::{self, AppState};
use nixora::sui::SuiClient;
use nixora::tools::Toolbox;
use nixora::AgentResult;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> AgentResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Arc::new(Config::from_env());
    info!(
        "[main] starting nixora model={} network={}",
        config.model,
        config.network.name()
    );

    // One shared HTTP client; per-call timeouts are layered where needed.
    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(60))
        .build()?;

    let provider: Arc<OpenAiCompatProvider> = Arc::new(OpenAiCompatProvider::new(
        http.clone(),
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
    ));
    let sui = SuiClient::new(http.clone(), config.network);
    let toolbox = Arc::new(Toolbox::new(
        Arc::clone(&config),
        http,
        provider.clone(),
        sui,
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&config),
        provider,
        Arc::clone(&toolbox),
    ));

    server::serve(AppState { config, orchestrator, toolbox }).await
}
