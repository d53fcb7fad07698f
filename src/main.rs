mod config;
mod llm;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::convert::{Converter, LlmConverter, UnavailableConverter};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("failed to bind port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },
    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("ignoring unreadable .env: {e}");
        }
    }
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env()?;

    // Conversion is optional: without a model the route answers 503.
    let converter: Arc<dyn Converter> = match llm_converter() {
        Ok(converter) => Arc::new(converter),
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured, deck conversion disabled");
            Arc::new(UnavailableConverter)
        }
    };

    let state = state::AppState::new(converter);
    let app = routes::app(state, &config.static_dir);

    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|source| StartupError::Bind { port, source })?;

    tracing::info!(%port, static_dir = %config.static_dir.display(), "slideflow listening");
    axum::serve(listener, app).await.map_err(StartupError::Serve)
}

fn llm_converter() -> Result<LlmConverter, llm::LlmError> {
    let config = llm::LlmConfig::from_env()?;
    let max_tokens = config.max_tokens;
    let client = llm::AnthropicClient::from_config(config)?;
    tracing::info!(model = client.model(), "LLM client initialized");
    Ok(LlmConverter::new(Arc::new(client), max_tokens))
}
