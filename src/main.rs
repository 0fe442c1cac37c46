use anyhow::Context;
use crisis_relay::{
    config::Config,
    provider::{cohere::CohereProvider, openai::OpenAiProvider},
    routes::{app, AppState},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting crisis-relay...");

    let config = Config::from_file("config.yaml").unwrap_or_else(|_| {
        info!("Failed to load config.yaml, using defaults with env overrides");
        Config::from_env()
    });

    // A missing credential is not fatal: the process serves its static
    // endpoints and the affected provider fails per request instead.
    if config.providers.openai.api_key.is_empty() {
        warn!("openai api key is not set; primary provider calls will fail");
    }
    if config.providers.cohere.api_key.is_empty() {
        warn!("cohere api key is not set; alternate provider calls will fail");
    }

    let primary = OpenAiProvider::new(&config.providers.openai, config.relay.connect_timeout)
        .context("failed to build primary provider client")?;
    let alternate = CohereProvider::new(
        &config.providers.cohere,
        config.relay.connect_timeout,
        config.relay.request_timeout,
    )
    .context("failed to build alternate provider client")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        primary: Arc::new(primary),
        alternate: Arc::new(alternate),
    };

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind listen address")?;
    axum::serve(listener, app(state))
        .await
        .context("server error")?;

    Ok(())
}
