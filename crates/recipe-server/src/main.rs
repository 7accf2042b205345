use std::sync::Arc;

use anyhow::Context as _;
use recipe_ai_harness::vendors::openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
use recipe_ai_harness::{Harness, ModelRef};
use recipe_core::init_observability;
use recipe_server::{AppState, ServerConfig, build_router, config};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init();
    init_observability();

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    let provider = OpenAiCompatProvider::new(
        config.provider_name.as_str(),
        OpenAiCompatConfig::new(config.provider_api_key.clone())
            .base_url(config.provider_base_url.clone()),
    )?;
    let harness = Harness::builder()
        .register_provider(Arc::new(provider))
        .build()?;
    let model = ModelRef::new(config.provider_name.as_str(), config.model.clone());
    harness
        .check_model(&model)
        .context("configured model is not served by any provider")?;
    let state = AppState::new(harness, model, config.relay_options());
    let app = build_router(state, &config.cors_origins);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        %addr,
        provider = %config.provider_name,
        model = %config.model,
        "recipe relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("recipe relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
