//! nerid API Server
//!
//! REST API server for Indonesian named-entity highlighting.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use nerid_api::{create_router, state::AppState};
use nerid_core::config::{AppConfig, LoggingConfig};
use nerid_extractor::{build_classifier, NerPipeline};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration: optional TOML file, then environment
    let config = match std::env::var("NERID_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)
            .with_context(|| format!("loading {path}"))?
            .with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };

    init_tracing(&config.logging);

    let registry = config.validate().context("invalid configuration")?;

    // The classifier is built once and shared read-only by every request
    let classifier = build_classifier(&config.classifier)?;
    let pipeline = NerPipeline::new(classifier, Arc::new(registry), config.merge.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(
        backend = pipeline.classifier_name(),
        background_policy = %config.merge.background_policy,
        "Pipeline ready"
    );

    // Create application state
    let state = Arc::new(AppState::new(config, pipeline));

    // Create router
    let app = create_router(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("nerid API Server starting on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    tracing::info!("nerid API Server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "nerid_api={level},nerid_extractor={level},tower_http=info",
            level = logging.level
        )
        .into()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    // /ready answers 503 while in-flight requests drain
    state.set_ready(false);
    tracing::info!("Shutdown requested, readiness cleared");
}
