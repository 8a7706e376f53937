//! newsrank HTTP server binary

use anyhow::Context;
use newsrank::server::{run_server, AppState};
use newsrank::{HttpRelevanceSource, LogisticRanker, RelevanceSource, RequestLimits, RerankEngine, ServiceConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let config = ServiceConfig::from_env().context("Invalid service configuration")?;
    info!("newsrank {} starting with {:?}", env!("CARGO_PKG_VERSION"), config);

    let relevance: Box<dyn RelevanceSource> = match config.relevance_service_url.clone() {
        Some(url) => {
            info!("Relevance: remote scoring service at {}", url);
            Box::new(HttpRelevanceSource::new(url, config.request_timeout)?)
        }
        None => {
            let model = LogisticRanker::load(&config.model_path)
                .with_context(|| format!("Model file not usable: {}", config.model_path))?;
            info!("Relevance: local model from {}", config.model_path);
            Box::new(model)
        }
    };

    let engine = RerankEngine::new(
        relevance,
        RequestLimits {
            default_k: config.default_k,
            max_k: config.max_k,
            max_candidates: config.max_candidates,
            embedding_dim: config.embedding_dim,
        },
    );

    let state = AppState {
        engine,
        request_timeout: config.request_timeout,
    };

    run_server(state, config.port).await?;

    Ok(())
}
