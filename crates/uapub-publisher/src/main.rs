//! uapub publisher daemon.
//!
//! Usage: `uapub-publisher [config.yaml]` (default `uapub.yaml`).
//! Log filtering follows `RUST_LOG`.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use uapub_core::error::{PubSubError, Result};
use uapub_publisher::writer::SimulatedSource;
use uapub_publisher::{app_state::AppState, config, publisher, router, transport};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(code = e.code().as_str(), error = %e, "uapub-publisher failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "uapub.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    tracing::info!(config = %path, groups = cfg.writer_groups.len(), "config loaded");

    let transport = transport::from_config(&cfg.transport).await?;
    let source = Arc::new(SimulatedSource::from_config(&cfg));
    let state = AppState::new(cfg, transport, source)?;

    if let Some(listen) = state.cfg().publisher.ops_addr() {
        let listener = tokio::net::TcpListener::bind(listen)
            .await
            .map_err(|e| PubSubError::Internal(format!("ops bind {listen} failed: {e}")))?;
        let app = router::build_router(state.clone());
        tracing::info!(%listen, "ops endpoints listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "ops server failed");
            }
        });
    }

    tracing::info!("uapub-publisher starting");
    publisher::run(state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler failed, stopping");
        }
    })
    .await
}
