//! Student performance prediction service.

pub mod config;
pub mod error;
pub mod handle;
pub mod routes;
pub mod schema;
pub mod startup;

use crate::config::{ServerConfig, ServiceConfig};
use crate::handle::ModelHandle;
use crate::routes::{router, AppState};
use anyhow::{Context, Result};
use perf_core::{shutdown_signal, Lifecycle};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Loads the model, then binds and serves until a shutdown signal. The
/// listener is never bound when the model fails to load.
pub async fn run(cfg: ServiceConfig) -> Result<()> {
    let mut lifecycle = Lifecycle::new();
    lifecycle.advance();
    let handle = match startup::initialize(&cfg.model).await {
        Ok(handle) => handle,
        Err(e) => {
            lifecycle.fail();
            error!(error = %e, elapsed_ms = lifecycle.elapsed().as_millis() as u64, "model_load_failed");
            return Err(anyhow::Error::new(e).context("model could not be loaded"));
        }
    };
    let listener = TcpListener::bind(&cfg.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind_addr))?;
    lifecycle.advance();
    serve(listener, handle, &cfg.server, &lifecycle).await
}

pub async fn serve(listener: TcpListener, handle: ModelHandle, server: &ServerConfig, lifecycle: &Lifecycle) -> Result<()> {
    let addr = listener.local_addr()?;
    let phases: Vec<String> = lifecycle
        .durations()
        .iter()
        .map(|(phase, took)| format!("{phase:?}={}ms", took.as_millis()))
        .collect();
    info!(%addr, model = ?handle.label(), startup_ms = lifecycle.elapsed().as_millis() as u64, ?phases, "listening");
    let app = router(AppState::new(handle, server.inference_timeout()), server.max_body_bytes);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server_stopped");
    Ok(())
}
