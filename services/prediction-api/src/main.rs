use anyhow::{Context, Result};
use prediction_api::config::ServiceConfig;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    perf_core::init_tracing("prediction-api")?;
    let cfg = ServiceConfig::load().context("loading configuration")?;
    info!(
        bind_addr = %cfg.server.bind_addr,
        tracking_uri = %cfg.model.tracking_uri,
        model_uri = %cfg.model.model_uri,
        token_set = cfg.model.tracking_token.is_some(),
        inference_timeout_ms = cfg.server.inference_timeout_ms,
        "config_loaded"
    );
    prediction_api::run(cfg).await
}
