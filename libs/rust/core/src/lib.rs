//! Core shared utilities for the student performance services.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod config;
pub mod lifecycle;
pub mod shutdown;

pub use lifecycle::{Lifecycle, Phase};
pub use shutdown::shutdown_signal;

/// Environment switch for JSON formatted logs.
pub const JSON_LOG_ENV: &str = "PERF_JSON_LOG";

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Installs the global tracing subscriber. Safe to call more than once; only the
/// first call installs anything.
pub fn init_tracing(service: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);
        if flag_enabled(std::env::var(JSON_LOG_ENV).ok().as_deref()) {
            registry
                .with(fmt::layer().json().flatten_event(true).with_current_span(true).with_span_list(false))
                .try_init()?;
        } else {
            registry
                .with(fmt::layer().with_target(true).with_thread_ids(false).with_line_number(true))
                .try_init()?;
        }
        Ok(())
    })?;
    info!(target: "perf_core", service = %service, "tracing_initialized");
    Ok(())
}

fn flag_enabled(value: Option<&str>) -> bool {
    value.map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}
