//! Layered configuration: built-in defaults, an optional file, `PERF__*`
//! environment variables, then explicit overrides.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use serde::de::DeserializeOwned;

/// Names a config file (yaml, toml or json, picked by extension).
pub const CONFIG_FILE_ENV: &str = "PERF_CONFIG_FILE";
pub const ENV_PREFIX: &str = "PERF";
pub const ENV_SEPARATOR: &str = "__";

/// Builds `T` from `defaults` plus the process environment. `overrides` are applied
/// last; `None` values leave the key untouched.
pub fn load_layered<T: DeserializeOwned>(
    defaults: ConfigBuilder<DefaultState>,
    overrides: &[(&str, Option<String>)],
) -> Result<T, ConfigError> {
    let file = std::env::var(CONFIG_FILE_ENV).ok();
    load_from(defaults, file.as_deref(), environment(), overrides)
}

/// `PERF__*` environment source.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR).try_parsing(true)
}

/// [`load_layered`] with every source given explicitly.
pub fn load_from<T: DeserializeOwned>(
    defaults: ConfigBuilder<DefaultState>,
    file: Option<&str>,
    env: Environment,
    overrides: &[(&str, Option<String>)],
) -> Result<T, ConfigError> {
    let mut builder = defaults;
    if let Some(path) = file {
        builder = builder.add_source(File::with_name(path).required(true));
    }
    builder = builder.add_source(env);
    for (key, value) in overrides {
        builder = builder.set_override_option(*key, value.clone())?;
    }
    builder.build()?.try_deserialize()
}
