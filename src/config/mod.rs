//! Configuration parsing, overrides and validation.

pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

use tracing::warn;

use crate::common::error::ConfigError;

pub use parser::load_config;
pub use types::*;
pub use validate::{has_required_fields, validate_config};

/// Load the config file, apply environment overrides and validate the result.
pub fn load_and_validate(path: &str) -> Result<Settings, ConfigError> {
    let config = env::apply_env_overrides(load_config(path)?);

    for var in env::check_empty_env_vars() {
        warn!("Environment variable {} is set but empty", var);
    }

    if !has_required_fields(&config) {
        warn!("Config is missing discord.token, discord.channel or servers");
    }

    validate_config(&config)
}
