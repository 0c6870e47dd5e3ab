//! Layered configuration loading: embedded defaults, then an optional file, then environment
//! variables.

use crate::domain::error::{Error, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;
use validator::Validate;

use super::types::Config;

/// The config shipped inside the binary, used whenever no `--config` path is given and as the
/// base layer when one is.
const DEFAULT_CONFIG_TOML: &str = include_str!("../../config/default.toml");

/// Returns the embedded default config TOML, exposed for tests that want to assert on it.
pub fn embedded_defaults_toml() -> &'static str {
    DEFAULT_CONFIG_TOML
}

/// Loads configuration from embedded defaults, an optional file override, and `KBCORE_`-prefixed
/// environment variables, in that precedence order (later sources win).
pub fn load(config_path: Option<&Path>) -> Result<Config> {
    let mut builder =
        ConfigBuilder::builder().add_source(File::from_str(DEFAULT_CONFIG_TOML, FileFormat::Toml));

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path));
    }

    builder = builder.add_source(
        Environment::with_prefix("KBCORE")
            .separator("__")
            .try_parsing(true),
    );

    let raw = builder.build()?;
    let config: Config = raw.try_deserialize()?;
    config
        .validate()
        .map_err(|e| Error::config(format!("configuration validation failed: {e}")))?;
    Ok(config)
}

/// Loads only the embedded defaults, bypassing any file or environment override. Used by tests
/// that want to assert the shipped defaults are self-consistent.
pub fn load_embedded_defaults() -> Result<Config> {
    load(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse_and_validate() {
        let config = load_embedded_defaults().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.providers.embedding.kind, "mock");
    }

    #[test]
    fn environment_override_wins_over_defaults() {
        std::env::set_var("KBCORE__SERVER__PORT", "9999");
        let config = load(None).unwrap();
        std::env::remove_var("KBCORE__SERVER__PORT");
        assert_eq!(config.server.port, 9999);
    }
}
