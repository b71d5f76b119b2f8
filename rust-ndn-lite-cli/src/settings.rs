//! Node configuration.
//!
//! Values come from an optional file (any format the `config` crate
//! understands) and are overridden by `NDN_LITE__SECTION__KEY` environment
//! variables, e.g. `NDN_LITE__FORWARDER__PIT_CAPACITY=64`.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use rust_ndn_lite_app::BootstrapConfig;
use rust_ndn_lite_forwarder::ForwarderConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub forwarder: ForwarderConfig,
    pub bootstrap: BootstrapConfig,
}

impl NodeConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix("NDN_LITE").separator("__").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;
        config.try_deserialize().context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"forwarder": {{"pit_capacity": 32}}, "bootstrap": {{"max_retries": 1}}}}"#).unwrap();

        let config = NodeConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.forwarder.pit_capacity, 32);
        assert_eq!(config.forwarder.fib_capacity, 128);
        assert_eq!(config.bootstrap.max_retries, 1);
        assert_eq!(config.bootstrap.sign_on_prefix, "/ndn/sign-on");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(NodeConfig::load(Some(Path::new("/nonexistent/ndn-lite.toml"))).is_err());
    }
}
