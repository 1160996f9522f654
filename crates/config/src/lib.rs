//! # foundry-zksync-config
//!
//! Configuration of the zkSync helpers.
//!
//! Values are merged, lowest precedence first, from the built-in defaults, a `zkhelpers.toml`
//! file in the project root and `ZKHELPERS_` prefixed environment variables. Nested keys are
//! separated by `__` in the environment, e.g. `ZKHELPERS_LIBRARIES__LOCK_RETRIES=5`.
#![warn(missing_docs, unused_crate_dependencies)]

#[macro_use]
extern crate tracing;

use std::path::{Path, PathBuf};

use figment::{
    Figment, Provider,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub use figment;

mod balance;
pub use balance::BalanceConfig;

mod error;
pub use error::ConfigError;

mod libraries;
pub use libraries::LibrariesConfig;

/// Name of the configuration file looked up in the project root.
pub const FILE_NAME: &str = "zkhelpers.toml";

/// Prefix of the environment variables overriding the configuration.
pub const ENV_PREFIX: &str = "ZKHELPERS_";

/// Configuration of the zkSync helpers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZkHelpersConfig {
    /// Missing libraries registry.
    pub libraries: LibrariesConfig,
    /// Balance delta computation.
    pub balance: BalanceConfig,
}

impl ZkHelpersConfig {
    /// Returns the defaults for a project rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { libraries: LibrariesConfig::with_root(root), ..Default::default() }
    }

    /// Returns the figment used to load the configuration of the project rooted at `root`.
    ///
    /// Additional providers merged on top of it take precedence over every source in it.
    pub fn figment(root: impl AsRef<Path>) -> Figment {
        let root = root.as_ref();
        Figment::from(Serialized::defaults(Self::with_root(root)))
            .merge(Toml::file(root.join(FILE_NAME)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads the configuration of the project rooted at `root`.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_provider(Self::figment(root))
    }

    /// Loads the configuration of the project in the current directory.
    pub fn load_from_current_dir() -> Result<Self, ConfigError> {
        Self::load(".")
    }

    /// Extracts and validates the configuration from `provider`.
    pub fn from_provider(provider: impl Provider) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(provider).extract()?;
        config.validate()?;
        trace!(?config, "loaded configuration");
        Ok(config)
    }

    /// Checks values that deserialize fine but can not be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.libraries.validate()
    }
}
