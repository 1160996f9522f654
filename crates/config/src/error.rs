use thiserror::Error;

/// Errors raised while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or a value has the wrong type.
    #[error(transparent)]
    Figment(#[from] figment::Error),
    /// The first lock retry would already exceed the total wait budget.
    #[error("lock_min_timeout_ms ({min}) is greater than lock_max_timeout_ms ({max})")]
    LockTimeouts {
        /// Configured `lock_min_timeout_ms`.
        min: u64,
        /// Configured `lock_max_timeout_ms`.
        max: u64,
    },
}
