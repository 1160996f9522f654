use std::{path::PathBuf, time::Duration};

use foundry_zksync_libraries::{LockRetryPolicy, ZkLibraryRegistry};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Missing libraries registry settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrariesConfig {
    /// Project root, the registry lives in its `.zksolc-libraries-cache` directory.
    pub root: PathBuf,
    /// Registry file, relative to `root` unless absolute.
    pub registry: Option<PathBuf>,
    /// Lock retries after the first attempt.
    pub lock_retries: u32,
    /// Wait before the first lock retry.
    pub lock_min_timeout_ms: u64,
    /// Total time spent waiting for the lock.
    pub lock_max_timeout_ms: u64,
}

impl Default for LibrariesConfig {
    fn default() -> Self {
        Self::with_root(".")
    }
}

impl LibrariesConfig {
    /// Returns the defaults for a project rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let policy = LockRetryPolicy::default();
        Self {
            root: root.into(),
            registry: None,
            lock_retries: policy.retries,
            lock_min_timeout_ms: policy.min_timeout.as_millis() as u64,
            lock_max_timeout_ms: policy.max_timeout.as_millis() as u64,
        }
    }

    /// Resolved location of the registry file.
    pub fn registry_path(&self) -> PathBuf {
        match &self.registry {
            Some(path) => self.root.join(path),
            None => ZkLibraryRegistry::default_path(&self.root),
        }
    }

    /// Lock retry policy used when appending to the registry.
    pub fn lock_policy(&self) -> LockRetryPolicy {
        LockRetryPolicy {
            retries: self.lock_retries,
            min_timeout: Duration::from_millis(self.lock_min_timeout_ms),
            max_timeout: Duration::from_millis(self.lock_max_timeout_ms),
        }
    }

    /// Opens the configured registry.
    pub fn registry(&self) -> ZkLibraryRegistry {
        ZkLibraryRegistry::new(self.registry_path()).with_lock_policy(self.lock_policy())
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_min_timeout_ms > self.lock_max_timeout_ms {
            return Err(ConfigError::LockTimeouts {
                min: self.lock_min_timeout_ms,
                max: self.lock_max_timeout_ms,
            });
        }
        Ok(())
    }
}
