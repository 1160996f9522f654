//! Errors of the missing libraries registry.

use std::{io, path::PathBuf};

use crate::lock::LockError;

/// Result alias for registry operations.
pub type Result<T, E = LibraryRegistryError> = std::result::Result<T, E>;

/// Errors that can happen while working with the missing libraries registry.
#[derive(Debug, thiserror::Error)]
pub enum LibraryRegistryError {
    /// The registry file or its directory could not be accessed.
    #[error("failed to access library registry {}: {source}", .path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The registry lock could not be taken within the retry budget.
    #[error("timed out waiting for library registry lock {} after {attempts} attempts", .path.display())]
    LockTimeout {
        /// Lock file path.
        path: PathBuf,
        /// Number of lock attempts made.
        attempts: u32,
    },
    /// The registry file does not hold a JSON array of missing libraries.
    #[error("library registry {} is corrupt: {source}", .path.display())]
    Corrupt {
        /// Registry path.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },
    /// Merging or writing the registry failed while holding the lock.
    #[error("failed to write library registry {}: {source}", .path.display())]
    Write {
        /// Registry path.
        path: PathBuf,
        /// Root cause.
        #[source]
        source: io::Error,
    },
    /// No missing libraries were recorded.
    #[error("no missing libraries found at {}", .path.display())]
    NotFound {
        /// Registry path.
        path: PathBuf,
    },
    /// A library identifier is not of the `path:Name` form.
    #[error("invalid library identifier `{0}`, expected `<path>:<name>`")]
    InvalidLibraryId(String),
    /// None of the remaining libraries can be deployed.
    #[error("library dependency cycle detected between: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}

impl From<LockError> for LibraryRegistryError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Io(path, source) => Self::Io { path, source },
            LockError::Timeout(path, attempts) => Self::LockTimeout { path, attempts },
        }
    }
}
