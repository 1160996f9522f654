//! # foundry-zksync-libraries
//!
//! Bookkeeping for zksolc's non-inlineable libraries.
//!
//! Compilations running with `--zk-detect-missing-libraries` report every contract whose
//! bytecode still references an undeployed library. Those reports are accumulated in a
//! [`ZkLibraryRegistry`], a JSON file shared by every compiler process of a build session, and
//! are later turned into a deployment order with [`resolve_libraries`].
#![warn(missing_docs, unused_crate_dependencies)]

pub mod error;
pub mod lock;
mod record;
pub mod registry;
mod resolve;

pub use error::{LibraryRegistryError, Result};
pub use lock::{LockError, LockFile, LockRetryPolicy};
pub use record::{LibraryId, ZkMissingLibrary};
pub use registry::ZkLibraryRegistry;
pub use resolve::{DeployableLibrary, resolve_libraries};

#[cfg(test)]
use foundry_zksync_test_utils as _;
