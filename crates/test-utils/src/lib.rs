//! # foundry-zksync-test-utils
//!
//! Internal test utilities for the zkSync helpers.
#![warn(unused_crate_dependencies)]

#[macro_use]
extern crate tracing;

mod ledger;
pub use ledger::{InMemoryLedger, InMemoryReceipts};

/// Initializes tracing for tests.
///
/// Filtered through `RUST_LOG`, written to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
