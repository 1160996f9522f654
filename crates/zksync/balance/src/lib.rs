//! # foundry-zksync-balance
//!
//! Net balance changes caused by a single mined transaction.
//!
//! The [`BalanceDeltaCalculator`] compares every account's balance at the transaction's block
//! with its balance at the parent block. By default the gas fee paid by the sender is added back,
//! so that the reported change is the transferred value alone.
#![warn(missing_docs, unused_crate_dependencies)]

mod calculator;
pub use calculator::{
    BalanceDeltaCalculator, DeltaMismatch, DeltaOptions, FeeOverride, TransactionFeeRecord,
};

mod error;
pub use error::{BalanceDeltaError, ReaderError};

pub mod provider;
pub use provider::{ProviderLedger, ProviderReceipts};

mod reader;
pub use reader::{LedgerReader, MinedReceipt, ReceiptReader};

#[cfg(test)]
use foundry_zksync_test_utils as _;
