use alloy_primitives::{Address, TxHash};
use alloy_transport::TransportError;

use crate::DeltaMismatch;

/// Errors reported by ledger and receipt readers.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// The node no longer (or never did) hold the state at this height.
    #[error("state at block {0} is not available")]
    BlockUnavailable(u64),
    /// The transaction was not mined, or waiting for it failed.
    #[error("transaction {0} was not mined: {1}")]
    NotMined(TxHash, String),
    /// The RPC request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Any other reader failure.
    #[error("{0}")]
    Other(String),
}

/// Errors that can happen while computing balance deltas.
#[derive(Debug, thiserror::Error)]
pub enum BalanceDeltaError {
    /// The transaction receipt could not be resolved.
    #[error("failed to get receipt of transaction {tx}: {source}")]
    NotMined {
        /// Transaction hash.
        tx: TxHash,
        /// Reader error.
        #[source]
        source: ReaderError,
    },
    /// The transaction is in the genesis block, there is no state before it.
    #[error("transaction {0} was mined in the genesis block, there is no state before it")]
    GenesisBlock(TxHash),
    /// The state at this height was pruned by the node.
    #[error("state at block {0} is not available, the node may have pruned it")]
    BlockPruned(u64),
    /// A balance could not be read.
    #[error("failed to get balance of {address} at block {block}: {source}")]
    Ledger {
        /// Account address.
        address: Address,
        /// Block height.
        block: u64,
        /// Reader error.
        #[source]
        source: ReaderError,
    },
    /// Neither an override, the receipt nor the transaction provide a gas price.
    #[error("no gas price available for transaction {0}")]
    MissingGasPrice(TxHash),
    /// The fee or the delta do not fit in 256 bits.
    #[error("balance delta of {0} overflows")]
    Overflow(Address),
    /// A different number of expected deltas than accounts was given.
    #[error("{accounts} accounts but {expected} expected deltas")]
    ExpectedLength {
        /// Number of accounts.
        accounts: usize,
        /// Number of expected deltas.
        expected: usize,
    },
    /// Computed deltas differ from the expected ones.
    #[error("balance deltas mismatch:\n{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"))]
    Mismatch(Vec<DeltaMismatch>),
}

impl BalanceDeltaError {
    pub(crate) fn ledger(address: Address, block: u64, source: ReaderError) -> Self {
        match source {
            ReaderError::BlockUnavailable(block) => Self::BlockPruned(block),
            source => Self::Ledger { address, block, source },
        }
    }
}
