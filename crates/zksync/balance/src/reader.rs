use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::ReaderError;

/// Reads historical account balances.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Returns the native balance of `address` at the end of `block`.
    async fn balance_at(&self, address: Address, block: u64) -> Result<U256, ReaderError>;
}

/// Resolves transactions to their receipts.
#[async_trait]
pub trait ReceiptReader: Send + Sync {
    /// Waits until `tx` is mined and returns its receipt.
    ///
    /// Waiting on an already mined transaction returns immediately.
    async fn wait(&self, tx: TxHash) -> Result<MinedReceipt, ReaderError>;
}

/// The parts of a mined transaction's receipt needed for fee accounting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinedReceipt {
    /// Transaction hash.
    pub transaction_hash: TxHash,
    /// Sender, which pays the fee.
    pub from: Address,
    /// Block the transaction was mined in.
    pub block_number: u64,
    /// Gas used by the transaction.
    pub gas_used: U256,
    /// Price actually paid per unit of gas.
    pub effective_gas_price: Option<U256>,
    /// Gas price declared by the transaction.
    pub gas_price: Option<U256>,
}
