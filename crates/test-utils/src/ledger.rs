//! In-memory ledger and receipt readers.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use foundry_zksync_balance::{LedgerReader, MinedReceipt, ReaderError, ReceiptReader};
use parking_lot::RwLock;

/// Balances keyed by `(address, block)`.
///
/// Unknown balances read as zero, blocks below the pruning horizon are unavailable.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: RwLock<HashMap<(Address, u64), U256>>,
    pruned_below: RwLock<Option<u64>>,
    failing: RwLock<Option<Address>>,
    requests: AtomicUsize,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the balance of `address` at the end of `block`.
    pub fn set_balance(&self, address: Address, block: u64, balance: U256) -> &Self {
        self.balances.write().insert((address, block), balance);
        self
    }

    /// Sets the balance of `address` before and after `block`.
    pub fn set_transition(
        &self,
        address: Address,
        block: u64,
        before: U256,
        after: U256,
    ) -> &Self {
        self.set_balance(address, block - 1, before).set_balance(address, block, after)
    }

    /// Makes every block below `block` unavailable, as a pruned node would.
    pub fn prune_below(&self, block: u64) {
        *self.pruned_below.write() = Some(block);
    }

    /// Makes every balance read of `address` fail.
    pub fn fail_for(&self, address: Address) {
        *self.failing.write() = Some(address);
    }

    /// Number of balance reads served so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn balance_at(&self, address: Address, block: u64) -> Result<U256, ReaderError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.pruned_below.read().is_some_and(|horizon| block < horizon) {
            return Err(ReaderError::BlockUnavailable(block));
        }
        if *self.failing.read() == Some(address) {
            return Err(ReaderError::Other(format!("balance of {address} unavailable")));
        }
        let balance = self.balances.read().get(&(address, block)).copied().unwrap_or_default();
        trace!(%address, block, %balance, "read balance");
        Ok(balance)
    }
}

/// Mined receipts keyed by transaction hash; unknown transactions are never mined.
#[derive(Debug, Default)]
pub struct InMemoryReceipts {
    receipts: RwLock<HashMap<TxHash, MinedReceipt>>,
    waits: AtomicUsize,
}

impl InMemoryReceipts {
    /// Creates an empty receipt store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a mined transaction.
    pub fn insert(&self, receipt: MinedReceipt) -> &Self {
        self.receipts.write().insert(receipt.transaction_hash, receipt);
        self
    }

    /// Number of receipt waits served so far.
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReceiptReader for InMemoryReceipts {
    async fn wait(&self, tx: TxHash) -> Result<MinedReceipt, ReaderError> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        self.receipts
            .read()
            .get(&tx)
            .cloned()
            .ok_or_else(|| ReaderError::NotMined(tx, "unknown transaction".to_string()))
    }
}
