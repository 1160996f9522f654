//! [`LedgerReader`] and [`ReceiptReader`] implementations backed by an RPC provider.

use std::marker::PhantomData;

use alloy_consensus::Transaction as _;
use alloy_network::{Ethereum, Network, ReceiptResponse};
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::{PendingTransactionBuilder, Provider};
use async_trait::async_trait;
use tracing::trace;

use crate::{BalanceDeltaCalculator, LedgerReader, MinedReceipt, ReaderError, ReceiptReader};

/// Reads balances with `eth_getBalance` at a given block.
#[derive(Clone, Debug)]
pub struct ProviderLedger<P, N = Ethereum> {
    provider: P,
    _network: PhantomData<N>,
}

impl<P, N> ProviderLedger<P, N> {
    /// Creates a new ledger reader.
    pub fn new(provider: P) -> Self {
        Self { provider, _network: PhantomData }
    }
}

#[async_trait]
impl<P, N> LedgerReader for ProviderLedger<P, N>
where
    P: Provider<N>,
    N: Network,
{
    async fn balance_at(&self, address: Address, block: u64) -> Result<U256, ReaderError> {
        Ok(self.provider.get_balance(address).number(block).await?)
    }
}

/// Resolves receipts with `eth_getTransactionReceipt`, watching pending transactions until they
/// are mined.
#[derive(Clone, Debug)]
pub struct ProviderReceipts<P, N = Ethereum> {
    provider: P,
    _network: PhantomData<N>,
}

impl<P, N> ProviderReceipts<P, N> {
    /// Creates a new receipt reader.
    pub fn new(provider: P) -> Self {
        Self { provider, _network: PhantomData }
    }
}

#[async_trait]
impl<P, N> ReceiptReader for ProviderReceipts<P, N>
where
    P: Provider<N>,
    N: Network,
{
    async fn wait(&self, tx: TxHash) -> Result<MinedReceipt, ReaderError> {
        let receipt = match self.provider.get_transaction_receipt(tx).await? {
            Some(receipt) => receipt,
            None => {
                trace!(%tx, "transaction pending, waiting for receipt");
                PendingTransactionBuilder::new(self.provider.root().clone(), tx)
                    .get_receipt()
                    .await
                    .map_err(|err| ReaderError::NotMined(tx, err.to_string()))?
            }
        };
        let block_number = receipt
            .block_number()
            .ok_or_else(|| ReaderError::NotMined(tx, "receipt has no block number".to_string()))?;

        let gas_price = self
            .provider
            .get_transaction_by_hash(tx)
            .await?
            .and_then(|transaction| transaction.gas_price())
            .map(U256::from);

        Ok(MinedReceipt {
            transaction_hash: tx,
            from: receipt.from(),
            block_number,
            gas_used: U256::from(receipt.gas_used()),
            effective_gas_price: Some(U256::from(receipt.effective_gas_price())),
            gas_price,
        })
    }
}

impl<P, N> BalanceDeltaCalculator<ProviderLedger<P, N>, ProviderReceipts<P, N>>
where
    P: Provider<N> + Clone,
    N: Network,
{
    /// Creates a calculator reading balances and receipts from `provider`.
    pub fn from_provider(provider: P) -> Self {
        Self::new(ProviderLedger::new(provider.clone()), ProviderReceipts::new(provider))
    }
}
