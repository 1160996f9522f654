use std::fmt;

use alloy_primitives::{Address, I256, Sign, TxHash, U256};
use futures::{TryFutureExt, future::try_join_all};
use tracing::{debug, trace};

use crate::{BalanceDeltaError, LedgerReader, MinedReceipt, ReceiptReader};

/// How deltas are reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeltaOptions {
    /// Report the raw balance change of the sender, fee included.
    ///
    /// Unless explicitly `Some(true)`, the fee paid by the sender is added back to its delta.
    pub include_fee: Option<bool>,
}

impl DeltaOptions {
    fn adds_back_fee(&self) -> bool {
        self.include_fee != Some(true)
    }
}

/// Overrides the gas price used to compute the transaction fee.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeOverride {
    /// Price per unit of gas, takes precedence over the receipt.
    pub max_fee_per_gas: Option<U256>,
}

/// Fee paid by a mined transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionFeeRecord {
    /// Account paying the fee.
    pub payer: Address,
    /// Gas used by the transaction.
    pub gas_used: U256,
    /// Price per unit of gas.
    pub effective_gas_price: U256,
}

impl TransactionFeeRecord {
    /// Derives the fee of `receipt`.
    ///
    /// The gas price is taken from `fee_override`, then the receipt's effective gas price, then
    /// the transaction's declared gas price.
    pub fn from_receipt(
        receipt: &MinedReceipt,
        fee_override: &FeeOverride,
    ) -> Result<Self, BalanceDeltaError> {
        let effective_gas_price = fee_override
            .max_fee_per_gas
            .or(receipt.effective_gas_price)
            .or(receipt.gas_price)
            .ok_or(BalanceDeltaError::MissingGasPrice(receipt.transaction_hash))?;
        Ok(Self { payer: receipt.from, gas_used: receipt.gas_used, effective_gas_price })
    }

    /// Returns `gas_used * effective_gas_price`.
    pub fn fee(&self) -> Option<U256> {
        self.gas_used.checked_mul(self.effective_gas_price)
    }
}

/// An account whose delta differs from the expected one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeltaMismatch {
    /// Account address.
    pub account: Address,
    /// Expected delta.
    pub expected: I256,
    /// Computed delta.
    pub actual: I256,
}

impl fmt::Display for DeltaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, got {}", self.account, self.expected, self.actual)
    }
}

/// Computes the net balance change of accounts caused by a single transaction.
#[derive(Clone, Debug)]
pub struct BalanceDeltaCalculator<L, R> {
    ledger: L,
    receipts: R,
}

impl<L: LedgerReader, R: ReceiptReader> BalanceDeltaCalculator<L, R> {
    /// Creates a new calculator reading balances from `ledger` and receipts from `receipts`.
    pub fn new(ledger: L, receipts: R) -> Self {
        Self { ledger, receipts }
    }

    /// Returns the ledger reader.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Returns the receipt reader.
    pub fn receipts(&self) -> &R {
        &self.receipts
    }

    /// Returns the balance delta of every account in `accounts`, in the same order.
    ///
    /// Balances are read at the transaction's block and at its parent, concurrently for all
    /// accounts. Any failed read fails the whole computation.
    pub async fn compute(
        &self,
        tx: TxHash,
        accounts: &[Address],
        options: DeltaOptions,
        fee_override: FeeOverride,
    ) -> Result<Vec<I256>, BalanceDeltaError> {
        let receipt = self
            .receipts
            .wait(tx)
            .await
            .map_err(|source| BalanceDeltaError::NotMined { tx, source })?;
        let block = receipt.block_number;
        let parent = block.checked_sub(1).ok_or(BalanceDeltaError::GenesisBlock(tx))?;
        debug!(%tx, block, ?accounts, ?options, "computing balance deltas");

        let fee = if options.adds_back_fee() && accounts.contains(&receipt.from) {
            let record = TransactionFeeRecord::from_receipt(&receipt, &fee_override)?;
            let fee = record.fee().ok_or(BalanceDeltaError::Overflow(record.payer))?;
            trace!(payer = %record.payer, %fee, "adding back fee");
            fee
        } else {
            U256::ZERO
        };

        let samples =
            try_join_all(accounts.iter().map(|&account| self.sample(account, parent, block)))
                .await?;

        accounts
            .iter()
            .zip(samples)
            .map(|(&account, (before, after))| {
                let contribution = if account == receipt.from { fee } else { U256::ZERO };
                let delta = signed_delta(before, after, contribution)
                    .ok_or(BalanceDeltaError::Overflow(account))?;
                trace!(%account, %before, %after, %delta, "balance delta");
                Ok(delta)
            })
            .collect()
    }

    /// Returns the balance delta of a single account.
    pub async fn compute_one(
        &self,
        tx: TxHash,
        account: Address,
        options: DeltaOptions,
        fee_override: FeeOverride,
    ) -> Result<I256, BalanceDeltaError> {
        let deltas = self.compute(tx, &[account], options, fee_override).await?;
        Ok(deltas[0])
    }

    /// Checks that the deltas of `accounts` equal `expected`, pairwise.
    ///
    /// Returns the computed deltas, or [`BalanceDeltaError::Mismatch`] listing every account
    /// whose delta differs. Nothing is read when the lengths of `accounts` and `expected` differ.
    pub async fn assert_deltas(
        &self,
        tx: TxHash,
        accounts: &[Address],
        expected: &[I256],
        options: DeltaOptions,
        fee_override: FeeOverride,
    ) -> Result<Vec<I256>, BalanceDeltaError> {
        if accounts.len() != expected.len() {
            return Err(BalanceDeltaError::ExpectedLength {
                accounts: accounts.len(),
                expected: expected.len(),
            });
        }
        let actual = self.compute(tx, accounts, options, fee_override).await?;
        let mismatches: Vec<_> = accounts
            .iter()
            .zip(expected.iter().zip(&actual))
            .filter(|(_, (expected, actual))| expected != actual)
            .map(|(&account, (&expected, &actual))| DeltaMismatch { account, expected, actual })
            .collect();
        if mismatches.is_empty() {
            Ok(actual)
        } else {
            Err(BalanceDeltaError::Mismatch(mismatches))
        }
    }

    /// Reads the balance of `account` before and after the transaction's block.
    async fn sample(
        &self,
        account: Address,
        parent: u64,
        block: u64,
    ) -> Result<(U256, U256), BalanceDeltaError> {
        futures::try_join!(
            self.ledger
                .balance_at(account, parent)
                .map_err(|err| BalanceDeltaError::ledger(account, parent, err)),
            self.ledger
                .balance_at(account, block)
                .map_err(|err| BalanceDeltaError::ledger(account, block, err)),
        )
    }
}

/// Returns `after + fee - before` as a signed integer.
fn signed_delta(before: U256, after: U256, fee: U256) -> Option<I256> {
    let credited = after.checked_add(fee)?;
    if credited >= before {
        I256::checked_from_sign_and_abs(Sign::Positive, credited - before)
    } else {
        I256::checked_from_sign_and_abs(Sign::Negative, before - credited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_delta_handles_both_directions() {
        let u = |value: u64| U256::from(value);
        assert_eq!(signed_delta(u(1000), u(950), u(20)), Some(I256::try_from(-30).unwrap()));
        assert_eq!(signed_delta(u(500), u(570), U256::ZERO), Some(I256::try_from(70).unwrap()));
        assert_eq!(signed_delta(u(7), u(7), U256::ZERO), Some(I256::ZERO));
        assert_eq!(signed_delta(U256::ZERO, U256::MAX, u(1)), None);
        assert_eq!(signed_delta(U256::ZERO, U256::MAX, U256::ZERO), None);
    }

    #[test]
    fn fee_price_precedence() {
        let mut receipt = MinedReceipt {
            transaction_hash: TxHash::ZERO,
            from: Address::ZERO,
            block_number: 1,
            gas_used: U256::from(10),
            effective_gas_price: Some(U256::from(3)),
            gas_price: Some(U256::from(5)),
        };
        let overridden = FeeOverride { max_fee_per_gas: Some(U256::from(7)) };

        let fee = |receipt: &MinedReceipt, fee_override: &FeeOverride| {
            TransactionFeeRecord::from_receipt(receipt, fee_override).unwrap().fee().unwrap()
        };
        assert_eq!(fee(&receipt, &overridden), U256::from(70));
        assert_eq!(fee(&receipt, &FeeOverride::default()), U256::from(30));

        receipt.effective_gas_price = None;
        assert_eq!(fee(&receipt, &FeeOverride::default()), U256::from(50));

        receipt.gas_price = None;
        assert!(matches!(
            TransactionFeeRecord::from_receipt(&receipt, &FeeOverride::default()),
            Err(BalanceDeltaError::MissingGasPrice(_))
        ));
    }

    #[test]
    fn only_explicit_include_fee_skips_fee() {
        assert!(DeltaOptions::default().adds_back_fee());
        assert!(DeltaOptions { include_fee: Some(false) }.adds_back_fee());
        assert!(!DeltaOptions { include_fee: Some(true) }.adds_back_fee());
    }
}
