use alloy_primitives::U256;
use foundry_zksync_balance::{DeltaOptions, FeeOverride};
use serde::{Deserialize, Serialize};

/// Balance delta settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// RPC endpoint of the zkSync node.
    pub rpc_url: Option<String>,
    /// Report the sender's balance change with the fee included.
    pub include_fee: Option<bool>,
    /// Gas price used for the fee instead of the receipt's.
    pub max_fee_per_gas: Option<U256>,
}

impl BalanceConfig {
    /// Delta options for the calculator.
    pub fn options(&self) -> DeltaOptions {
        DeltaOptions { include_fee: self.include_fee }
    }

    /// Fee override for the calculator.
    pub fn fee_override(&self) -> FeeOverride {
        FeeOverride { max_fee_per_gas: self.max_fee_per_gas }
    }
}
