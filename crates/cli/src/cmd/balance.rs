use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::{ProviderBuilder, network::Ethereum};
use clap::Parser;
use eyre::{OptionExt, Result, WrapErr};
use foundry_zksync_balance::{
    BalanceDeltaCalculator,
    provider::{ProviderLedger, ProviderReceipts},
};
use foundry_zksync_config::BalanceConfig;
use url::Url;

use crate::utils::format_delta;

/// CLI arguments for `zkhelpers balance-delta`.
#[derive(Clone, Debug, Parser)]
pub struct BalanceDeltaArgs {
    /// Hash of the transaction, waited for if still pending.
    #[arg(long, value_name = "TX_HASH")]
    pub tx: TxHash,

    /// Account whose balance change to report. Can be passed multiple times.
    #[arg(long = "account", value_name = "ADDRESS", num_args = 1.., required = true)]
    pub accounts: Vec<Address>,

    /// Report the sender's raw balance change, fee included.
    ///
    /// By default the fee paid by the sender is added back to its delta.
    #[arg(long)]
    pub include_fee: bool,

    /// Gas price used to compute the fee instead of the one in the receipt.
    #[arg(long, value_name = "PRICE")]
    pub max_fee_per_gas: Option<U256>,

    /// The RPC endpoint of the zkSync node.
    #[arg(short, long, value_name = "URL", env = "ETH_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Print the deltas as JSON.
    #[arg(long)]
    pub json: bool,
}

impl BalanceDeltaArgs {
    /// Merges the command line arguments into `config`.
    pub fn apply_overrides(&self, mut config: BalanceConfig) -> BalanceConfig {
        set_if_some!(self.rpc_url.clone(), config.rpc_url);
        set_if_some!(self.include_fee.then_some(true), config.include_fee);
        set_if_some!(self.max_fee_per_gas, config.max_fee_per_gas);
        config
    }

    pub async fn run(self, config: BalanceConfig) -> Result<()> {
        let config = self.apply_overrides(config);
        let rpc_url = config
            .rpc_url
            .as_deref()
            .ok_or_eyre("no RPC endpoint, pass --rpc-url or set `balance.rpc_url`")?;
        let url: Url = rpc_url.parse().wrap_err_with(|| format!("invalid RPC URL {rpc_url}"))?;
        debug!(%url, tx = %self.tx, accounts = self.accounts.len(), "computing balance deltas");

        let provider = ProviderBuilder::new().connect_http(url);
        let calculator = BalanceDeltaCalculator::<
            ProviderLedger<_, Ethereum>,
            ProviderReceipts<_, Ethereum>,
        >::from_provider(provider);
        let deltas = calculator
            .compute(self.tx, &self.accounts, config.options(), config.fee_override())
            .await
            .wrap_err_with(|| format!("failed to compute balance deltas of {}", self.tx))?;

        if self.json {
            let deltas: serde_json::Map<String, serde_json::Value> = self
                .accounts
                .iter()
                .zip(&deltas)
                .map(|(account, delta)| (account.to_string(), delta.to_string().into()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&deltas)?);
        } else {
            for (account, delta) in self.accounts.iter().zip(deltas) {
                println!("{account} {}", format_delta(delta));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    const TX: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
    const ACCOUNT: &str = "0x36615Cf349d7F6344891B1e7CA7C72883F5dc049";

    #[test]
    fn parses_args() {
        let args = BalanceDeltaArgs::parse_from([
            "balance-delta",
            "--tx",
            TX,
            "--account",
            ACCOUNT,
            "--include-fee",
            "--max-fee-per-gas",
            "250000000",
        ]);
        assert_eq!(
            args.tx,
            b256!("0x1111111111111111111111111111111111111111111111111111111111111111")
        );
        assert_eq!(args.accounts, vec![address!("0x36615Cf349d7F6344891B1e7CA7C72883F5dc049")]);
        assert!(args.include_fee);
        assert_eq!(args.max_fee_per_gas, Some(U256::from(250_000_000u64)));
    }

    #[test]
    fn requires_an_account() {
        let err = BalanceDeltaArgs::try_parse_from(["balance-delta", "--tx", TX]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn fee_flag_only_overrides_when_set() {
        let config = BalanceConfig { include_fee: Some(false), ..Default::default() };

        let args = BalanceDeltaArgs::parse_from(["balance-delta", "--tx", TX, "--account", ACCOUNT]);
        assert_eq!(args.apply_overrides(config.clone()).include_fee, Some(false));

        let args = BalanceDeltaArgs::parse_from([
            "balance-delta",
            "--tx",
            TX,
            "--account",
            ACCOUNT,
            "--include-fee",
            "--rpc-url",
            "http://localhost:8011",
        ]);
        let config = args.apply_overrides(config);
        assert_eq!(config.include_fee, Some(true));
        assert_eq!(config.rpc_url.as_deref(), Some("http://localhost:8011"));
    }
}
