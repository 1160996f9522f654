use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use eyre::{Result, WrapErr};
use foundry_zksync_config::ZkHelpersConfig;

use crate::cmd::{balance::BalanceDeltaArgs, libraries::LibrariesArgs};

/// Helpers for zksolc library linking and zkSync balance checks.
#[derive(Debug, Parser)]
#[command(name = "zkhelpers", version)]
pub struct Zkhelpers {
    /// Project root, holding `zkhelpers.toml` and the libraries cache.
    #[arg(long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Verbosity level of the logs.
    ///
    /// Pass multiple times to increase it (e.g. -v, -vv, -vvv). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub cmd: ZkhelpersSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ZkhelpersSubcommand {
    /// Manage the libraries zksolc could not link.
    #[command(visible_alias = "libs")]
    Libraries(LibrariesArgs),

    /// Compute the balance changes caused by a mined transaction.
    #[command(visible_alias = "bd")]
    BalanceDelta(BalanceDeltaArgs),
}

impl Zkhelpers {
    /// Loads the configuration of the selected project, without the command line overrides.
    pub fn load_config(&self) -> Result<ZkHelpersConfig> {
        let root = self.root.as_deref().unwrap_or(Path::new("."));
        ZkHelpersConfig::load(root)
            .wrap_err_with(|| format!("failed to load configuration from {}", root.display()))
    }
}
