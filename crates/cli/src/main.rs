//! `zkhelpers`: inspect the missing libraries registry of a zksolc project and the balance
//! changes caused by zkSync transactions.

#[macro_use]
extern crate tracing;

use clap::Parser;
use eyre::Result;

/// Overwrites `$dst` with `$src` when the latter is set.
macro_rules! set_if_some {
    ($src:expr, $dst:expr) => {
        if let Some(src) = $src {
            $dst = src.into();
        }
    };
}

mod cmd;
mod opts;
mod utils;

use opts::{Zkhelpers, ZkhelpersSubcommand};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Zkhelpers::parse();
    utils::subscriber(args.verbosity);

    let config = args.load_config()?;
    match args.cmd {
        ZkhelpersSubcommand::Libraries(cmd) => cmd.run(config.libraries),
        ZkhelpersSubcommand::BalanceDelta(cmd) => cmd.run(config.balance).await,
    }
}
