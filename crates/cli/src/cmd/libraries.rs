use std::{path::PathBuf, slice};

use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use foundry_zksync_config::LibrariesConfig;
use foundry_zksync_libraries::{
    DeployableLibrary, LibraryId, LibraryRegistryError, ZkLibraryRegistry, ZkMissingLibrary,
    resolve_libraries,
};
use yansi::Paint;

/// CLI arguments for `zkhelpers libraries`.
#[derive(Clone, Debug, Parser)]
pub struct LibrariesArgs {
    #[command(flatten)]
    pub registry: RegistryOpts,

    #[command(subcommand)]
    pub command: LibrariesSubcommand,
}

#[derive(Clone, Debug, Default, Parser)]
#[command(next_help_heading = "Registry options")]
pub struct RegistryOpts {
    /// Registry file, relative to the project root.
    ///
    /// Defaults to `.zksolc-libraries-cache/missing_library_dependencies.json`.
    #[arg(long, global = true, value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// Number of lock retries before giving up.
    #[arg(long, global = true, value_name = "RETRIES")]
    pub lock_retries: Option<u32>,

    /// Total time to wait for the registry lock, in milliseconds.
    #[arg(long, global = true, value_name = "MILLIS")]
    pub lock_timeout: Option<u64>,
}

impl RegistryOpts {
    /// Merges the command line arguments into `config`.
    pub fn apply_overrides(&self, mut config: LibrariesConfig) -> LibrariesConfig {
        set_if_some!(self.registry.clone(), config.registry);
        set_if_some!(self.lock_retries, config.lock_retries);
        set_if_some!(self.lock_timeout, config.lock_max_timeout_ms);
        config
    }
}

#[derive(Clone, Debug, Subcommand)]
pub enum LibrariesSubcommand {
    /// Record a contract whose bytecode references undeployed libraries.
    Append {
        /// Name of the contract.
        #[arg(long, value_name = "NAME")]
        contract_name: String,

        /// Source file of the contract.
        #[arg(long, value_name = "PATH")]
        contract_path: String,

        /// Missing library, as `path:Name`. Can be passed multiple times.
        #[arg(long = "missing", value_name = "PATH:NAME", num_args = 1..)]
        missing: Vec<LibraryId>,
    },

    /// Print the recorded contracts.
    #[command(visible_alias = "ls")]
    List {
        /// Print the raw registry as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the order in which the recorded libraries have to be deployed.
    Resolve {
        /// Library already deployed, as `path:Name` or `Name`. Can be passed multiple times.
        #[arg(long, value_name = "[PATH:]NAME")]
        deployed: Vec<DeployableLibrary>,

        /// Print the deployment order as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete the registry.
    #[command(visible_alias = "clean")]
    Cleanup,
}

impl LibrariesArgs {
    pub fn run(self, config: LibrariesConfig) -> Result<()> {
        let registry = self.registry.apply_overrides(config).registry();
        debug!(path = ?registry.path(), "using libraries registry");

        match self.command {
            LibrariesSubcommand::Append { contract_name, contract_path, missing } => {
                let record = ZkMissingLibrary::new(
                    contract_path,
                    contract_name,
                    missing.iter().map(ToString::to_string),
                );
                registry
                    .append(slice::from_ref(&record))
                    .wrap_err_with(|| format!("failed to record {}", record.id()))?;
                println!("Recorded {} in {}", record.id().bold(), registry.path().display());
            }
            LibrariesSubcommand::List { json } => {
                let records = read_records(&registry)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&records)?);
                } else if records.is_empty() {
                    println!("No missing libraries recorded");
                } else {
                    for record in &records {
                        println!("{}", record.id().bold());
                        for missing in &record.missing_libraries {
                            println!("  {missing}");
                        }
                    }
                }
            }
            LibrariesSubcommand::Resolve { deployed, json } => {
                let order = resolve_libraries(read_records(&registry)?, &deployed)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&order)?);
                } else {
                    for (i, lib) in order.iter().enumerate() {
                        println!("{:>3}. {lib}", i + 1);
                    }
                }
            }
            LibrariesSubcommand::Cleanup => {
                registry.cleanup()?;
                println!("Removed {}", registry.path().display());
            }
        }
        Ok(())
    }
}

/// Reads the registry, a registry that was never created has no records.
fn read_records(registry: &ZkLibraryRegistry) -> Result<Vec<ZkMissingLibrary>> {
    match registry.read() {
        Ok(records) => Ok(records),
        Err(LibraryRegistryError::NotFound { .. }) => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}
