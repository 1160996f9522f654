//! Subcommands.

pub mod balance;
pub mod libraries;
