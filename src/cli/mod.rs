//! CLI module for the storefront data core
//!
//! Provides command-line access to:
//! - init / schema: apply and inspect the persisted schema
//! - validate: check a record against a collection's rules
//! - create-account / sign-in: identity and user profiles
//! - create-product / list-products: the product catalog

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{run, run_command};
pub use config::{Config, StoreKind};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_input, write_response};
