//! CLI argument definitions using clap
//!
//! Commands:
//! - storefront init
//! - storefront schema
//! - storefront validate --collection <name> [--file <record.json>]
//! - storefront create-account --email <e> --password <p> [--file <profile.json>]
//! - storefront sign-in --email <e> --password <p>
//! - storefront create-product [--file <product.json>] [--email <e> --password <p>]
//! - storefront list-products
//!
//! `--config` (default `./storefront.json`) applies to every command.
//! Without `--file`, JSON input is read from stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Storefront data core: schema setup, validation and catalog flows
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./storefront.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply the schema and report whether anything was written
    Init,

    /// Show the declared and persisted schema
    Schema,

    /// Validate a JSON record against a collection's persisted rules
    Validate {
        /// Collection name
        #[arg(long)]
        collection: String,

        /// Record file (stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Create an account and its user profile
    CreateAccount {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Profile file (stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Check credentials
    SignIn {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Create a product, signed in as the given user when credentials are passed
    CreateProduct {
        /// Product file (stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long, requires = "password")]
        email: Option<String>,

        #[arg(long, requires = "email")]
        password: Option<String>,
    },

    /// List all products
    ListProducts,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["storefront", "init"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("./storefront.json"));
        assert!(matches!(cli.command, Command::Init));
    }

    #[test]
    fn test_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "storefront",
            "validate",
            "--collection",
            "users",
            "--config",
            "/tmp/s.json",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/tmp/s.json"));
        match cli.command {
            Command::Validate { collection, file } => {
                assert_eq!(collection, "users");
                assert!(file.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_product_credentials_come_in_pairs() {
        let result = Cli::try_parse_from(["storefront", "create-product", "--email", "a@b.co"]);
        assert!(result.is_err());
    }
}
