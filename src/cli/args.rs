//! CLI argument definitions using clap
//!
//! Commands:
//! - pgfacade serve --config <path> [--port N] [--database-url URL]
//! - pgfacade check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pgfacade - HTTP facade over a PostgreSQL database
#[derive(Parser, Debug)]
#[command(name = "pgfacade")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./pgfacade.json")]
        config: PathBuf,

        /// Port to listen on (overrides config and PGFACADE_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// PostgreSQL connection string (overrides config and DATABASE_URL)
        #[arg(long)]
        database_url: Option<String>,
    },

    /// Validate the configuration and print the resolved settings
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./pgfacade.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
