//! CLI module for pgfacade
//!
//! Provides command-line interface for:
//! - serve: Start the HTTP server
//! - check-config: Validate and print the resolved configuration

mod args;
mod commands;
mod config;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check_config, resolve_config, run, run_command, serve};
pub use config::{Config, DatabaseConfig, DATABASE_URL_ENV, PORT_ENV};
pub use errors::{CliError, CliErrorCode, CliResult};
