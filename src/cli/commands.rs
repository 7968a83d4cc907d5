//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::db::PgDatabase;
use crate::http_server::HttpServer;
use crate::observability::init_logging;

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::{CliError, CliResult};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve {
            config,
            port,
            database_url,
        } => serve(&config, port, database_url),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Resolve defaults, file, environment and flags, then validate
pub fn resolve_config(
    config_path: &Path,
    port: Option<u16>,
    database_url: Option<String>,
) -> CliResult<Config> {
    let mut config = Config::load(config_path)?;
    config.apply_env()?;

    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(url) = database_url {
        config.database.url = Some(url);
    }

    config.validate()?;
    Ok(config)
}

/// Start the HTTP server
///
/// 1. Resolve and validate configuration
/// 2. Install the tracing subscriber
/// 3. Build the connection pool (connections open lazily)
/// 4. Serve until Ctrl+C
pub fn serve(config_path: &Path, port: Option<u16>, database_url: Option<String>) -> CliResult<()> {
    let config = resolve_config(config_path, port, database_url)?;

    init_logging(&config.logging).map_err(CliError::boot_failed)?;

    let db = PgDatabase::connect(config.database_url()?, config.database.pool_size)
        .map_err(|e| CliError::config_error(e.to_string()))?;

    info!(
        addr = %config.server.socket_addr(),
        pool_size = config.database.pool_size,
        "starting pgfacade"
    );

    let server = HttpServer::with_config(config.server.clone(), Arc::new(db));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Validate the configuration and print it with the password masked
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = resolve_config(config_path, None, None)?;

    let rendered = serde_json::to_string_pretty(&config.redacted())
        .map_err(|e| CliError::io_error(format!("JSON error: {}", e)))?;
    println!("{rendered}");
    Ok(())
}
