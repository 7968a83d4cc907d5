//! Configuration file handling
//!
//! Settings are resolved in order: built-in defaults, the JSON config file
//! (optional), environment variables, then command-line flags.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio_postgres::config::Host;

use crate::http_server::HttpServerConfig;
use crate::observability::LoggingConfig;

use super::errors::{CliError, CliResult};

/// Environment variable holding the connection string
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Environment variable holding the listen port
pub const PORT_ENV: &str = "PGFACADE_PORT";

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string (required, from file or environment)
    #[serde(default)]
    pub url: Option<String>,

    /// Maximum pooled connections (default: 10)
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_pool_size(),
        }
    }
}

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file. A missing file yields the defaults.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))
    }

    /// Apply environment overrides from the process environment
    pub fn apply_env(&mut self) -> CliResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides from `lookup`
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> CliResult<()> {
        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.database.url = Some(url);
        }

        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port.trim().parse().map_err(|_| {
                CliError::config_error(format!("Invalid {}: '{}'", PORT_ENV, port))
            })?;
        }

        Ok(())
    }

    /// Validate the resolved configuration
    pub fn validate(&self) -> CliResult<()> {
        if self.server.port == 0 {
            return Err(CliError::config_error("server.port must be > 0"));
        }

        if self.database.pool_size == 0 {
            return Err(CliError::config_error("database.pool_size must be > 0"));
        }

        let url = self.database_url()?;
        tokio_postgres::Config::from_str(url)
            .map_err(|e| CliError::config_error(format!("Invalid database.url: {}", e)))?;

        self.logging.env_filter().map_err(CliError::config_error)?;

        Ok(())
    }

    /// The connection string, which must be set by now
    pub fn database_url(&self) -> CliResult<&str> {
        self.database.url.as_deref().ok_or_else(|| {
            CliError::config_error(format!(
                "database.url is required (set it in the config file or {})",
                DATABASE_URL_ENV
            ))
        })
    }

    /// Copy with the connection password masked, for display
    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        copy.database.url = copy.database.url.as_deref().map(redact_password);
        copy
    }
}

/// Connection string with the password shown as `***`. Strings carrying a
/// password are rewritten as a URL from the parsed connection settings;
/// anything else is returned unchanged.
fn redact_password(url: &str) -> String {
    let Ok(config) = tokio_postgres::Config::from_str(url) else {
        return url.to_string();
    };
    if config.get_password().is_none() {
        return url.to_string();
    }

    let ports = config.get_ports();
    let hosts = config
        .get_hosts()
        .iter()
        .enumerate()
        .map(|(i, host)| {
            let name = match host {
                Host::Tcp(name) => name.clone(),
                #[cfg(unix)]
                Host::Unix(path) => path.display().to_string(),
            };
            match ports.get(i).or(ports.first()) {
                Some(port) => format!("{name}:{port}"),
                None => name,
            }
        })
        .collect::<Vec<_>>()
        .join(",");

    let user = config.get_user().unwrap_or_default();
    let dbname = config
        .get_dbname()
        .map(|name| format!("/{name}"))
        .unwrap_or_default();
    format!("postgres://{user}:***@{hosts}{dbname}")
}
