//! `roster.toml` loading
//!
//! ```toml
//! database_url = "postgres://localhost/roster"
//! max_connections = 5
//!
//! [server]
//! bind = "0.0.0.0:8000"
//! cors_permissive = false
//! max_upload_bytes = 10485760
//! ```
//!
//! Every key is optional. Command-line flags and environment variables
//! (resolved by clap) take precedence over the file.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use roster_server::db::pool::DEFAULT_MAX_CONNECTIONS;
use roster_server::ServerConfig;

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "roster.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database_url: Option<String>,
    /// Pool size (default: 5)
    pub max_connections: Option<u32>,
    pub server: ServerSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: Option<SocketAddr>,
    pub cors_permissive: Option<bool>,
    pub max_upload_bytes: Option<usize>,
}

/// Server settings given on the command line (or via env through clap)
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerOverrides {
    pub bind: Option<SocketAddr>,
    pub cors_permissive: bool,
    pub max_upload_bytes: Option<usize>,
}

impl FileConfig {
    /// Load an explicit config file, or `roster.toml` if present.
    ///
    /// An explicit path that doesn't exist is an error; a missing default
    /// file just means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("config file {} does not exist", path.display());
                }
                Self::from_file(path)
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str::<Self>(&data)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Flag/env value first, then the file.
    pub fn database_url(&self, cli: Option<String>) -> Result<String> {
        cli.or_else(|| self.database_url.clone()).context(
            "DATABASE_URL not set. Set via --database-url, DATABASE_URL env, .env or roster.toml",
        )
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    pub fn server_config(&self, overrides: ServerOverrides) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            bind_addr: overrides
                .bind
                .or(self.server.bind)
                .unwrap_or(defaults.bind_addr),
            cors_permissive: overrides.cors_permissive
                || self.server.cors_permissive.unwrap_or(defaults.cors_permissive),
            max_upload_bytes: overrides
                .max_upload_bytes
                .or(self.server.max_upload_bytes)
                .unwrap_or(defaults.max_upload_bytes),
        }
    }
}
