//! Application configuration.
//!
//! Reads `config/default.toml` (sections `[server]`, `[database]`,
//! `[remote]`, `[auth]`). Every key has a default, a missing file means all
//! defaults, and secrets never come from here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use promptflow_agent::RemoteOverrides;
use promptflow_web::WebConfig;
use tracing::debug;

/// Default SQLite database location.
pub const DEFAULT_DATABASE_PATH: &str = "data/promptflow.db";

/// Default bearer-token lifetime in hours (seven days).
pub const DEFAULT_TOKEN_LIFETIME_HOURS: u64 = 7 * 24;

/// Settings from the `[database]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// Keep everything in memory; nothing survives a restart.
    pub in_memory: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
            in_memory: false,
        }
    }
}

/// Settings from the `[auth]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    pub token_lifetime_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_lifetime_hours: DEFAULT_TOKEN_LIFETIME_HOURS,
        }
    }
}

impl AuthConfig {
    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_hours.saturating_mul(3600))
    }
}

/// Everything the binary reads from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: WebConfig,
    pub database: DatabaseConfig,
    pub remote: RemoteOverrides,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults; an unreadable
    /// or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parse TOML text, falling back to defaults key by key.
    pub fn parse(content: &str) -> Result<Self> {
        let table: toml::Table = content.parse().context("malformed TOML")?;
        let defaults = Self::default();

        let server = match section(&table, "server") {
            Some(server) => WebConfig {
                bind_addr: server
                    .get("bind")
                    .and_then(|v| v.as_str())
                    .map(str::to_owned)
                    .unwrap_or(defaults.server.bind_addr),
                port: server
                    .get("port")
                    .and_then(|v| v.as_integer())
                    .and_then(|v| u16::try_from(v).ok())
                    .unwrap_or(defaults.server.port),
            },
            None => defaults.server,
        };

        let database = match section(&table, "database") {
            Some(database) => DatabaseConfig {
                path: database
                    .get("path")
                    .and_then(|v| v.as_str())
                    .map(PathBuf::from)
                    .unwrap_or(defaults.database.path),
                in_memory: database
                    .get("in_memory")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(defaults.database.in_memory),
            },
            None => defaults.database,
        };

        let remote = match table.get("remote") {
            Some(value) => value
                .clone()
                .try_into::<RemoteOverrides>()
                .context("invalid [remote] section")?,
            None => defaults.remote,
        };

        let auth = match section(&table, "auth") {
            Some(auth) => AuthConfig {
                token_lifetime_hours: auth
                    .get("token_lifetime_hours")
                    .and_then(|v| v.as_integer())
                    .and_then(|v| u64::try_from(v).ok())
                    .filter(|&hours| hours > 0)
                    .unwrap_or(defaults.auth.token_lifetime_hours),
            },
            None => defaults.auth,
        };

        Ok(Self {
            server,
            database,
            remote,
            auth,
        })
    }
}

fn section<'a>(table: &'a toml::Table, name: &str) -> Option<&'a toml::Table> {
    match table.get(name) {
        Some(toml::Value::Table(t)) => Some(t),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
