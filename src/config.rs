//! Runtime configuration
//!
//! The server reads everything from the environment. The sync client is
//! configured in code, with defaults matching the protocol cadence.

use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8787;

/// Interval between remote polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Quiet period before a local edit is pushed
pub const DEFAULT_PUSH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Which key-value backend the server talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Sqlite { path: PathBuf },
    Rest { url: String, token: String },
}

/// Sync server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` leaves `/sync` answering 501
    pub store: Option<StoreConfig>,
    /// Require all four string fields on every pushed row
    pub strict_rows: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            store: None,
            strict_rows: false,
        }
    }
}

impl ServerConfig {
    /// Read configuration from process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Read configuration from a variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let var = |name: &str| {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let host = var("WATCHLIST_HOST").unwrap_or(DEFAULT_HOST).to_string();

        let port = match var("WATCHLIST_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("Invalid WATCHLIST_PORT '{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        let rest = match (var("KV_REST_API_URL"), var("KV_REST_API_TOKEN")) {
            (Some(url), Some(token)) => Some(StoreConfig::Rest {
                url: url.to_string(),
                token: token.to_string(),
            }),
            _ => None,
        };
        let sqlite = var("WATCHLIST_SQLITE_PATH").map(|path| StoreConfig::Sqlite {
            path: PathBuf::from(path),
        });

        let store = match var("WATCHLIST_STORE").map(str::to_ascii_lowercase).as_deref() {
            Some("memory") => Some(StoreConfig::Memory),
            Some("sqlite") => Some(sqlite.ok_or_else(|| {
                AppError::Config("WATCHLIST_STORE=sqlite requires WATCHLIST_SQLITE_PATH".to_string())
            })?),
            Some("rest") => Some(rest.ok_or_else(|| {
                AppError::Config(
                    "WATCHLIST_STORE=rest requires KV_REST_API_URL and KV_REST_API_TOKEN".to_string(),
                )
            })?),
            Some("none") | Some("off") => None,
            Some(other) => {
                return Err(AppError::Config(format!("Unknown WATCHLIST_STORE '{}'", other)));
            }
            None => rest.or(sqlite),
        };

        let strict_rows = match var("WATCHLIST_STRICT_ROWS").map(str::to_ascii_lowercase).as_deref() {
            None | Some("0") | Some("false") | Some("no") => false,
            Some("1") | Some("true") | Some("yes") => true,
            Some(other) => {
                return Err(AppError::Config(format!("Invalid WATCHLIST_STRICT_ROWS '{}'", other)));
            }
        };

        Ok(Self {
            host,
            port,
            store,
            strict_rows,
        })
    }
}

/// Sync client configuration
#[derive(Debug, Clone)]
pub struct SyncClientConfig {
    /// Server origin, e.g. `http://127.0.0.1:8787`
    pub base_url: String,
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub request_timeout: Duration,
}

impl Default for SyncClientConfig {
    fn default() -> Self {
        Self {
            base_url: format!("http://{}:{}", DEFAULT_HOST, DEFAULT_PORT),
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce: DEFAULT_PUSH_DEBOUNCE,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl SyncClientConfig {
    /// Default timings against `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid sync base URL '{}': {}", base_url, e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        })
    }

    /// Full URL of the sync endpoint
    pub fn sync_endpoint(&self) -> String {
        format!("{}/sync", self.base_url.trim_end_matches('/'))
    }
}
