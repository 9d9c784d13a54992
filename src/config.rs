//! Environment-driven configuration

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// Server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub port: u16,
    /// Upper bound on any single record store call
    pub store_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("QA_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".qa-exchange").join("questions.db")
            },
            PathBuf::from,
        );

        let port = lookup("QA_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let store_timeout_ms = lookup("QA_STORE_TIMEOUT_MS")
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_STORE_TIMEOUT_MS);

        Self {
            db_path,
            port,
            store_timeout: Duration::from_millis(store_timeout_ms),
        }
    }
}
