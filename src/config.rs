//! Configuration loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

/// Where and how the sled database is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub path: PathBuf,
    /// Throw the database away when the last handle is dropped
    pub temporary: bool,
    /// Background flush interval; `None` leaves flushing to explicit calls
    pub flush_every_ms: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("medicine-requests.db"),
            temporary: false,
            flush_every_ms: Some(500),
        }
    }
}

impl StorageConfig {
    /// A throwaway database at `path`, for tests and demos
    pub fn temporary(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: true,
            flush_every_ms: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = StorageConfig::default();
        Self {
            storage: StorageConfig {
                path: env::var("MEDICINE_DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.path),
                temporary: env::var("MEDICINE_DB_TEMPORARY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.temporary),
                flush_every_ms: match env::var("MEDICINE_DB_FLUSH_EVERY_MS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                {
                    Some(0) => None,
                    Some(ms) => Some(ms),
                    None => defaults.flush_every_ms,
                },
            },
            log_filter: env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,medicine_requests=debug".to_string()),
        }
    }
}
