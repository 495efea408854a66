//! Environment-driven configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

use crate::sync::DEFAULT_DEBOUNCE;

/// Which collection store backs the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// JSON files under the data directory (the durable default).
    Local,
    /// In-process listener store; nothing survives a restart.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
    pub debounce: Duration,
    pub port: u16,
}

impl Config {
    /// Read configuration from `TODO_TRACKER_*` environment variables,
    /// falling back to defaults. Unrecognized values warn and fall
    /// back rather than abort.
    pub fn from_env() -> Result<Self> {
        let data_dir = match std::env::var("TODO_TRACKER_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => Self::default_data_dir()?,
        };

        let backend = match std::env::var("TODO_TRACKER_BACKEND").as_deref() {
            Ok("memory") => StorageBackend::Memory,
            Ok("local") | Err(_) => StorageBackend::Local,
            Ok(other) => {
                warn!("Unknown TODO_TRACKER_BACKEND '{}', using local", other);
                StorageBackend::Local
            }
        };

        let debounce = match std::env::var("TODO_TRACKER_DEBOUNCE_MS") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    warn!("Invalid TODO_TRACKER_DEBOUNCE_MS '{}', using default", raw);
                    DEFAULT_DEBOUNCE
                }
            },
            Err(_) => DEFAULT_DEBOUNCE,
        };

        let port = match std::env::var("TODO_TRACKER_PORT") {
            Ok(raw) => match raw.parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    warn!("Invalid TODO_TRACKER_PORT '{}', using 3000", raw);
                    3000
                }
            },
            Err(_) => 3000,
        };

        Ok(Self {
            data_dir,
            backend,
            debounce,
            port,
        })
    }

    fn default_data_dir() -> Result<PathBuf> {
        let home_dir = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;

        Ok(PathBuf::from(home_dir).join(".todo-tracker"))
    }
}
