//! Store configuration.
//!
//! Every component takes an explicit [`StoreConfig`] instead of reaching for
//! a global path, so stores can be instantiated multiple times (tests run
//! against temp directories) without interference. [`StoreConfig::resolve`]
//! builds the conventional per-user instance.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, RosterError};

/// Environment variable overriding the store file location.
pub const STORE_PATH_ENV: &str = "ROSTER_STORE_PATH";

/// How long `acquire()` retries before forcibly taking the lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(5000);

/// Pause between acquisition attempts while the holder is alive.
pub const DEFAULT_LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// Active sessions quieter than this are swept on the next session start.
pub const DEFAULT_STALE_ACTIVE_SECS: i64 = 120;

/// Settings for one store instance: where it lives and its timing knobs.
///
/// The defaults are the tuned constants; override fields for tests or
/// unusual deployments, the semantics do not change with the numbers.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Canonical path of the JSON store file.
    pub store_path: PathBuf,
    pub lock_timeout: Duration,
    pub lock_retry_interval: Duration,
    /// Staleness threshold for the active-session sweep.
    pub stale_active_after: chrono::Duration,
}

impl StoreConfig {
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            store_path: store_path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_retry_interval: DEFAULT_LOCK_RETRY_INTERVAL,
            stale_active_after: chrono::Duration::seconds(DEFAULT_STALE_ACTIVE_SECS),
        }
    }

    /// Builds the conventional per-user configuration: `ROSTER_STORE_PATH`
    /// if set, otherwise `~/.roster/sessions.json`.
    pub fn resolve() -> Result<Self> {
        if let Ok(path) = std::env::var(STORE_PATH_ENV) {
            return Ok(StoreConfig::new(path));
        }
        Ok(StoreConfig::new(default_store_path()?))
    }
}

/// Returns the roster data directory (`~/.roster`).
pub fn data_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".roster"))
        .ok_or(RosterError::HomeDirNotFound)
}

/// Returns the default store file path (`~/.roster/sessions.json`).
pub fn default_store_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("sessions.json"))
}
