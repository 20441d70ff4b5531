//! The concurrent session store.
//!
//! One JSON document on disk, shared by every process on the machine that
//! tracks sessions: short-lived hook invocations write through it, the
//! long-lived daemon reads it and applies dashboard actions.
//!
//! ```text
//! Hook process ──┐
//! Hook process ──┼─▶ with_lock ─▶ sessions.json ◀─ read (lock-free) ── Daemon
//! Pin CLI     ───┘                     ▲
//!                                      └── sessions.json.lock/ (advisory)
//! ```
//!
//! # Module Structure
//!
//! - [`lock`]: cross-process advisory lock with staleness recovery
//! - [`file`]: durable document read/write + the locked mutation protocol
//! - [`watch`]: change notification for pollers
//! - [`types`]: the serialized document and record types

pub mod file;
pub mod lock;
pub mod types;
pub mod watch;

pub use file::SessionStore;
pub use lock::{is_pid_alive, AdvisoryLock, FileLock};
pub use types::{SessionRecord, SessionStatus, StoreDocument, STORE_VERSION};
pub use watch::{StoreWatcher, DEFAULT_POLL_INTERVAL};
