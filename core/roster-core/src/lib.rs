//! # roster-core
//!
//! Core library for Roster: a machine-local tracker for interactive work
//! sessions. Hook invocations, the pin CLI, and the serving daemon all go
//! through this crate.
//!
//! ## Design Principles
//!
//! - **Synchronous**: no async runtime; writers are short-lived processes
//!   and the daemon uses plain threads.
//! - **One shared resource**: the store file is the only thing processes
//!   share; every mutation serializes through
//!   [`SessionStore::with_lock`](store::SessionStore::with_lock).
//! - **Graceful degradation**: missing or corrupt store files read as
//!   empty, unknown-id mutations are no-ops, stale locks self-heal.
//! - **Explicit configuration**: components take a [`config::StoreConfig`];
//!   nothing reaches for a global path, so tests instantiate stores freely.

pub mod config;
pub mod error;
pub mod hooks;
pub mod lifecycle;
pub mod query;
pub mod store;

pub use config::StoreConfig;
pub use error::{Result, RosterError};
pub use hooks::{project_name_for, HookInput};
pub use lifecycle::{apply_event, delete_session, toggle_pin, LifecycleEvent};
pub use query::{filter_sessions, SessionFilter};
pub use store::{SessionRecord, SessionStatus, SessionStore, StoreDocument, StoreWatcher};
