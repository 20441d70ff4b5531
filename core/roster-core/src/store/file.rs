//! File-backed session store and the locked mutation protocol.
//!
//! One JSON document on disk holds every session record. Two access paths:
//!
//! - [`SessionStore::read`] is lock-free. Atomic replace-on-write means a
//!   reader sees either the old document or the new one, never a mix, so
//!   pollers can read on an interval without coordination.
//! - [`SessionStore::with_lock`] is the only sanctioned write path. It
//!   serializes every mutation machine-wide through the advisory lock:
//!   acquire, read, mutate, write, release. Direct writes would defeat
//!   cross-process exclusion.
//!
//! # Defensive Design
//!
//! Hook processes and the daemon race freely against this file, so loads
//! handle:
//! - missing file (empty store)
//! - empty or corrupt JSON (empty store, warning)
//! - version mismatches (empty store, warning)
//!
//! A corrupt store self-heals on the next successful write.

use std::path::{Path, PathBuf};

use fs_err as fs;

use crate::config::StoreConfig;
use crate::error::{Result, RosterError};

use super::lock::{AdvisoryLock, FileLock};
use super::types::{StoreDocument, STORE_VERSION};

pub struct SessionStore {
    config: StoreConfig,
}

/// Releases the lock when dropped, so the error and panic paths of
/// `with_lock` cannot leave the lock held.
struct ReleaseOnDrop<'a, L: AdvisoryLock + ?Sized>(&'a L);

impl<L: AdvisoryLock + ?Sized> Drop for ReleaseOnDrop<'_, L> {
    fn drop(&mut self) {
        self.0.release();
    }
}

impl SessionStore {
    pub fn new(config: StoreConfig) -> Self {
        SessionStore { config }
    }

    /// Store against the conventional per-user path (see [`StoreConfig::resolve`]).
    pub fn resolve() -> Result<Self> {
        Ok(SessionStore::new(StoreConfig::resolve()?))
    }

    pub fn path(&self) -> &Path {
        &self.config.store_path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the current document, or the canonical empty document if the
    /// file is absent, unreadable, or not valid.
    pub fn read(&self) -> StoreDocument {
        let content = match fs::read_to_string(self.path()) {
            Ok(content) => content,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(error = %err, "Unreadable store file, treating as empty");
                }
                return StoreDocument::default();
            }
        };

        if content.trim().is_empty() {
            tracing::warn!("Empty store file, treating as empty");
            return StoreDocument::default();
        }

        match serde_json::from_str::<StoreDocument>(&content) {
            Ok(doc) if doc.version == STORE_VERSION => doc,
            Ok(doc) => {
                tracing::warn!(
                    version = doc.version,
                    expected = STORE_VERSION,
                    "Unsupported store version, treating as empty"
                );
                StoreDocument::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "Corrupt store file, treating as empty");
                StoreDocument::default()
            }
        }
    }

    /// Persists the full document atomically: serialize to a temp path
    /// suffixed with our own pid (so concurrent writers never collide on
    /// the temp file), then rename over the canonical path.
    pub fn write(&self, doc: &StoreDocument) -> Result<()> {
        if let Some(parent) = self.path().parent() {
            fs::create_dir_all(parent)
                .map_err(|err| RosterError::io("create store directory", err))?;
        }

        let content = serde_json::to_string_pretty(doc)
            .map_err(|err| RosterError::json("serialize store document", err))?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content)
            .map_err(|err| RosterError::io("write temp store file", err))?;
        fs::rename(&tmp_path, self.path())
            .map_err(|err| RosterError::io("replace store file", err))?;
        Ok(())
    }

    /// Runs `mutate` against the document under the store's file lock.
    ///
    /// Acquires the lock, reads the current document, applies `mutate`,
    /// writes the document back, and releases. The lock is released
    /// unconditionally (a drop guard covers the write-error and panic
    /// paths). Returns the mutator's value; write failures propagate after
    /// release.
    pub fn with_lock<T>(&self, mutate: impl FnOnce(&mut StoreDocument) -> T) -> Result<T> {
        let lock = FileLock::new(self.path()).with_timing(
            self.config.lock_timeout,
            self.config.lock_retry_interval,
        );
        self.with_lock_using(&lock, mutate)
    }

    /// `with_lock` against a caller-supplied lock implementation.
    pub fn with_lock_using<T>(
        &self,
        lock: &dyn AdvisoryLock,
        mutate: impl FnOnce(&mut StoreDocument) -> T,
    ) -> Result<T> {
        lock.acquire()?;
        let _guard = ReleaseOnDrop(lock);

        let mut doc = self.read();
        let result = mutate(&mut doc);
        self.write(&doc)?;
        Ok(result)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path().as_os_str().to_owned();
        tmp.push(format!(".tmp.{}", std::process::id()));
        PathBuf::from(tmp)
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::{SessionRecord, SessionStatus};
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn store_at(dir: &Path) -> SessionStore {
        SessionStore::new(StoreConfig::new(dir.join("sessions.json")))
    }

    fn make_record(session_id: &str) -> SessionRecord {
        let now = Utc::now();
        SessionRecord {
            session_id: session_id.to_string(),
            cwd: "/repo".to_string(),
            project_name: "repo".to_string(),
            status: SessionStatus::Active,
            summary: String::new(),
            started_at: now,
            last_activity_at: now,
            ended_at: None,
            source: "startup".to_string(),
            prompt_count: 0,
            stop_count: 0,
            transcript_path: String::new(),
            pinned: false,
        }
    }

    #[test]
    fn test_read_missing_file_returns_empty_document() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());
        let doc = store.read();
        assert_eq!(doc.version, STORE_VERSION);
        assert!(doc.sessions.is_empty());
    }

    #[test]
    fn test_read_corrupt_file_returns_empty_document() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.read().sessions.is_empty());
    }

    #[test]
    fn test_read_unsupported_version_returns_empty_document() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());
        std::fs::write(store.path(), r#"{"version":9,"sessions":{}}"#).unwrap();
        assert!(store.read().sessions.is_empty());
    }

    #[test]
    fn test_write_read_round_trip() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());

        let mut doc = StoreDocument::default();
        doc.sessions
            .insert("s1".to_string(), make_record("s1"));
        store.write(&doc).unwrap();

        let loaded = store.read();
        assert_eq!(loaded.sessions["s1"].cwd, "/repo");
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let temp = tempdir().unwrap();
        let store = SessionStore::new(StoreConfig::new(
            temp.path().join("nested/data/sessions.json"),
        ));
        store.write(&StoreDocument::default()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_write_leaves_no_temp_file_behind() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());
        store.write(&StoreDocument::default()).unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["sessions.json".to_string()]);
    }

    #[test]
    fn test_with_lock_returns_mutator_result_and_persists() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());

        let count = store
            .with_lock(|doc| {
                doc.sessions.insert("s1".to_string(), make_record("s1"));
                doc.sessions.len()
            })
            .unwrap();

        assert_eq!(count, 1);
        assert!(store.read().sessions.contains_key("s1"));
    }

    #[test]
    fn test_with_lock_releases_lock_afterwards() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());
        store.with_lock(|_| ()).unwrap();

        let mut lock_dir = store.path().as_os_str().to_owned();
        lock_dir.push(".lock");
        assert!(!PathBuf::from(lock_dir).exists());
    }

    #[test]
    fn test_with_lock_releases_lock_when_mutator_panics() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = store.with_lock(|doc| {
                doc.sessions.clear();
                panic!("mutator blew up");
            });
        }));
        assert!(result.is_err());

        // A fresh mutation must not have to wait out a leaked lock.
        let started = std::time::Instant::now();
        store.with_lock(|_| ()).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_with_lock_using_accepts_a_custom_lock() {
        struct CountingLock {
            acquired: std::sync::atomic::AtomicU32,
            released: std::sync::atomic::AtomicU32,
        }

        impl AdvisoryLock for CountingLock {
            fn acquire(&self) -> crate::error::Result<()> {
                self.acquired
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            }

            fn release(&self) {
                self.released
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let temp = tempdir().unwrap();
        let store = store_at(temp.path());
        let lock = CountingLock {
            acquired: std::sync::atomic::AtomicU32::new(0),
            released: std::sync::atomic::AtomicU32::new(0),
        };

        store
            .with_lock_using(&lock, |doc| {
                doc.sessions.insert("s1".to_string(), make_record("s1"));
            })
            .unwrap();

        assert_eq!(lock.acquired.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(lock.released.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(store.read().sessions.contains_key("s1"));
    }

    #[test]
    fn test_concurrent_with_lock_loses_no_updates() {
        const WRITERS: u32 = 4;
        const INCREMENTS: u32 = 10;

        let temp = tempdir().unwrap();
        let path = Arc::new(temp.path().join("sessions.json"));

        {
            let store = SessionStore::new(StoreConfig::new(path.as_ref().clone()));
            store
                .with_lock(|doc| {
                    doc.sessions
                        .insert("counter".to_string(), make_record("counter"));
                })
                .unwrap();
        }

        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    let store = SessionStore::new(StoreConfig::new(path.as_ref().clone()));
                    for _ in 0..INCREMENTS {
                        store
                            .with_lock(|doc| {
                                let record = doc.sessions.get_mut("counter").unwrap();
                                record.prompt_count += 1;
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let store = SessionStore::new(StoreConfig::new(path.as_ref().clone()));
        assert_eq!(
            store.read().sessions["counter"].prompt_count,
            WRITERS * INCREMENTS
        );
    }

    #[test]
    fn test_concurrent_writers_never_expose_a_torn_file() {
        const ROUNDS: usize = 30;

        let temp = tempdir().unwrap();
        let path = Arc::new(temp.path().join("sessions.json"));

        let writers: Vec<_> = (0..3)
            .map(|writer| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    let store = SessionStore::new(StoreConfig::new(path.as_ref().clone()));
                    for round in 0..ROUNDS {
                        let mut doc = StoreDocument::default();
                        for n in 0..20 {
                            let id = format!("w{}-r{}-s{}", writer, round, n);
                            doc.sessions.insert(id.clone(), make_record(&id));
                        }
                        store.write(&doc).unwrap();
                    }
                })
            })
            .collect();

        let reader_path = Arc::clone(&path);
        let reader = thread::spawn(move || {
            for _ in 0..200 {
                if let Ok(content) = std::fs::read_to_string(reader_path.as_ref()) {
                    let parsed: std::result::Result<StoreDocument, _> =
                        serde_json::from_str(&content);
                    assert!(parsed.is_ok(), "reader observed a torn store file");
                }
                thread::yield_now();
            }
        });

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();
    }
}
