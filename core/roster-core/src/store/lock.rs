//! Advisory cross-process locking for the store file.
//!
//! Writers are independent OS processes with no shared memory, so mutual
//! exclusion rides on the filesystem: lock ownership is the existence of a
//! directory next to the store (`sessions.json.lock/`), taken with an atomic
//! `create_dir`. The holder records its pid in a `pid` file inside the
//! directory immediately after creation so contenders can diagnose
//! staleness.
//!
//! # Lock Directory Structure
//!
//! ```text
//! <storepath>.lock/
//! └── pid          # Plain text: the holder's process ID
//! ```
//!
//! # Recovery rules
//!
//! - Recorded pid missing, unparsable, or not running → the lock is stale
//!   and is removed on the spot, no waiting.
//! - Holder alive past the acquisition timeout → the lock is evicted anyway.
//!   Availability wins over strict exclusion; a crashed or wedged holder
//!   must never block the machine forever.
//!
//! The liveness probe is injectable so a non-filesystem backend (or a test
//! simulating a wedged-but-alive holder) can supply its own check without
//! touching the mutation protocol.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs_err as fs;

use crate::config::{DEFAULT_LOCK_RETRY_INTERVAL, DEFAULT_LOCK_TIMEOUT};
use crate::error::{Result, RosterError};

/// Mutual exclusion over one named resource, across processes.
///
/// The locked mutation protocol only depends on this trait; swapping the
/// filesystem lock for a database advisory lock means implementing these
/// two methods.
pub trait AdvisoryLock {
    /// Blocks until the lock is held. Bounded: implementations resolve
    /// contention within their configured timeout rather than waiting
    /// forever.
    fn acquire(&self) -> Result<()>;

    /// Relinquishes the lock. Idempotent, best-effort.
    fn release(&self);
}

pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // SAFETY: kill with signal 0 performs only the existence check.
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Directory-based advisory lock for a store file.
pub struct FileLock {
    lock_dir: PathBuf,
    timeout: Duration,
    retry_interval: Duration,
    probe: fn(u32) -> bool,
}

impl FileLock {
    /// Creates the lock for a store path; the lock directory is the store
    /// path with a `.lock` suffix appended.
    pub fn new(store_path: &Path) -> Self {
        let mut lock_dir = store_path.as_os_str().to_owned();
        lock_dir.push(".lock");
        FileLock {
            lock_dir: PathBuf::from(lock_dir),
            timeout: DEFAULT_LOCK_TIMEOUT,
            retry_interval: DEFAULT_LOCK_RETRY_INTERVAL,
            probe: is_pid_alive,
        }
    }

    pub fn with_timing(mut self, timeout: Duration, retry_interval: Duration) -> Self {
        self.timeout = timeout;
        self.retry_interval = retry_interval;
        self
    }

    /// Replaces the holder-liveness check. Tests use this to simulate a
    /// holder that is alive but never releases.
    pub fn with_liveness_probe(mut self, probe: fn(u32) -> bool) -> Self {
        self.probe = probe;
        self
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    fn pid_path(&self) -> PathBuf {
        self.lock_dir.join("pid")
    }

    fn try_create(&self) -> io::Result<()> {
        fs::create_dir(&self.lock_dir)?;
        fs::write(self.pid_path(), std::process::id().to_string())?;
        Ok(())
    }

    /// A lock whose pid file is unreadable or names a dead process is stale.
    fn holder_is_stale(&self) -> bool {
        let raw = match fs::read_to_string(self.pid_path()) {
            Ok(raw) => raw,
            Err(_) => return true,
        };
        match raw.trim().parse::<u32>() {
            Ok(pid) => !(self.probe)(pid),
            Err(_) => true,
        }
    }

    fn force_release(&self) {
        let _ = fs::remove_dir_all(&self.lock_dir);
    }
}

impl AdvisoryLock for FileLock {
    fn acquire(&self) -> Result<()> {
        // Cold start: the data directory may not exist yet.
        if let Some(parent) = self.lock_dir.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| RosterError::io("create lock parent directory", err))?;
        }

        let deadline = Instant::now() + self.timeout;
        while Instant::now() < deadline {
            match self.try_create() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if self.holder_is_stale() {
                        tracing::warn!(
                            lock_dir = %self.lock_dir.display(),
                            "Removing stale lock"
                        );
                        self.force_release();
                        continue;
                    }
                    std::thread::sleep(self.retry_interval);
                }
                Err(err) => return Err(RosterError::io("create lock directory", err)),
            }
        }

        // Timeout: evict the holder regardless of liveness.
        tracing::warn!(
            lock_dir = %self.lock_dir.display(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Lock acquisition timed out, forcing takeover"
        );
        self.force_release();
        self.try_create()
            .map_err(|err| RosterError::io("create lock directory after takeover", err))
    }

    fn release(&self) {
        let _ = fs::remove_file(self.pid_path());
        let _ = fs::remove_dir(&self.lock_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    fn lock_for(dir: &Path) -> FileLock {
        FileLock::new(&dir.join("sessions.json"))
    }

    fn plant_lock(lock: &FileLock, pid_contents: Option<&str>) {
        std::fs::create_dir_all(lock.lock_dir()).unwrap();
        if let Some(contents) = pid_contents {
            std::fs::write(lock.lock_dir().join("pid"), contents).unwrap();
        }
    }

    #[test]
    fn test_acquire_creates_lock_with_own_pid() {
        let temp = tempdir().unwrap();
        let lock = lock_for(temp.path());
        lock.acquire().unwrap();
        let pid = std::fs::read_to_string(lock.lock_dir().join("pid")).unwrap();
        assert_eq!(pid, std::process::id().to_string());
        lock.release();
        assert!(!lock.lock_dir().exists());
    }

    #[test]
    fn test_release_is_idempotent() {
        let temp = tempdir().unwrap();
        let lock = lock_for(temp.path());
        lock.acquire().unwrap();
        lock.release();
        lock.release();
        assert!(!lock.lock_dir().exists());
    }

    #[test]
    fn test_acquire_creates_missing_parent_directory() {
        let temp = tempdir().unwrap();
        let lock = FileLock::new(&temp.path().join("nested/data/sessions.json"));
        lock.acquire().unwrap();
        assert!(lock.lock_dir().exists());
        lock.release();
    }

    #[test]
    fn test_dead_pid_lock_is_recovered_immediately() {
        let temp = tempdir().unwrap();
        let lock = lock_for(temp.path());
        // A pid far above any plausible live process.
        plant_lock(&lock, Some("999999999"));

        let started = Instant::now();
        lock.acquire().unwrap();
        // Stale removal happens on the first retry, not after the timeout.
        assert!(started.elapsed() < Duration::from_secs(1));
        lock.release();
    }

    #[test]
    fn test_unparsable_pid_is_stale() {
        let temp = tempdir().unwrap();
        let lock = lock_for(temp.path());
        plant_lock(&lock, Some("not-a-pid"));

        let started = Instant::now();
        lock.acquire().unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        lock.release();
    }

    #[test]
    fn test_missing_pid_file_is_stale() {
        let temp = tempdir().unwrap();
        let lock = lock_for(temp.path());
        plant_lock(&lock, None);

        lock.acquire().unwrap();
        lock.release();
    }

    #[test]
    fn test_live_holder_forces_takeover_after_timeout() {
        let temp = tempdir().unwrap();
        let lock = lock_for(temp.path())
            .with_timing(Duration::from_millis(150), Duration::from_millis(10))
            .with_liveness_probe(|_| true);
        plant_lock(&lock, Some("12345"));

        let started = Instant::now();
        lock.acquire().unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(150), "took over too early");
        assert!(elapsed < Duration::from_secs(2), "takeover overshot");
        let pid = std::fs::read_to_string(lock.lock_dir().join("pid")).unwrap();
        assert_eq!(pid, std::process::id().to_string());
        lock.release();
    }

    #[test]
    fn test_waiter_acquires_after_holder_releases() {
        let temp = tempdir().unwrap();
        let store_path = temp.path().join("sessions.json");

        let holder = FileLock::new(&store_path);
        holder.acquire().unwrap();

        let waiter_path = store_path.clone();
        let waiter = thread::spawn(move || {
            let lock = FileLock::new(&waiter_path).with_liveness_probe(|_| true);
            let started = Instant::now();
            lock.acquire().unwrap();
            lock.release();
            started.elapsed()
        });

        thread::sleep(Duration::from_millis(60));
        holder.release();

        let waited = waiter.join().unwrap();
        assert!(waited >= Duration::from_millis(40), "waiter did not block");
    }
}
