//! Change notification for the store file.
//!
//! A background thread compares the store file's modification time on an
//! interval and pings every current subscriber when it moves. Writers don't
//! participate; hook processes exit long before anyone could ask them to
//! publish, so observation has to come from the file itself.
//!
//! Every successful write is eventually observed. Rapid bursts inside one
//! poll interval coalesce into a single notification, which is fine for the
//! consumer (a dashboard that re-reads the whole document either way).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Watches one store file and fans change pings out to subscribers.
///
/// Dropping the watcher stops the polling thread.
pub struct StoreWatcher {
    subscribers: Arc<Mutex<Vec<Sender<()>>>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok()?.modified().ok()
}

fn lock_subscribers(
    subscribers: &Mutex<Vec<Sender<()>>>,
) -> std::sync::MutexGuard<'_, Vec<Sender<()>>> {
    match subscribers.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl StoreWatcher {
    pub fn spawn(store_path: PathBuf, interval: Duration) -> Self {
        let subscribers: Arc<Mutex<Vec<Sender<()>>>> = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        // Baseline taken before the thread starts, so a write landing right
        // after spawn() returns still counts as a change.
        let mut last_seen = modified(&store_path);

        let thread_subscribers = Arc::clone(&subscribers);
        let thread_shutdown = Arc::clone(&shutdown);
        let handle = thread::spawn(move || {
            while !thread_shutdown.load(Ordering::Relaxed) {
                thread::sleep(interval);
                let current = modified(&store_path);
                if current != last_seen {
                    last_seen = current;
                    tracing::debug!(path = %store_path.display(), "Store changed");
                    // Closed receivers drop out of the list here.
                    lock_subscribers(&thread_subscribers).retain(|tx| tx.send(()).is_ok());
                }
            }
        });

        StoreWatcher {
            subscribers,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Registers an observer. Each store change delivers one unit message;
    /// drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> Receiver<()> {
        let (tx, rx) = mpsc::channel();
        lock_subscribers(&self.subscribers).push(tx);
        rx
    }
}

impl Drop for StoreWatcher {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
