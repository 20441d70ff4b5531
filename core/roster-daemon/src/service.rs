//! Store access behind the daemon's request handlers.
//!
//! Listing is a lock-free snapshot read; pin and delete are locked
//! mutations; wait_for_change long-polls the store watcher. One instance is
//! shared by every connection thread.

use std::time::Duration;

use chrono::Utc;

use roster_core::store::watch::DEFAULT_POLL_INTERVAL;
use roster_core::{
    delete_session, filter_sessions, toggle_pin, Result, SessionFilter, SessionRecord,
    SessionStore, StoreConfig, StoreWatcher,
};
use roster_daemon_protocol::SessionQuery;

pub struct Service {
    store: SessionStore,
    watcher: StoreWatcher,
}

impl Service {
    pub fn new(config: StoreConfig) -> Self {
        let watcher = StoreWatcher::spawn(config.store_path.clone(), DEFAULT_POLL_INTERVAL);
        Service {
            store: SessionStore::new(config),
            watcher,
        }
    }

    /// Filtered, display-ordered snapshot of the store.
    pub fn sessions_snapshot(&self, query: &SessionQuery) -> Vec<SessionRecord> {
        let doc = self.store.read();
        let filter = SessionFilter {
            include_archived: query.all,
            search: query.search.clone(),
        };
        filter_sessions(&doc, &filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Returns the new pin flag, or `None` for unknown ids.
    pub fn toggle_pin(&self, session_id: &str) -> Result<Option<bool>> {
        self.store
            .with_lock(|doc| toggle_pin(doc, session_id, Utc::now()))
    }

    pub fn delete_session(&self, session_id: &str) -> Result<bool> {
        self.store.with_lock(|doc| delete_session(doc, session_id))
    }

    /// Blocks until the store changes or `timeout` lapses; reports which.
    pub fn wait_for_change(&self, timeout: Duration) -> bool {
        self.watcher.subscribe().recv_timeout(timeout).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::{apply_event, LifecycleEvent};
    use tempfile::tempdir;

    fn seeded_service(temp: &tempfile::TempDir) -> Service {
        let config = StoreConfig::new(temp.path().join("sessions.json"));
        let store = SessionStore::new(config.clone());
        let stale_after = config.stale_active_after;
        store
            .with_lock(|doc| {
                apply_event(
                    doc,
                    "s1",
                    &LifecycleEvent::Start {
                        source: "startup".to_string(),
                        cwd: "/repo".to_string(),
                        project_name: "repo".to_string(),
                        transcript_path: String::new(),
                    },
                    Utc::now(),
                    stale_after,
                );
            })
            .unwrap();
        Service::new(config)
    }

    #[test]
    fn test_snapshot_lists_seeded_session() {
        let temp = tempdir().unwrap();
        let service = seeded_service(&temp);
        let sessions = service.sessions_snapshot(&SessionQuery::default());
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "s1");
    }

    #[test]
    fn test_toggle_pin_reports_unknown_ids() {
        let temp = tempdir().unwrap();
        let service = seeded_service(&temp);
        assert_eq!(service.toggle_pin("s1").unwrap(), Some(true));
        assert_eq!(service.toggle_pin("ghost").unwrap(), None);
    }

    #[test]
    fn test_delete_session_round_trip() {
        let temp = tempdir().unwrap();
        let service = seeded_service(&temp);
        assert!(service.delete_session("s1").unwrap());
        assert!(!service.delete_session("s1").unwrap());
        assert!(service.sessions_snapshot(&SessionQuery::default()).is_empty());
    }

    #[test]
    fn test_wait_for_change_times_out_on_quiet_store() {
        let temp = tempdir().unwrap();
        let service = seeded_service(&temp);
        assert!(!service.wait_for_change(Duration::from_millis(100)));
    }
}
