//! Read-side listing for the dashboard.
//!
//! Pure functions over a document snapshot; callers get the snapshot from
//! the lock-free [`SessionStore::read`](crate::store::SessionStore::read).

use crate::store::types::{SessionRecord, SessionStatus, StoreDocument};

/// Listing options: archived sessions are hidden unless `include_archived`,
/// and `search` narrows by free text.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub include_archived: bool,
    pub search: Option<String>,
}

/// Returns the matching records in display order: status rank ascending
/// (active, pinned, archived, unknown), most recent activity first within
/// each rank.
///
/// The search is a case-insensitive substring match over summary, project
/// name, and working directory.
pub fn filter_sessions<'a>(doc: &'a StoreDocument, filter: &SessionFilter) -> Vec<&'a SessionRecord> {
    let needle = filter
        .search
        .as_deref()
        .map(str::to_lowercase)
        .filter(|s| !s.is_empty());

    let mut sessions: Vec<&SessionRecord> = doc
        .sessions
        .values()
        .filter(|record| filter.include_archived || record.status != SessionStatus::Archived)
        .filter(|record| match &needle {
            Some(needle) => {
                record.summary.to_lowercase().contains(needle)
                    || record.project_name.to_lowercase().contains(needle)
                    || record.cwd.to_lowercase().contains(needle)
            }
            None => true,
        })
        .collect();

    sessions.sort_by(|a, b| {
        a.status
            .rank()
            .cmp(&b.status.rank())
            .then_with(|| b.last_activity_at.cmp(&a.last_activity_at))
    });

    sessions
}
