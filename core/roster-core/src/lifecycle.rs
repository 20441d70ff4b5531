//! Session lifecycle state machine.
//!
//! Pure transitions over the store document; callers run these inside
//! [`SessionStore::with_lock`](crate::store::SessionStore::with_lock).
//! Events referencing ids the store has never seen are silent no-ops
//! (except `Start`, which creates the record), which makes duplicate and
//! out-of-order hook delivery harmless.
//!
//! ```text
//! Start            → active   (creates the record on first sight;
//!                              sweeps other stale actives first)
//! PromptSubmitted  → counters + opportunistic summary
//! Stopped          → counters
//! End              → pinned if pinned, archived otherwise; ended_at set
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::store::types::{SessionRecord, SessionStatus, StoreDocument};

/// Prompts this short never replace the summary (greetings, "continue", …).
const SUMMARY_MIN_PROMPT_CHARS: usize = 15;
/// Summaries keep at most this many characters of the prompt.
const SUMMARY_MAX_CHARS: usize = 200;

/// A lifecycle event carried inside one locked mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    Start {
        source: String,
        cwd: String,
        project_name: String,
        transcript_path: String,
    },
    PromptSubmitted {
        prompt: String,
    },
    Stopped,
    End,
}

/// Applies one event for `session_id` to the document at time `now`.
///
/// `stale_after` is the activity threshold for the sweep that piggybacks on
/// `Start` (see [`StoreConfig`](crate::config::StoreConfig)).
pub fn apply_event(
    doc: &mut StoreDocument,
    session_id: &str,
    event: &LifecycleEvent,
    now: DateTime<Utc>,
    stale_after: Duration,
) {
    match event {
        LifecycleEvent::Start {
            source,
            cwd,
            project_name,
            transcript_path,
        } => {
            sweep_stale_active(doc, session_id, now, stale_after);

            match doc.sessions.get_mut(session_id) {
                Some(existing) if existing.pinned => {
                    // Resuming a pinned session: back to live, provenance
                    // refreshed.
                    existing.status = SessionStatus::Active;
                    existing.last_activity_at = now;
                    existing.ended_at = None;
                    existing.source = source.clone();
                }
                Some(existing) => {
                    // Restart of a non-pinned session.
                    existing.status = SessionStatus::Active;
                    existing.last_activity_at = now;
                    existing.ended_at = None;
                }
                None => {
                    doc.sessions.insert(
                        session_id.to_string(),
                        SessionRecord {
                            session_id: session_id.to_string(),
                            cwd: cwd.clone(),
                            project_name: project_name.clone(),
                            status: SessionStatus::Active,
                            summary: String::new(),
                            started_at: now,
                            last_activity_at: now,
                            ended_at: None,
                            source: source.clone(),
                            prompt_count: 0,
                            stop_count: 0,
                            transcript_path: transcript_path.clone(),
                            pinned: false,
                        },
                    );
                }
            }
        }

        LifecycleEvent::PromptSubmitted { prompt } => {
            let Some(existing) = doc.sessions.get_mut(session_id) else {
                tracing::debug!(session = %session_id, "Prompt for unknown session, ignoring");
                return;
            };
            existing.prompt_count += 1;
            existing.last_activity_at = now;
            if prompt.chars().count() > SUMMARY_MIN_PROMPT_CHARS {
                existing.summary = prompt.chars().take(SUMMARY_MAX_CHARS).collect();
            }
        }

        LifecycleEvent::Stopped => {
            let Some(existing) = doc.sessions.get_mut(session_id) else {
                tracing::debug!(session = %session_id, "Stop for unknown session, ignoring");
                return;
            };
            existing.stop_count += 1;
            existing.last_activity_at = now;
        }

        LifecycleEvent::End => {
            let Some(existing) = doc.sessions.get_mut(session_id) else {
                tracing::debug!(session = %session_id, "End for unknown session, ignoring");
                return;
            };
            existing.ended_at = Some(now);
            existing.last_activity_at = now;
            existing.status = if existing.pinned {
                SessionStatus::Pinned
            } else {
                SessionStatus::Archived
            };
        }
    }
}

/// Retires every *other* active session whose last activity is older than
/// `stale_after`.
///
/// A session that crashed or was killed without a clean `End` would stay
/// `active` forever; the next session start is the recovery trigger, so no
/// external reaper is needed. Swept records keep their history and are
/// never removed here.
fn sweep_stale_active(
    doc: &mut StoreDocument,
    current_id: &str,
    now: DateTime<Utc>,
    stale_after: Duration,
) {
    let threshold = now - stale_after;
    for record in doc.sessions.values_mut() {
        if record.session_id != current_id
            && record.status == SessionStatus::Active
            && record.last_activity_at < threshold
        {
            tracing::debug!(session = %record.session_id, "Sweeping stale active session");
            record.status = if record.pinned {
                SessionStatus::Pinned
            } else {
                SessionStatus::Archived
            };
            record.ended_at = Some(now);
        }
    }
}

/// Flips the pin flag; returns the new flag, or `None` for unknown ids.
///
/// Pinning an archived session promotes it to `pinned` (backfilling
/// `ended_at` if a sweep or crash left it unset); unpinning a `pinned`
/// session demotes it to `archived`. Active sessions only carry the flag
/// until they end.
pub fn toggle_pin(doc: &mut StoreDocument, session_id: &str, now: DateTime<Utc>) -> Option<bool> {
    let record = doc.sessions.get_mut(session_id)?;
    record.pinned = !record.pinned;

    if record.pinned && record.status == SessionStatus::Archived {
        record.status = SessionStatus::Pinned;
        record.ended_at = record.ended_at.or(Some(now));
    } else if !record.pinned && record.status == SessionStatus::Pinned {
        record.status = SessionStatus::Archived;
    }

    Some(record.pinned)
}

/// Removes the record outright. Returns whether anything was removed.
pub fn delete_session(doc: &mut StoreDocument, session_id: &str) -> bool {
    doc.sessions.remove(session_id).is_some()
}
