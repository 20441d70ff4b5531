//! Event handler for lifecycle hooks.
//!
//! Reads one JSON payload from stdin and applies it to the store as a
//! single locked mutation. Hooks fire on a best-effort pipeline, so bad
//! input never fails the caller: empty stdin, unparsable JSON, a missing
//! session id, or an event name we don't track all exit 0 without touching
//! the store. Only real store failures (permissions, disk full) exit
//! nonzero.

use std::io::{self, Read};

use chrono::Utc;

use roster_core::{apply_event, project_name_for, HookInput, Result, RosterError, SessionStore};

pub fn run(store: &SessionStore) -> Result<()> {
    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .map_err(|err| RosterError::io("read hook payload", err))?;

    if raw.trim().is_empty() {
        return Ok(());
    }

    let input: HookInput = match serde_json::from_str(&raw) {
        Ok(input) => input,
        Err(err) => {
            tracing::debug!(error = %err, "Unparsable hook payload, ignoring");
            return Ok(());
        }
    };

    handle_hook_input(store, input)
}

pub fn handle_hook_input(store: &SessionStore, input: HookInput) -> Result<()> {
    let Some(session_id) = input
        .session_id
        .clone()
        .filter(|id| !id.trim().is_empty())
    else {
        tracing::debug!(
            event = ?input.hook_event_name,
            "Hook payload missing session_id, ignoring"
        );
        return Ok(());
    };

    let cwd = input
        .cwd
        .clone()
        .or_else(|| {
            std::env::current_dir()
                .ok()
                .map(|p| p.to_string_lossy().into_owned())
        })
        .unwrap_or_default();
    let project_name = project_name_for(&cwd, dirs::home_dir().as_deref());

    let Some(event) = input.to_event(&cwd, &project_name) else {
        tracing::debug!(event = ?input.hook_event_name, "Unhandled hook event");
        return Ok(());
    };

    let stale_after = store.config().stale_active_after;
    store.with_lock(|doc| apply_event(doc, &session_id, &event, Utc::now(), stale_after))?;

    tracing::debug!(
        event = ?input.hook_event_name,
        session = %session_id,
        "Applied hook event"
    );
    Ok(())
}
