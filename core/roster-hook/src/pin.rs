//! Pin toggle subcommand.
//!
//! The one roster-hook command meant for a human terminal, so it talks on
//! stdout.

use chrono::Utc;

use roster_core::{toggle_pin, Result, SessionStore};

pub fn run(store: &SessionStore, session_id: &str) -> Result<()> {
    let toggled = store.with_lock(|doc| toggle_pin(doc, session_id, Utc::now()))?;

    match toggled {
        Some(true) => {
            println!("Session pinned — it will stay in the dashboard after you exit.");
        }
        Some(false) => {
            println!("Session unpinned.");
        }
        None => {
            println!("Session {} not found.", session_id);
        }
    }
    Ok(())
}
