//! roster-hook: CLI hook handler for Roster session tracking.
//!
//! Called by the host program's lifecycle hooks; each invocation is one
//! short-lived process that applies one locked mutation to the shared
//! store.
//!
//! ## Subcommands
//!
//! - `handle`: main hook handler, reads a JSON event from stdin
//! - `pin`: toggles the pin flag on a session

mod handle;
mod logging;
mod pin;

use clap::{Parser, Subcommand};

use roster_core::SessionStore;

#[derive(Parser)]
#[command(name = "roster-hook")]
#[command(about = "Roster session lifecycle tracker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a hook event (reads JSON from stdin)
    Handle,

    /// Toggle the pin flag on a session
    Pin {
        #[arg(value_name = "SESSION_ID")]
        session_id: String,
    },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let store = match SessionStore::resolve() {
        Ok(store) => store,
        Err(err) => {
            eprintln!("roster-hook: {}", err);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Handle => {
            if let Err(e) = handle::run(&store) {
                tracing::error!(error = %e, "roster-hook handle failed");
                std::process::exit(1);
            }
        }
        Commands::Pin { session_id } => {
            if let Err(e) = pin::run(&store, &session_id) {
                eprintln!("roster-hook: {}", e);
                std::process::exit(1);
            }
        }
    }
}
