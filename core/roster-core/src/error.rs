//! Error types for roster-core operations.
//!
//! Recoverable conditions (stale locks, corrupt store files, unknown-id
//! mutations) are handled in place and never reach this enum; only genuine
//! filesystem and serialization failures do.

/// All errors that can occur in roster-core operations.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Home directory not found")]
    HomeDirNotFound,
}

impl RosterError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RosterError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        RosterError::Json {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using RosterError.
pub type Result<T> = std::result::Result<T, RosterError>;
