//! Serialized session types shared by every store client.
//!
//! Current on-disk format is v1. Field names match the wire format consumed
//! by the dashboard, so renames here are breaking changes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// On-disk schema version this library reads and writes.
pub const STORE_VERSION: u32 = 1;

/// Where a session sits in its lifecycle.
///
/// `Unknown` is never written by this library; it absorbs status strings
/// from newer or foreign writers so a whole store read doesn't fail on one
/// record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Pinned,
    Archived,
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    /// Display ordering rank: active sessions first, unknowns last.
    pub fn rank(self) -> u8 {
        match self {
            SessionStatus::Active => 0,
            SessionStatus::Pinned => 1,
            SessionStatus::Archived => 2,
            SessionStatus::Unknown => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub cwd: String,
    pub project_name: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub summary: String,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub prompt_count: u32,
    #[serde(default)]
    pub stop_count: u32,
    #[serde(default)]
    pub transcript_path: String,
    #[serde(default)]
    pub pinned: bool,
}

/// The full store document: one JSON file, one unit of atomicity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    pub version: u32,
    pub sessions: HashMap<String, SessionRecord>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        StoreDocument {
            version: STORE_VERSION,
            sessions: HashMap::new(),
        }
    }
}
