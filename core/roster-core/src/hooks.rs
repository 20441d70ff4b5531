//! Hook payload parsing.
//!
//! The hook layer delivers one JSON object per invocation on stdin.
//! Payloads come from an external producer, so parsing is tolerant: unknown
//! fields are ignored and unrecognized event names map to `None` (the
//! caller drops them without touching the store).

use std::path::Path;

use serde::Deserialize;

use crate::lifecycle::LifecycleEvent;

/// Raw hook payload as delivered on stdin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub hook_event_name: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl HookInput {
    /// Maps the wire event name to a lifecycle event.
    ///
    /// `cwd` and `project_name` are resolved by the caller (the payload's
    /// cwd may be absent). Event names the tracker does not consume return
    /// `None`.
    pub fn to_event(&self, cwd: &str, project_name: &str) -> Option<LifecycleEvent> {
        match self.hook_event_name.as_deref()? {
            "SessionStart" => Some(LifecycleEvent::Start {
                source: self
                    .source
                    .clone()
                    .unwrap_or_else(|| "startup".to_string()),
                cwd: cwd.to_string(),
                project_name: project_name.to_string(),
                transcript_path: self.transcript_path.clone().unwrap_or_default(),
            }),
            "UserPromptSubmit" => Some(LifecycleEvent::PromptSubmitted {
                prompt: self.prompt.clone().unwrap_or_default(),
            }),
            "Stop" => Some(LifecycleEvent::Stopped),
            "SessionEnd" => Some(LifecycleEvent::End),
            _ => None,
        }
    }
}

/// Display name for a working directory: `~` for the home directory itself,
/// otherwise the final path component.
pub fn project_name_for(cwd: &str, home: Option<&Path>) -> String {
    if home.is_some_and(|home| Path::new(cwd) == home) {
        return "~".to_string();
    }
    Path::new(cwd)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cwd.to_string())
}
