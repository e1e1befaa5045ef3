//! Watch ids, actions and the event types that flow through the bridge.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Opaque handle for an active watch, assigned by the notification backend.
///
/// Always positive, so it can share an `i64` with negative [`ErrorCode`]s at
/// the host boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchId(i64);

impl WatchId {
    /// Wrap a raw id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Action as reported by a notification backend.
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawAction {
    Add = 1,
    Delete = 2,
    Modified = 3,
    Moved = 4,
}

/// Action delivered to consumers.
///
/// Moves are not modeled: a backend rename is dropped at ingestion.
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Add = 1,
    Delete = 2,
    Modified = 3,
}

impl Action {
    /// Map a backend action, `None` for moves.
    pub fn from_raw(raw: RawAction) -> Option<Self> {
        match raw {
            RawAction::Add => Some(Self::Add),
            RawAction::Delete => Some(Self::Delete),
            RawAction::Modified => Some(Self::Modified),
            RawAction::Moved => None,
        }
    }

    /// Raw numeric value.
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Short lowercase label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Modified => "modified",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a backend callback, delivered on the backend's thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub watch_id: WatchId,
    /// Directory the watch was created for, as the backend knows it.
    pub directory: String,
    /// Changed entry, relative to `directory`.
    pub filename: String,
    pub action: RawAction,
    /// Previous name for moves.
    pub old_filename: Option<String>,
}

impl RawEvent {
    /// Create an event without a previous name.
    pub fn new(
        watch_id: WatchId,
        directory: impl Into<String>,
        filename: impl Into<String>,
        action: RawAction,
    ) -> Self {
        Self {
            watch_id,
            directory: directory.into(),
            filename: filename.into(),
            action,
            old_filename: None,
        }
    }
}

/// Queued event: normalized filename, relative to the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWatchEvent {
    pub action: Action,
    pub watch_id: WatchId,
    pub filename: String,
}

/// Event handed to the consumer, with the path in the output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    pub action: Action,
    pub watch_id: WatchId,
    pub path: String,
}

/// Name/value pairs the host publishes to scripts.
pub fn host_constants() -> [(&'static str, i64); 9] {
    [
        ("ACTION_ADD", Action::Add.code()),
        ("ACTION_DELETE", Action::Delete.code()),
        ("ACTION_MODIFIED", Action::Modified.code()),
        ("ERROR_FILE_NOT_FOUND", ErrorCode::FileNotFound.get()),
        ("ERROR_FILE_NOT_READABLE", ErrorCode::FileNotReadable.get()),
        ("ERROR_FILE_OUT_OF_SCOPE", ErrorCode::FileOutOfScope.get()),
        ("ERROR_FILE_REMOTE", ErrorCode::FileRemote.get()),
        ("ERROR_FILE_REPEATED", ErrorCode::FileRepeated.get()),
        ("ERROR_UNSPECIFIED", ErrorCode::Unspecified.get()),
    ]
}
