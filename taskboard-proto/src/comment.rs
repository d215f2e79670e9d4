//! Comments and attached files as returned by the remote store.
//!
//! Both carry server-assigned ids and timestamps. The client never
//! creates either locally; it only displays what the store returned.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, FileId, TaskId};
use crate::user::UserRef;

/// Default display format for comment and upload timestamps (`Mar 4, 2:07 PM`).
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%b %-d, %-I:%M %p";

/// Whether `format` is a chrono format string every timestamp can be
/// rendered with.
#[must_use]
pub fn is_valid_timestamp_format(format: &str) -> bool {
    StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

/// A note left on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Server-assigned identifier.
    pub id: CommentId,
    /// Task the comment belongs to.
    pub task_id: TaskId,
    /// Author profile.
    pub author: UserRef,
    /// Comment body.
    pub content: String,
    /// Server creation time.
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Formats the creation time with a chrono format string.
    ///
    /// An invalid format falls back to [`DEFAULT_TIMESTAMP_FORMAT`].
    #[must_use]
    pub fn display_timestamp(&self, format: &str) -> String {
        let mut out = String::new();
        if write!(out, "{}", self.created_at.format(format)).is_err() {
            out.clear();
            let _ = write!(out, "{}", self.created_at.format(DEFAULT_TIMESTAMP_FORMAT));
        }
        out
    }
}

/// A file attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFile {
    /// Server-assigned identifier.
    pub id: FileId,
    /// Task the file belongs to.
    pub task_id: TaskId,
    /// Original file name.
    pub file_name: String,
    /// Download location.
    pub file_url: String,
    /// Uploader profile.
    pub uploaded_by: UserRef,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
}
