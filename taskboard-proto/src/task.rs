//! Task rows as exchanged with the remote store.
//!
//! [`TaskRecord`] mirrors a row exactly as the store returns it, with
//! status and priority as free-form strings. [`Task`] is the validated
//! form the board works with; conversion rejects values outside the
//! fixed enums so malformed rows never reach a column.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, TaskId, UserId};

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Board column a task sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started.
    #[serde(rename = "To Do")]
    ToDo,
    /// Actively being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Finished.
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    /// All statuses in board order (left to right).
    pub const ALL: [Self; 3] = [Self::ToDo, Self::InProgress, Self::Done];

    /// Position of this status's column on the board.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::ToDo => 0,
            Self::InProgress => 1,
            Self::Done => 2,
        }
    }

    /// The string the store uses for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Parses a status column value. Only the exact store spelling is
    /// accepted; use [`FromStr`] for user input.
    #[must_use]
    pub fn from_store(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    /// Accepts the store spelling (`"In Progress"`) as well as the
    /// compact forms typed on a command line (`in-progress`, `done`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "todo" => Ok(Self::ToDo),
            "inprogress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority (the default for new tasks).
    #[default]
    Medium,
    /// High priority.
    High,
}

impl Priority {
    /// The string the store uses for this priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Parses a priority column value in its exact store spelling.
    #[must_use]
    pub fn from_store(value: &str) -> Option<Self> {
        [Self::Low, Self::Medium, Self::High]
            .into_iter()
            .find(|priority| priority.as_str() == value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// A string that does not name any variant of a fixed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

/// Why a [`TaskRecord`] could not become a [`Task`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The status column holds something other than the three board statuses.
    #[error("task {task_id} has invalid status '{value}'")]
    InvalidStatus {
        /// Offending row.
        task_id: TaskId,
        /// Raw status value.
        value: String,
    },
    /// The priority column holds an unknown value.
    #[error("task {task_id} has invalid priority '{value}'")]
    InvalidPriority {
        /// Offending row.
        task_id: TaskId,
        /// Raw priority value.
        value: String,
    },
}

impl RecordError {
    /// The id of the row that was rejected.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::InvalidStatus { task_id, .. } | Self::InvalidPriority { task_id, .. } => task_id,
        }
    }
}

/// A task row exactly as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Optional long-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Raw status string.
    pub status: String,
    /// Raw priority string.
    pub priority: String,
    /// Project the task belongs to.
    pub project_id: ProjectId,
    /// User who created the task.
    pub created_by: UserId,
    /// Number of comments attached to the task.
    #[serde(default)]
    pub comment_count: u32,
    /// Number of files attached to the task.
    #[serde(default)]
    pub file_count: u32,
    /// Users assigned to the task.
    #[serde(default)]
    pub assignees: Vec<UserId>,
    /// Optional cover image shown on the card.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl TaskRecord {
    /// Builds a well-formed record with default priority and no extras.
    pub fn new(
        id: impl Into<TaskId>,
        title: impl Into<String>,
        status: TaskStatus,
        project_id: ProjectId,
        created_by: UserId,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            status: status.as_str().to_string(),
            priority: Priority::default().as_str().to_string(),
            project_id,
            created_by,
            comment_count: 0,
            file_count: 0,
            assignees: Vec::new(),
            image_url: None,
        }
    }

    /// Sets the priority column.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority.as_str().to_string();
        self
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// A validated task, as shown on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Optional long-form description.
    pub description: Option<String>,
    /// Column the task sits in.
    pub status: TaskStatus,
    /// Priority.
    pub priority: Priority,
    /// Project the task belongs to.
    pub project_id: ProjectId,
    /// User who created the task.
    pub created_by: UserId,
    /// Number of comments attached to the task.
    pub comment_count: u32,
    /// Number of files attached to the task.
    pub file_count: u32,
    /// Users assigned to the task.
    pub assignees: Vec<UserId>,
    /// Optional cover image shown on the card.
    pub image_url: Option<String>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = RecordError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let Some(status) = TaskStatus::from_store(&record.status) else {
            return Err(RecordError::InvalidStatus {
                task_id: record.id,
                value: record.status,
            });
        };
        let Some(priority) = Priority::from_store(&record.priority) else {
            return Err(RecordError::InvalidPriority {
                task_id: record.id,
                value: record.priority,
            });
        };
        Ok(Self {
            id: record.id,
            title: record.title,
            description: record.description,
            status,
            priority,
            project_id: record.project_id,
            created_by: record.created_by,
            comment_count: record.comment_count,
            file_count: record.file_count,
            assignees: record.assignees,
            image_url: record.image_url,
        })
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status.as_str().to_string(),
            priority: task.priority.as_str().to_string(),
            project_id: task.project_id,
            created_by: task.created_by,
            comment_count: task.comment_count,
            file_count: task.file_count,
            assignees: task.assignees,
            image_url: task.image_url,
        }
    }
}

/// User-entered fields for a task that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTask {
    /// Task title (required).
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Column to create the task in.
    pub status: Option<TaskStatus>,
    /// Priority, `Medium` when not given.
    pub priority: Option<Priority>,
}

impl NewTask {
    /// Starts a new task with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the description. Blank descriptions are dropped.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }

    /// Sets the initial column.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// The insert payload sent to the store: a [`NewTask`] plus the session's
/// project scope and author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Task title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Initial column.
    pub status: TaskStatus,
    /// Priority.
    pub priority: Priority,
    /// Project scope.
    pub project_id: ProjectId,
    /// Creating user.
    pub created_by: UserId,
}

impl TaskDraft {
    /// Completes a [`NewTask`] with project scope and author.
    #[must_use]
    pub fn from_new(task: NewTask, project_id: ProjectId, created_by: UserId) -> Self {
        Self {
            title: task.title,
            description: task.description,
            status: task.status.unwrap_or(TaskStatus::ToDo),
            priority: task.priority.unwrap_or_default(),
            project_id,
            created_by,
        }
    }

    /// Turns the draft into a stored row under the given server id.
    #[must_use]
    pub fn into_record(self, id: TaskId) -> TaskRecord {
        TaskRecord {
            id,
            title: self.title,
            description: self.description,
            status: self.status.as_str().to_string(),
            priority: self.priority.as_str().to_string(),
            project_id: self.project_id,
            created_by: self.created_by,
            comment_count: 0,
            file_count: 0,
            assignees: Vec::new(),
            image_url: None,
        }
    }
}
