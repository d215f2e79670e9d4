//! Remote store contract.
//!
//! Persistence, identity and timestamps all belong to a hosted
//! backend-as-a-service. The client only sees it through the
//! [`RemoteStore`] trait. Implementations in this crate:
//! - [`memory::InMemoryStore`]: in-process store with fault injection for tests
//! - [`file::JsonFileStore`]: single JSON document on disk, used by the CLI
//!
//! Both keep their rows in [`tables::StoreTables`].

pub mod file;
pub mod memory;
pub mod tables;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use taskboard_proto::{
    Comment, ProjectId, TaskDraft, TaskFile, TaskId, TaskRecord, TaskStatus, UserId, UserRef,
};

/// Names each store operation, for logging, fault injection and call
/// accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Fetch the tasks of a project.
    FetchTasks,
    /// Fetch one task row.
    FetchTask,
    /// Write a task's status column.
    UpdateTaskStatus,
    /// Insert a new task row.
    InsertTask,
    /// Fetch a task's comments.
    FetchComments,
    /// Insert a comment row.
    InsertComment,
    /// Fetch a task's attached files.
    FetchFiles,
    /// Fetch a task's assignees.
    FetchAssignees,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchTasks => "fetch_tasks",
            Self::FetchTask => "fetch_task",
            Self::UpdateTaskStatus => "update_task_status",
            Self::InsertTask => "insert_task",
            Self::FetchComments => "fetch_comments",
            Self::InsertComment => "insert_comment",
            Self::FetchFiles => "fetch_files",
            Self::FetchAssignees => "fetch_assignees",
        };
        f.write_str(name)
    }
}

/// Errors returned by a [`RemoteStore`].
///
/// Callers treat every variant the same way ("the operation failed"); the
/// variants exist for logs and messages only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the request (auth, constraint, policy).
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The addressed row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request did not complete in time.
    #[error("{0} timed out")]
    Timeout(StoreOp),

    /// Stored data could not be read back.
    #[error("malformed store data: {0}")]
    Malformed(String),
}

/// Row filter for [`RemoteStore::fetch_tasks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks of this project are returned.
    pub project_id: ProjectId,
}

impl TaskFilter {
    /// Filter by project scope.
    #[must_use]
    pub const fn project(project_id: ProjectId) -> Self {
        Self { project_id }
    }
}

/// Async access to the hosted task store.
///
/// Task rows are returned raw ([`TaskRecord`]) so that malformed status
/// values surface at board load time rather than failing the whole fetch.
/// Derived columns (`comment_count`, `file_count`, `assignees`) are filled
/// in by the store.
pub trait RemoteStore: Send + Sync {
    /// Fetch all tasks matching the filter, in store insertion order.
    fn fetch_tasks(
        &self,
        filter: &TaskFilter,
    ) -> impl std::future::Future<Output = Result<Vec<TaskRecord>, StoreError>> + Send;

    /// Fetch a single task row.
    fn fetch_task(
        &self,
        task_id: &TaskId,
    ) -> impl std::future::Future<Output = Result<TaskRecord, StoreError>> + Send;

    /// Write a task's status column.
    fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Insert a task and return the stored row with its server id.
    fn insert_task(
        &self,
        draft: &TaskDraft,
    ) -> impl std::future::Future<Output = Result<TaskRecord, StoreError>> + Send;

    /// Fetch a task's comments, newest first.
    fn fetch_comments(
        &self,
        task_id: &TaskId,
    ) -> impl std::future::Future<Output = Result<Vec<Comment>, StoreError>> + Send;

    /// Insert a comment and return it with its server id and timestamp.
    fn insert_comment(
        &self,
        task_id: &TaskId,
        author_id: &UserId,
        content: &str,
    ) -> impl std::future::Future<Output = Result<Comment, StoreError>> + Send;

    /// Fetch a task's attached files, newest first.
    fn fetch_files(
        &self,
        task_id: &TaskId,
    ) -> impl std::future::Future<Output = Result<Vec<TaskFile>, StoreError>> + Send;

    /// Fetch the users assigned to a task.
    fn fetch_assignees(
        &self,
        task_id: &TaskId,
    ) -> impl std::future::Future<Output = Result<Vec<UserRef>, StoreError>> + Send;
}

/// Runs one store call, failing with [`StoreError::Timeout`] once `limit`
/// has elapsed.
///
/// # Errors
///
/// Returns the call's own error, or [`StoreError::Timeout`] naming `op`.
pub async fn with_timeout<T>(
    op: StoreOp,
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(StoreError::Timeout(op)))
}
