//! Task detail view data.

use std::time::Duration;

use taskboard_proto::{Task, TaskFile, TaskId, UserRef};

use crate::comments::CommentList;
use crate::coordinator::CoordinatorError;
use crate::store::{RemoteStore, StoreError, StoreOp, with_timeout};

/// Everything shown when a task is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetail {
    /// The task itself, as currently stored.
    pub task: Task,
    /// Comments, newest first.
    pub comments: CommentList,
    /// Attached files, newest first.
    pub files: Vec<TaskFile>,
    /// Assigned users.
    pub assignees: Vec<UserRef>,
}

impl TaskDetail {
    /// Fetches the task row, comments, files and assignees concurrently.
    ///
    /// Each fetch is bounded by `limit`. The first failure cancels the rest.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::RemoteRead`] naming the failed fetch, or
    /// [`CoordinatorError::InvalidRecord`] if the task row is unreadable.
    pub async fn fetch<S: RemoteStore>(
        store: &S,
        task_id: &TaskId,
        limit: Duration,
    ) -> Result<Self, CoordinatorError> {
        let (record, comments, files, assignees) = tokio::try_join!(
            read(StoreOp::FetchTask, limit, store.fetch_task(task_id)),
            read(StoreOp::FetchComments, limit, store.fetch_comments(task_id)),
            read(StoreOp::FetchFiles, limit, store.fetch_files(task_id)),
            read(StoreOp::FetchAssignees, limit, store.fetch_assignees(task_id)),
        )?;

        Ok(Self {
            task: Task::try_from(record)?,
            comments: CommentList::from_fetched(comments),
            files,
            assignees,
        })
    }

    /// Assignee initials in store order, for compact display.
    #[must_use]
    pub fn assignee_initials(&self) -> Vec<String> {
        self.assignees.iter().map(UserRef::initials).collect()
    }
}

async fn read<T>(
    op: StoreOp,
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, CoordinatorError> {
    with_timeout(op, limit, call)
        .await
        .map_err(|source| CoordinatorError::RemoteRead { op, source })
}
