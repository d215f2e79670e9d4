//! In-memory remote store for testing.
//!
//! Behaves like the hosted store (server ids, server timestamps, derived
//! columns) and adds knobs the real thing does not have: per-operation
//! failures, artificial latency, and a log of every call so tests can
//! assert that an operation never reached the store.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex;

use taskboard_proto::{
    Comment, TaskDraft, TaskFile, TaskId, TaskRecord, TaskStatus, UserId, UserRef,
};

use super::tables::StoreTables;
use super::{RemoteStore, StoreError, StoreOp, TaskFilter};

/// Injected failure and latency settings.
#[derive(Debug, Default)]
struct Faults {
    /// Operations that fail until healed.
    failing: HashSet<StoreOp>,
    /// Operations that fail exactly once more.
    fail_once: HashSet<StoreOp>,
    /// Extra delay before an operation runs.
    latency: HashMap<StoreOp, Duration>,
    /// Extra delay for status updates of specific tasks.
    status_latency: HashMap<TaskId, Duration>,
    /// Status written into rows created by `insert_task`.
    insert_status: Option<String>,
}

/// In-process [`RemoteStore`] backed by [`StoreTables`].
pub struct InMemoryStore {
    tables: Mutex<StoreTables>,
    faults: SyncMutex<Faults>,
    calls: SyncMutex<Vec<StoreOp>>,
}

impl InMemoryStore {
    /// Create a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tables(StoreTables::default())
    }

    /// Create a store holding the given tables.
    #[must_use]
    pub fn with_tables(tables: StoreTables) -> Self {
        Self {
            tables: Mutex::new(tables),
            faults: SyncMutex::new(Faults::default()),
            calls: SyncMutex::new(Vec::new()),
        }
    }

    /// Seeds a task row as-is. Malformed status values are kept.
    #[must_use]
    pub fn with_task(mut self, record: TaskRecord) -> Self {
        self.tables.get_mut().push_raw(record);
        self
    }

    /// Seeds a user profile.
    #[must_use]
    pub fn with_user(mut self, user: UserRef) -> Self {
        self.tables.get_mut().upsert_user(user);
        self
    }

    /// Makes the next server id `srv-{next}`.
    #[must_use]
    pub fn with_next_id(mut self, next: u64) -> Self {
        self.tables.get_mut().last_id = next.saturating_sub(1);
        self
    }

    /// Makes every call to `op` fail until [`heal`](Self::heal) is called.
    pub fn fail(&self, op: StoreOp) {
        self.faults.lock().failing.insert(op);
    }

    /// Makes only the next call to `op` fail.
    pub fn fail_next(&self, op: StoreOp) {
        self.faults.lock().fail_once.insert(op);
    }

    /// Clears injected failures for `op`.
    pub fn heal(&self, op: StoreOp) {
        let mut faults = self.faults.lock();
        faults.failing.remove(&op);
        faults.fail_once.remove(&op);
    }

    /// Delays every call to `op` by `delay`.
    pub fn set_latency(&self, op: StoreOp, delay: Duration) {
        self.faults.lock().latency.insert(op, delay);
    }

    /// Delays status updates for one task, on top of any per-op latency.
    pub fn set_status_latency(&self, task_id: TaskId, delay: Duration) {
        self.faults.lock().status_latency.insert(task_id, delay);
    }

    /// Makes `insert_task` store and return rows with a raw status value,
    /// as a server with a different status vocabulary would.
    pub fn set_insert_status(&self, raw: impl Into<String>) {
        self.faults.lock().insert_status = Some(raw.into());
    }

    /// Every operation that reached the store, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreOp> {
        self.calls.lock().clone()
    }

    /// Number of calls made to `op`.
    #[must_use]
    pub fn call_count(&self, op: StoreOp) -> usize {
        self.calls.lock().iter().filter(|c| **c == op).count()
    }

    /// Changes a task's status as another client would, bypassing faults.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub async fn set_status_externally(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        self.tables.lock().await.set_status(task_id, status)
    }

    /// Inserts a task as another client would, bypassing faults.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the id counter is exhausted.
    pub async fn insert_externally(&self, draft: &TaskDraft) -> Result<TaskRecord, StoreError> {
        self.tables.lock().await.insert_task(draft)
    }

    /// Assigns a user to a task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the task does not exist.
    pub async fn assign(&self, task_id: &TaskId, user_id: &UserId) -> Result<(), StoreError> {
        self.tables.lock().await.assign(task_id, user_id)
    }

    /// Records an uploaded file for a task, timestamped now.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the task does not exist.
    pub async fn attach_file(
        &self,
        task_id: &TaskId,
        file_name: &str,
        file_url: &str,
        uploaded_by: &UserId,
    ) -> Result<TaskFile, StoreError> {
        self.tables
            .lock()
            .await
            .attach_file(task_id, file_name, file_url, uploaded_by, Utc::now())
    }

    /// A copy of the current tables.
    pub async fn snapshot(&self) -> StoreTables {
        self.tables.lock().await.clone()
    }

    /// Logs the call, applies latency, then decides whether it fails.
    async fn enter(&self, op: StoreOp, task_id: Option<&TaskId>) -> Result<(), StoreError> {
        self.calls.lock().push(op);

        let delay = {
            let faults = self.faults.lock();
            let base = faults.latency.get(&op).copied().unwrap_or_default();
            let per_task = task_id
                .filter(|_| op == StoreOp::UpdateTaskStatus)
                .and_then(|id| faults.status_latency.get(id).copied())
                .unwrap_or_default();
            base + per_task
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut faults = self.faults.lock();
        if faults.fail_once.remove(&op) || faults.failing.contains(&op) {
            return Err(StoreError::Unavailable(format!("injected failure in {op}")));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for InMemoryStore {
    async fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError> {
        self.enter(StoreOp::FetchTasks, None).await?;
        Ok(self.tables.lock().await.tasks_matching(filter))
    }

    async fn fetch_task(&self, task_id: &TaskId) -> Result<TaskRecord, StoreError> {
        self.enter(StoreOp::FetchTask, Some(task_id)).await?;
        self.tables.lock().await.task(task_id)
    }

    async fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        self.enter(StoreOp::UpdateTaskStatus, Some(task_id)).await?;
        self.tables.lock().await.set_status(task_id, status)
    }

    async fn insert_task(&self, draft: &TaskDraft) -> Result<TaskRecord, StoreError> {
        self.enter(StoreOp::InsertTask, None).await?;
        let raw_status = self.faults.lock().insert_status.clone();
        let mut tables = self.tables.lock().await;
        let mut record = tables.insert_task(draft)?;
        if let Some(raw) = raw_status {
            if let Some(row) = tables.tasks.iter_mut().find(|t| t.id == record.id) {
                row.status.clone_from(&raw);
            }
            record.status = raw;
        }
        Ok(record)
    }

    async fn fetch_comments(&self, task_id: &TaskId) -> Result<Vec<Comment>, StoreError> {
        self.enter(StoreOp::FetchComments, Some(task_id)).await?;
        Ok(self.tables.lock().await.comments_for(task_id))
    }

    async fn insert_comment(
        &self,
        task_id: &TaskId,
        author_id: &UserId,
        content: &str,
    ) -> Result<Comment, StoreError> {
        self.enter(StoreOp::InsertComment, Some(task_id)).await?;
        self.tables
            .lock()
            .await
            .insert_comment(task_id, author_id, content, Utc::now())
    }

    async fn fetch_files(&self, task_id: &TaskId) -> Result<Vec<TaskFile>, StoreError> {
        self.enter(StoreOp::FetchFiles, Some(task_id)).await?;
        Ok(self.tables.lock().await.files_for(task_id))
    }

    async fn fetch_assignees(&self, task_id: &TaskId) -> Result<Vec<UserRef>, StoreError> {
        self.enter(StoreOp::FetchAssignees, Some(task_id)).await?;
        Ok(self.tables.lock().await.assignees_for(task_id))
    }
}
