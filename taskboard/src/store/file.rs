//! Single-document JSON store.
//!
//! Stands in for the hosted backend when running the CLI locally: every
//! operation loads the document, applies the change to [`StoreTables`],
//! and writes it back atomically (temp file + rename). A missing document
//! is an empty store.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::Mutex;

use taskboard_proto::codec;
use taskboard_proto::{
    Comment, TaskDraft, TaskFile, TaskId, TaskRecord, TaskStatus, UserId, UserRef,
};

use super::tables::StoreTables;
use super::{RemoteStore, StoreError, TaskFilter};

/// [`RemoteStore`] persisted as one JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens (lazily) the document at `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the file cannot be read, or
    /// [`StoreError::Malformed`] if it is not a valid store document.
    pub async fn load(&self) -> Result<StoreTables, StoreError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Inserts or replaces a user profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the document cannot be read or written.
    pub async fn upsert_user(&self, user: UserRef) -> Result<(), StoreError> {
        self.modify(|tables| {
            tables.upsert_user(user);
            Ok(())
        })
        .await
    }

    async fn read(&self) -> Result<StoreTables, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => codec::decode(&bytes).map_err(|e| {
                StoreError::Malformed(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreTables::default()),
            Err(e) => Err(StoreError::Unavailable(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write(&self, tables: &StoreTables) -> Result<(), StoreError> {
        let data = codec::encode(tables).map_err(|e| StoreError::Malformed(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Unavailable(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data).await.map_err(|e| {
            StoreError::Unavailable(format!("failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            StoreError::Unavailable(format!(
                "failed to rename {} -> {}: {e}",
                tmp.display(),
                self.path.display()
            ))
        })
    }

    /// Loads, applies `change`, and saves only if `change` succeeded.
    async fn modify<T>(
        &self,
        change: impl FnOnce(&mut StoreTables) -> Result<T, StoreError> + Send,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().await;
        let mut tables = self.read().await?;
        let out = change(&mut tables)?;
        self.write(&tables).await?;
        Ok(out)
    }
}

impl RemoteStore for JsonFileStore {
    async fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError> {
        Ok(self.load().await?.tasks_matching(filter))
    }

    async fn fetch_task(&self, task_id: &TaskId) -> Result<TaskRecord, StoreError> {
        self.load().await?.task(task_id)
    }

    async fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        self.modify(|tables| tables.set_status(task_id, status))
            .await
    }

    async fn insert_task(&self, draft: &TaskDraft) -> Result<TaskRecord, StoreError> {
        self.modify(|tables| tables.insert_task(draft)).await
    }

    async fn fetch_comments(&self, task_id: &TaskId) -> Result<Vec<Comment>, StoreError> {
        Ok(self.load().await?.comments_for(task_id))
    }

    async fn insert_comment(
        &self,
        task_id: &TaskId,
        author_id: &UserId,
        content: &str,
    ) -> Result<Comment, StoreError> {
        let now = Utc::now();
        self.modify(|tables| tables.insert_comment(task_id, author_id, content, now))
            .await
    }

    async fn fetch_files(&self, task_id: &TaskId) -> Result<Vec<TaskFile>, StoreError> {
        Ok(self.load().await?.files_for(task_id))
    }

    async fn fetch_assignees(&self, task_id: &TaskId) -> Result<Vec<UserRef>, StoreError> {
        Ok(self.load().await?.assignees_for(task_id))
    }
}
