//! Table-level storage shared by the local store implementations.
//!
//! [`StoreTables`] behaves like the hosted schema: tasks, comments, files,
//! profiles and assignments live in separate tables, ids come from a
//! server-side counter, and derived task columns (comment/file counts,
//! assignee list) are computed at read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskboard_proto::{
    Comment, CommentId, FileId, TaskDraft, TaskFile, TaskId, TaskRecord, TaskStatus, UserId,
    UserRef,
};

use super::{StoreError, TaskFilter};

/// Prefix of every server-assigned id.
const ID_PREFIX: &str = "srv";

/// One row of the task/user assignment relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned task.
    pub task_id: TaskId,
    /// Assigned user.
    pub user_id: UserId,
}

/// All tables of a local store, serializable as one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreTables {
    /// Task rows in insertion order.
    pub tasks: Vec<TaskRecord>,
    /// Comment rows in insertion order.
    pub comments: Vec<Comment>,
    /// File rows in insertion order.
    pub files: Vec<TaskFile>,
    /// User profiles.
    pub users: Vec<UserRef>,
    /// Task/user assignments.
    pub assignments: Vec<Assignment>,
    /// Last id handed out; the next row gets `last_id + 1`.
    pub last_id: u64,
}

impl StoreTables {
    fn allocate_id(&mut self) -> Result<String, StoreError> {
        self.last_id = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| StoreError::Malformed("server id counter exhausted".to_string()))?;
        Ok(format!("{ID_PREFIX}-{}", self.last_id))
    }

    fn has_task(&self, task_id: &TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == *task_id)
    }

    fn with_derived(&self, record: &TaskRecord) -> TaskRecord {
        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        let mut record = record.clone();
        record.comment_count = count(
            self.comments
                .iter()
                .filter(|c| c.task_id == record.id)
                .count(),
        );
        record.file_count = count(self.files.iter().filter(|f| f.task_id == record.id).count());
        record.assignees = self
            .assignments
            .iter()
            .filter(|a| a.task_id == record.id)
            .map(|a| a.user_id.clone())
            .collect();
        record
    }

    /// Profile for a user id, or an id-only reference if no profile exists.
    #[must_use]
    pub fn user(&self, user_id: &UserId) -> UserRef {
        self.users
            .iter()
            .find(|u| u.id == *user_id)
            .cloned()
            .unwrap_or_else(|| UserRef::anonymous(user_id.clone()))
    }

    /// Tasks of the filtered project in insertion order, with derived columns.
    #[must_use]
    pub fn tasks_matching(&self, filter: &TaskFilter) -> Vec<TaskRecord> {
        self.tasks
            .iter()
            .filter(|t| t.project_id == filter.project_id)
            .map(|t| self.with_derived(t))
            .collect()
    }

    /// One task with derived columns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub fn task(&self, task_id: &TaskId) -> Result<TaskRecord, StoreError> {
        self.tasks
            .iter()
            .find(|t| t.id == *task_id)
            .map(|t| self.with_derived(t))
            .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))
    }

    /// Overwrites a task's status column.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub fn set_status(&mut self, task_id: &TaskId, status: TaskStatus) -> Result<(), StoreError> {
        let row = self
            .tasks
            .iter_mut()
            .find(|t| t.id == *task_id)
            .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))?;
        row.status = status.as_str().to_string();
        Ok(())
    }

    /// Inserts a task row under a fresh server id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the id counter is exhausted.
    pub fn insert_task(&mut self, draft: &TaskDraft) -> Result<TaskRecord, StoreError> {
        let id = TaskId::new(self.allocate_id()?);
        let record = draft.clone().into_record(id);
        self.tasks.push(record.clone());
        Ok(record)
    }

    /// Appends a raw row as-is (seeding; may hold malformed values).
    pub fn push_raw(&mut self, record: TaskRecord) {
        self.tasks.push(record);
    }

    /// A task's comments, newest first.
    #[must_use]
    pub fn comments_for(&self, task_id: &TaskId) -> Vec<Comment> {
        // Reverse insertion order first so equal timestamps list the later row first.
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .rev()
            .filter(|c| c.task_id == *task_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }

    /// Inserts a comment row with a server id and the given timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the task does not exist, or
    /// [`StoreError::Malformed`] if the id counter is exhausted.
    pub fn insert_comment(
        &mut self,
        task_id: &TaskId,
        author_id: &UserId,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Comment, StoreError> {
        if !self.has_task(task_id) {
            return Err(StoreError::NotFound(format!("task {task_id}")));
        }
        let comment = Comment {
            id: CommentId::new(self.allocate_id()?),
            task_id: task_id.clone(),
            author: self.user(author_id),
            content: content.to_string(),
            created_at,
        };
        self.comments.push(comment.clone());
        Ok(comment)
    }

    /// A task's files, newest first.
    #[must_use]
    pub fn files_for(&self, task_id: &TaskId) -> Vec<TaskFile> {
        let mut files: Vec<TaskFile> = self
            .files
            .iter()
            .rev()
            .filter(|f| f.task_id == *task_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        files
    }

    /// Records an uploaded file's metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the task does not exist, or
    /// [`StoreError::Malformed`] if the id counter is exhausted.
    pub fn attach_file(
        &mut self,
        task_id: &TaskId,
        file_name: &str,
        file_url: &str,
        uploaded_by: &UserId,
        uploaded_at: DateTime<Utc>,
    ) -> Result<TaskFile, StoreError> {
        if !self.has_task(task_id) {
            return Err(StoreError::NotFound(format!("task {task_id}")));
        }
        let file = TaskFile {
            id: FileId::new(self.allocate_id()?),
            task_id: task_id.clone(),
            file_name: file_name.to_string(),
            file_url: file_url.to_string(),
            uploaded_by: self.user(uploaded_by),
            uploaded_at,
        };
        self.files.push(file.clone());
        Ok(file)
    }

    /// Profiles of the users assigned to a task.
    #[must_use]
    pub fn assignees_for(&self, task_id: &TaskId) -> Vec<UserRef> {
        self.assignments
            .iter()
            .filter(|a| a.task_id == *task_id)
            .map(|a| self.user(&a.user_id))
            .collect()
    }

    /// Assigns a user to a task; assigning twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the task does not exist.
    pub fn assign(&mut self, task_id: &TaskId, user_id: &UserId) -> Result<(), StoreError> {
        if !self.has_task(task_id) {
            return Err(StoreError::NotFound(format!("task {task_id}")));
        }
        let row = Assignment {
            task_id: task_id.clone(),
            user_id: user_id.clone(),
        };
        if !self.assignments.contains(&row) {
            self.assignments.push(row);
        }
        Ok(())
    }

    /// Inserts or replaces a user profile.
    pub fn upsert_user(&mut self, user: UserRef) {
        if let Some(existing) = self.users.iter_mut().find(|u| u.id == user.id) {
            *existing = user;
        } else {
            self.users.push(user);
        }
    }
}
