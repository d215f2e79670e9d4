//! Task mutation coordinator.
//!
//! Contains the [`TaskCoordinator`] which owns the local [`Board`] and the
//! per-task comment lists, and keeps them in sync with a [`RemoteStore`].
//!
//! Moves are optimistic: the board changes before the remote write and the
//! mutation is then either confirmed or rolled back by refetching the
//! board from the store. Creates and comments wait for the store, because
//! the store assigns their ids and timestamps.
//!
//! Every mutation goes through `Applied -> Confirmed | RolledBack`; the
//! view follows along through [`BoardEvent`]s.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use taskboard_proto::{
    Comment, MAX_TASK_TITLE_LENGTH, NewTask, ProjectId, RecordError, Task, TaskDraft, TaskId,
    TaskStatus, UserId,
};

use crate::board::{Board, BoardError, LoadIssue, LoadReport, MoveOutcome};
use crate::comments::CommentList;
use crate::detail::TaskDetail;
use crate::store::{RemoteStore, StoreError, StoreOp, TaskFilter, with_timeout};

/// Default bound on every remote call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Input rejected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The task title is blank after trimming.
    #[error("task title is required")]
    EmptyTitle,

    /// The task title is longer than allowed.
    #[error("task title is too long: {len} characters (max {max})")]
    TitleTooLong {
        /// Title length in characters.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// The comment is blank after trimming.
    #[error("comment cannot be empty")]
    EmptyComment,
}

/// Errors returned by [`TaskCoordinator`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    /// Input was rejected locally; the store was not called.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A write was rejected, failed or timed out.
    #[error("{op} failed: {source}")]
    RemoteWrite {
        /// The store operation that failed.
        op: StoreOp,
        /// Whether an optimistic change was undone.
        rolled_back: bool,
        /// The store's error.
        #[source]
        source: StoreError,
    },

    /// A read failed or timed out.
    #[error("{op} failed: {source}")]
    RemoteRead {
        /// The store operation that failed.
        op: StoreOp,
        /// The store's error.
        #[source]
        source: StoreError,
    },

    /// The store returned a row this client cannot represent.
    #[error(transparent)]
    InvalidRecord(#[from] RecordError),

    /// The local board refused the change.
    #[error(transparent)]
    Board(#[from] BoardError),
}

impl CoordinatorError {
    /// A short message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(ValidationError::EmptyTitle) => "Please enter a task title.".into(),
            Self::Validation(ValidationError::TitleTooLong { max, .. }) => {
                format!("Task titles can be at most {max} characters.")
            }
            Self::Validation(ValidationError::EmptyComment) => {
                "Please enter a comment before posting.".into()
            }
            Self::RemoteWrite {
                op: StoreOp::UpdateTaskStatus,
                rolled_back: true,
                ..
            } => "Could not move the task. The board has been restored.".into(),
            Self::RemoteWrite {
                op: StoreOp::UpdateTaskStatus,
                ..
            } => "Could not move the task.".into(),
            Self::RemoteWrite {
                op: StoreOp::InsertTask,
                ..
            } => "Could not create the task. Please try again.".into(),
            Self::RemoteWrite {
                op: StoreOp::InsertComment,
                ..
            } => "Could not post the comment. Please try again.".into(),
            Self::RemoteWrite { .. } => "Could not save the change. Please try again.".into(),
            Self::RemoteRead { .. } => "Could not load data from the server.".into(),
            Self::InvalidRecord(e) => format!("The server sent an unreadable task ({e})."),
            Self::Board(BoardError::TaskNotFound { .. }) => {
                "That task is no longer in that column.".into()
            }
            Self::Board(BoardError::DuplicateTask(_)) => {
                "That task is already on the board.".into()
            }
        }
    }
}

/// Tunables for a [`TaskCoordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Bound on every remote call; an elapsed call counts as failed.
    pub remote_timeout: Duration,
    /// Capacity of the [`BoardEvent`] channel.
    pub event_buffer: usize,
    /// Maximum task title length in characters.
    pub max_title_len: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            event_buffer: DEFAULT_EVENT_BUFFER,
            max_title_len: MAX_TASK_TITLE_LENGTH,
        }
    }
}

/// Identifies one mutation for event correlation (UUID v7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationId(Uuid);

impl MutationId {
    /// Creates a new time-ordered mutation identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MutationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a mutation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Change a task's column and position.
    MoveTask,
    /// Add a task.
    CreateTask,
    /// Add a comment to a task.
    PostComment,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MoveTask => "move_task",
            Self::CreateTask => "create_task",
            Self::PostComment => "post_comment",
        })
    }
}

/// Lifecycle of one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Applied locally; the remote write is in flight.
    Applied,
    /// The store accepted the write.
    Confirmed,
    /// The write failed and the board was resynced.
    RolledBack,
}

/// Events emitted by the [`TaskCoordinator`] for the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// The board was rebuilt from a fresh fetch.
    BoardReloaded {
        /// Tasks now on the board.
        tasks: usize,
        /// Rows dropped as unreadable.
        dropped: usize,
    },
    /// An optimistic change is visible locally.
    MutationApplied {
        /// The mutation.
        mutation_id: MutationId,
        /// What it does.
        kind: MutationKind,
        /// The task it touches.
        task_id: TaskId,
    },
    /// A mutation reached its final state.
    MutationSettled {
        /// The mutation.
        mutation_id: MutationId,
        /// What it does.
        kind: MutationKind,
        /// The task it touched (the server id for creates).
        task_id: TaskId,
        /// [`MutationState::Confirmed`] or [`MutationState::RolledBack`].
        state: MutationState,
    },
    /// A non-fatal message for the user.
    Notice(String),
}

/// Keeps the local board and comment lists in sync with the store.
///
/// All operations take `&self`. Local state sits behind short-lived
/// `parking_lot` locks that are never held across an `.await`, so a
/// second operation always sees the local effect of the first even while
/// the first is still waiting on the store.
pub struct TaskCoordinator<S: RemoteStore> {
    /// The remote store.
    store: S,
    /// Project whose tasks are on the board.
    project_id: ProjectId,
    /// Session user, used as task creator and comment author.
    user_id: UserId,
    /// Local projection of the project's tasks.
    board: RwLock<Board>,
    /// Comment lists of tasks opened (or commented on) in this session.
    comments: RwLock<HashMap<TaskId, CommentList>>,
    /// Channel for emitting events to the view.
    event_tx: mpsc::Sender<BoardEvent>,
    /// Tunables.
    config: CoordinatorConfig,
}

impl<S: RemoteStore> TaskCoordinator<S> {
    /// Creates a coordinator with an empty board.
    ///
    /// Returns the coordinator and a receiver for [`BoardEvent`]s that the
    /// view should consume. Call [`refresh`](Self::refresh) to load the
    /// board.
    pub fn new(
        store: S,
        project_id: ProjectId,
        user_id: UserId,
        config: CoordinatorConfig,
    ) -> (Self, mpsc::Receiver<BoardEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        let coordinator = Self {
            store,
            project_id,
            user_id,
            board: RwLock::new(Board::new()),
            comments: RwLock::new(HashMap::new()),
            event_tx,
            config,
        };
        (coordinator, event_rx)
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The project on the board.
    pub const fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// The session user.
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// A snapshot of the board.
    pub fn board(&self) -> Board {
        self.board.read().clone()
    }

    /// A snapshot of a task's comment list, if it has been loaded.
    pub fn comments(&self, task_id: &TaskId) -> Option<CommentList> {
        self.comments.read().get(task_id).cloned()
    }

    /// Fetches the project's tasks and rebuilds the board.
    ///
    /// Unreadable rows are dropped, logged, and returned.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::RemoteRead`] if the fetch fails; the
    /// board is left as it was.
    pub async fn refresh(&self) -> Result<Vec<LoadIssue>, CoordinatorError> {
        let filter = TaskFilter::project(self.project_id.clone());
        let records = self
            .remote(StoreOp::FetchTasks, self.store.fetch_tasks(&filter))
            .await
            .map_err(|source| CoordinatorError::RemoteRead {
                op: StoreOp::FetchTasks,
                source,
            })?;

        let LoadReport { board, dropped } = Board::load(records);
        for issue in &dropped {
            tracing::warn!(error = %issue, "dropping task row");
        }
        let tasks = board.total_tasks();
        *self.board.write() = board;

        tracing::debug!(
            project = %self.project_id,
            tasks,
            dropped = dropped.len(),
            "board reloaded"
        );
        self.emit(BoardEvent::BoardReloaded {
            tasks,
            dropped: dropped.len(),
        });
        Ok(dropped)
    }

    /// Moves a task optimistically and writes its new status.
    ///
    /// The board changes immediately. If the store write fails or times
    /// out, the board is rebuilt from a fresh fetch; if that fetch fails
    /// too, the move is reverted locally. A move that changes nothing
    /// never reaches the store.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Board`] if the task is not in `from`
    /// (nothing changes), or [`CoordinatorError::RemoteWrite`] with
    /// `rolled_back: true` if the write failed.
    pub async fn move_task(
        &self,
        task_id: &TaskId,
        from: TaskStatus,
        to: TaskStatus,
        destination_index: usize,
    ) -> Result<MutationState, CoordinatorError> {
        let outcome = self
            .board
            .write()
            .move_task(task_id, from, to, destination_index)?;
        let MoveOutcome::Moved { from_index, .. } = outcome else {
            tracing::debug!(task_id = %task_id, "move leaves task in place");
            return Ok(MutationState::Confirmed);
        };

        let mutation_id = MutationId::new();
        self.emit(BoardEvent::MutationApplied {
            mutation_id,
            kind: MutationKind::MoveTask,
            task_id: task_id.clone(),
        });

        let result = self
            .remote(
                StoreOp::UpdateTaskStatus,
                self.store.update_task_status(task_id, to),
            )
            .await;

        match result {
            Ok(()) => {
                tracing::info!(task_id = %task_id, from = %from, to = %to, "move confirmed");
                self.settle(
                    mutation_id,
                    MutationKind::MoveTask,
                    task_id,
                    MutationState::Confirmed,
                );
                Ok(MutationState::Confirmed)
            }
            Err(source) => {
                tracing::warn!(task_id = %task_id, error = %source, "move failed, rolling back");
                self.roll_back_move(task_id, from, from_index, to).await;
                self.settle(
                    mutation_id,
                    MutationKind::MoveTask,
                    task_id,
                    MutationState::RolledBack,
                );
                let err = CoordinatorError::RemoteWrite {
                    op: StoreOp::UpdateTaskStatus,
                    rolled_back: true,
                    source,
                };
                self.emit(BoardEvent::Notice(err.user_message()));
                Err(err)
            }
        }
    }

    /// Validates and creates a task, then adds the stored task to the board.
    ///
    /// The title is trimmed and must be non-empty and within the
    /// configured maximum. The task lands at the tail of its column with
    /// the id the store assigned.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Validation`] without calling the store,
    /// or [`CoordinatorError::RemoteWrite`] if the insert fails (the board
    /// is unchanged).
    pub async fn create_task(&self, new_task: NewTask) -> Result<Task, CoordinatorError> {
        let new_task = self.validate_new_task(new_task)?;
        let draft = TaskDraft::from_new(new_task, self.project_id.clone(), self.user_id.clone());

        let record = match self
            .remote(StoreOp::InsertTask, self.store.insert_task(&draft))
            .await
        {
            Ok(record) => record,
            Err(source) => {
                tracing::warn!(title = %draft.title, error = %source, "task creation failed");
                let err = CoordinatorError::RemoteWrite {
                    op: StoreOp::InsertTask,
                    rolled_back: false,
                    source,
                };
                self.emit(BoardEvent::Notice(err.user_message()));
                return Err(err);
            }
        };

        let task = match Task::try_from(record) {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(error = %e, "store returned an unreadable task row");
                let err = CoordinatorError::InvalidRecord(e);
                self.emit(BoardEvent::Notice(err.user_message()));
                return Err(err);
            }
        };
        match self.board.write().insert_task(task.clone()) {
            Ok(()) => {}
            Err(BoardError::DuplicateTask(id)) => {
                // A refresh that raced the insert already placed it.
                tracing::debug!(task_id = %id, "created task already on board");
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(task_id = %task.id, status = %task.status, "task created");
        self.settle(
            MutationId::new(),
            MutationKind::CreateTask,
            &task.id,
            MutationState::Confirmed,
        );
        Ok(task)
    }

    /// Posts a comment as the session user and prepends it to the task's
    /// comment list.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Validation`] for blank content without
    /// calling the store, or [`CoordinatorError::RemoteWrite`] if the
    /// insert fails (nothing changes locally).
    pub async fn post_comment(
        &self,
        task_id: &TaskId,
        content: &str,
    ) -> Result<Comment, CoordinatorError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }

        let comment = match self
            .remote(
                StoreOp::InsertComment,
                self.store.insert_comment(task_id, &self.user_id, content),
            )
            .await
        {
            Ok(comment) => comment,
            Err(source) => {
                tracing::warn!(task_id = %task_id, error = %source, "comment failed");
                let err = CoordinatorError::RemoteWrite {
                    op: StoreOp::InsertComment,
                    rolled_back: false,
                    source,
                };
                self.emit(BoardEvent::Notice(err.user_message()));
                return Err(err);
            }
        };

        let added = self
            .comments
            .write()
            .entry(task_id.clone())
            .or_default()
            .prepend(comment.clone());
        if added {
            self.board.write().record_comment(task_id);
        }

        tracing::info!(task_id = %task_id, comment_id = %comment.id, "comment posted");
        self.settle(
            MutationId::new(),
            MutationKind::PostComment,
            task_id,
            MutationState::Confirmed,
        );
        Ok(comment)
    }

    /// Loads a task's detail view and caches its comment list.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::RemoteRead`] if any fetch fails, or
    /// [`CoordinatorError::InvalidRecord`] if the task row is unreadable.
    pub async fn open_task(&self, task_id: &TaskId) -> Result<TaskDetail, CoordinatorError> {
        let detail = TaskDetail::fetch(&self.store, task_id, self.config.remote_timeout).await?;
        self.comments
            .write()
            .insert(task_id.clone(), detail.comments.clone());
        tracing::debug!(
            task_id = %task_id,
            comments = detail.comments.len(),
            files = detail.files.len(),
            "task opened"
        );
        Ok(detail)
    }

    fn validate_new_task(&self, mut new_task: NewTask) -> Result<NewTask, ValidationError> {
        let title = new_task.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let len = title.chars().count();
        let max = self.config.max_title_len;
        if len > max {
            return Err(ValidationError::TitleTooLong { len, max });
        }
        new_task.title = title.to_string();
        new_task.description = new_task
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(new_task)
    }

    /// Resyncs the board after a failed move.
    async fn roll_back_move(
        &self,
        task_id: &TaskId,
        from: TaskStatus,
        from_index: usize,
        to: TaskStatus,
    ) {
        let Err(e) = self.refresh().await else {
            return;
        };
        tracing::warn!(task_id = %task_id, error = %e, "refetch failed, reverting move locally");
        if let Err(e) = self.board.write().move_task(task_id, to, from, from_index) {
            tracing::warn!(task_id = %task_id, error = %e, "could not revert move");
        }
    }

    async fn remote<T>(
        &self,
        op: StoreOp,
        call: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        with_timeout(op, self.config.remote_timeout, call).await
    }

    fn settle(
        &self,
        mutation_id: MutationId,
        kind: MutationKind,
        task_id: &TaskId,
        state: MutationState,
    ) {
        self.emit(BoardEvent::MutationSettled {
            mutation_id,
            kind,
            task_id: task_id.clone(),
            state,
        });
    }

    fn emit(&self, event: BoardEvent) {
        let _ = self.event_tx.try_send(event);
    }
}
