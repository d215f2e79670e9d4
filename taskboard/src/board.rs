//! Board state model.
//!
//! A [`Board`] is the client-side projection of one project's tasks,
//! partitioned into the three fixed status columns. It is rebuilt
//! wholesale from store rows by [`Board::load`] and changed incrementally
//! by [`Board::move_task`] and [`Board::insert_task`].
//!
//! # Invariants
//!
//! - Every task sits in exactly one column, the one matching its status.
//! - No task id appears twice.
//! - `move_task` never changes the total task count; `insert_task`
//!   raises it by exactly one.
//! - A failed operation leaves the board untouched.

use taskboard_proto::{RecordError, Task, TaskId, TaskRecord, TaskStatus};

/// Errors from board operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The task is not in the column it was expected in.
    #[error("task {task_id} is not in column '{column}'")]
    TaskNotFound {
        /// Requested task.
        task_id: TaskId,
        /// Column that was searched.
        column: TaskStatus,
    },

    /// A task with this id is already on the board.
    #[error("task {0} is already on the board")]
    DuplicateTask(TaskId),
}

/// A store row left out of the board during [`Board::load`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadIssue {
    /// The row's status or priority is outside the fixed enums.
    #[error(transparent)]
    Invalid(#[from] RecordError),

    /// The row repeats an id already placed on the board.
    #[error("task {0} appears more than once")]
    Duplicate(TaskId),
}

/// Result of building a board from store rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// The board built from every acceptable row.
    pub board: Board,
    /// Rows that were dropped, in input order.
    pub dropped: Vec<LoadIssue>,
}

/// What [`Board::move_task`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Same column, same position: nothing changed.
    Unchanged,
    /// The task moved; `from_index` is where it used to be.
    Moved {
        /// Position in the source column before the move.
        from_index: usize,
        /// Position in the destination column after the move.
        to_index: usize,
    },
}

/// An ordered bucket of tasks sharing one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    status: TaskStatus,
    tasks: Vec<Task>,
}

impl Column {
    const fn new(status: TaskStatus) -> Self {
        Self {
            status,
            tasks: Vec::new(),
        }
    }

    /// The status every task in this column has.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Tasks in display order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Task ids in display order.
    #[must_use]
    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }

    /// Number of tasks in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the column holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Position of a task within the column.
    #[must_use]
    pub fn position(&self, task_id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == *task_id)
    }
}

/// All columns of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    columns: [Column; 3],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// An empty board with the three fixed columns.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: [
                Column::new(TaskStatus::ToDo),
                Column::new(TaskStatus::InProgress),
                Column::new(TaskStatus::Done),
            ],
        }
    }

    /// Builds a board from raw store rows.
    ///
    /// Rows keep their input order within a column. Rows with an invalid
    /// status or priority, and repeats of an id already placed, are
    /// dropped and listed in [`LoadReport::dropped`]; loading always
    /// continues with the remaining rows.
    pub fn load(records: impl IntoIterator<Item = TaskRecord>) -> LoadReport {
        let mut board = Self::new();
        let mut dropped = Vec::new();
        for record in records {
            match Task::try_from(record) {
                Ok(task) => {
                    if let Err(BoardError::DuplicateTask(id)) = board.insert_task(task) {
                        dropped.push(LoadIssue::Duplicate(id));
                    }
                }
                Err(e) => dropped.push(LoadIssue::Invalid(e)),
            }
        }
        LoadReport { board, dropped }
    }

    /// Builds a board from already-validated tasks.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> LoadReport {
        Self::load(tasks.into_iter().map(TaskRecord::from))
    }

    /// Columns in board order (To Do, In Progress, Done).
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The column for one status.
    #[must_use]
    pub const fn column(&self, status: TaskStatus) -> &Column {
        &self.columns[status.index()]
    }

    /// Total number of tasks across all columns.
    #[must_use]
    pub fn total_tasks(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }

    /// Column and position of a task, if it is on the board.
    #[must_use]
    pub fn find(&self, task_id: &TaskId) -> Option<(TaskStatus, usize)> {
        self.columns
            .iter()
            .find_map(|c| c.position(task_id).map(|i| (c.status, i)))
    }

    /// A task by id.
    #[must_use]
    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        let (status, index) = self.find(task_id)?;
        self.column(status).tasks.get(index)
    }

    /// Moves a task between (or within) columns with splice semantics.
    ///
    /// The task is removed from `from`, then inserted into `to` at
    /// `destination_index` counted in the destination after removal. An
    /// index past the end appends. The task's status becomes `to`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::TaskNotFound`] if the task is not in `from`.
    /// The board is unchanged in that case.
    pub fn move_task(
        &mut self,
        task_id: &TaskId,
        from: TaskStatus,
        to: TaskStatus,
        destination_index: usize,
    ) -> Result<MoveOutcome, BoardError> {
        let from_index = self.columns[from.index()].position(task_id).ok_or_else(|| {
            BoardError::TaskNotFound {
                task_id: task_id.clone(),
                column: from,
            }
        })?;

        let dest_len_after_removal = if from == to {
            self.columns[to.index()].len() - 1
        } else {
            self.columns[to.index()].len()
        };
        let to_index = destination_index.min(dest_len_after_removal);
        if from == to && to_index == from_index {
            return Ok(MoveOutcome::Unchanged);
        }

        let mut task = self.columns[from.index()].tasks.remove(from_index);
        task.status = to;
        self.columns[to.index()].tasks.insert(to_index, task);
        Ok(MoveOutcome::Moved {
            from_index,
            to_index,
        })
    }

    /// Appends a task to the tail of the column matching its status.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::DuplicateTask`] if the id is already present.
    pub fn insert_task(&mut self, task: Task) -> Result<(), BoardError> {
        if self.find(&task.id).is_some() {
            return Err(BoardError::DuplicateTask(task.id));
        }
        self.columns[task.status.index()].tasks.push(task);
        Ok(())
    }

    /// Bumps a card's derived comment count after a confirmed comment.
    ///
    /// Returns `false` if the task is not on the board.
    pub fn record_comment(&mut self, task_id: &TaskId) -> bool {
        let Some((status, index)) = self.find(task_id) else {
            return false;
        };
        let task = &mut self.columns[status.index()].tasks[index];
        task.comment_count = task.comment_count.saturating_add(1);
        true
    }
}
