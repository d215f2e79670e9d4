//! Record types shared by the taskboard client and its store adapters.

pub mod codec;
pub mod comment;
pub mod ids;
pub mod task;
pub mod user;

pub use comment::{Comment, DEFAULT_TIMESTAMP_FORMAT, TaskFile, is_valid_timestamp_format};
pub use ids::{CommentId, FileId, ProjectId, TaskId, UserId};
pub use task::{
    MAX_TASK_TITLE_LENGTH, NewTask, Priority, RecordError, Task, TaskDraft, TaskRecord,
    TaskStatus,
};
pub use user::UserRef;
