//! Integration tests for board synchronization against a remote store.
//!
//! Covers the end-to-end flows: confirmed move, failed move resynced from
//! the store, empty comment rejected locally, task creation with a server
//! id, and rollback converging to whatever the store holds.
//!
//! Verification command: `cargo test --test board_sync`

use taskboard::board::Board;
use taskboard::coordinator::{
    BoardEvent, CoordinatorConfig, CoordinatorError, MutationState, TaskCoordinator,
    ValidationError,
};
use taskboard::store::memory::InMemoryStore;
use taskboard::store::{RemoteStore, StoreOp, TaskFilter};
use taskboard_proto::{NewTask, ProjectId, TaskDraft, TaskId, TaskRecord, TaskStatus, UserId};
use tokio::sync::mpsc;

// =============================================================================
// Test helpers
// =============================================================================

fn project() -> ProjectId {
    ProjectId::new("Project LSBU")
}

fn me() -> UserId {
    UserId::new("u-1")
}

fn row(id: &str, status: TaskStatus) -> TaskRecord {
    TaskRecord::new(id, format!("Task {id}"), status, project(), me())
}

/// Store holding `ToDo=[T1,T2]`, `InProgress=[T3]`, `Done=[]`.
fn seeded_store() -> InMemoryStore {
    InMemoryStore::new()
        .with_task(row("T1", TaskStatus::ToDo))
        .with_task(row("T2", TaskStatus::ToDo))
        .with_task(row("T3", TaskStatus::InProgress))
}

async fn loaded(
    store: InMemoryStore,
) -> (TaskCoordinator<InMemoryStore>, mpsc::Receiver<BoardEvent>) {
    let (coordinator, events) =
        TaskCoordinator::new(store, project(), me(), CoordinatorConfig::default());
    coordinator.refresh().await.unwrap();
    (coordinator, events)
}

fn ids(board: &Board, status: TaskStatus) -> Vec<String> {
    board
        .column(status)
        .ids()
        .into_iter()
        .map(|id| id.to_string())
        .collect()
}

/// The board a fresh client would build from the store right now.
async fn server_truth(store: &InMemoryStore) -> Board {
    let rows = store
        .fetch_tasks(&TaskFilter::project(project()))
        .await
        .unwrap();
    Board::load(rows).board
}

// =============================================================================
// Moves
// =============================================================================

#[tokio::test]
async fn confirmed_move_updates_board_and_store() {
    let (coordinator, _events) = loaded(seeded_store()).await;

    let state = coordinator
        .move_task(&TaskId::new("T1"), TaskStatus::ToDo, TaskStatus::InProgress, 0)
        .await
        .unwrap();

    assert_eq!(state, MutationState::Confirmed);
    let board = coordinator.board();
    assert_eq!(ids(&board, TaskStatus::ToDo), vec!["T2"]);
    assert_eq!(ids(&board, TaskStatus::InProgress), vec!["T1", "T3"]);
    assert!(board.column(TaskStatus::Done).is_empty());

    let stored = coordinator.store().fetch_task(&TaskId::new("T1")).await.unwrap();
    assert_eq!(stored.status, "In Progress");
}

#[tokio::test]
async fn failed_move_is_resynced_from_store() {
    let (coordinator, _events) = loaded(seeded_store()).await;
    coordinator.store().fail(StoreOp::UpdateTaskStatus);

    let err = coordinator
        .move_task(&TaskId::new("T1"), TaskStatus::ToDo, TaskStatus::InProgress, 0)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoordinatorError::RemoteWrite {
            op: StoreOp::UpdateTaskStatus,
            rolled_back: true,
            ..
        }
    ));
    assert!(!err.user_message().is_empty());

    let board = coordinator.board();
    assert_eq!(ids(&board, TaskStatus::ToDo), vec!["T1", "T2"]);
    assert_eq!(ids(&board, TaskStatus::InProgress), vec!["T3"]);
    assert_eq!(board, server_truth(coordinator.store()).await);
    assert_eq!(coordinator.store().call_count(StoreOp::FetchTasks), 2);
}

#[tokio::test]
async fn two_task_board_move_confirmed() {
    let store = InMemoryStore::new()
        .with_task(row("T1", TaskStatus::ToDo))
        .with_task(row("T2", TaskStatus::ToDo));
    let (coordinator, _events) = loaded(store).await;

    let state = coordinator
        .move_task(&TaskId::new("T1"), TaskStatus::ToDo, TaskStatus::InProgress, 0)
        .await
        .unwrap();

    assert_eq!(state, MutationState::Confirmed);
    let board = coordinator.board();
    assert_eq!(ids(&board, TaskStatus::ToDo), vec!["T2"]);
    assert_eq!(ids(&board, TaskStatus::InProgress), vec!["T1"]);
}

#[tokio::test]
async fn two_task_board_move_failed() {
    let store = InMemoryStore::new()
        .with_task(row("T1", TaskStatus::ToDo))
        .with_task(row("T2", TaskStatus::ToDo));
    store.fail(StoreOp::UpdateTaskStatus);
    let (coordinator, _events) = loaded(store).await;

    let result = coordinator
        .move_task(&TaskId::new("T1"), TaskStatus::ToDo, TaskStatus::InProgress, 0)
        .await;

    assert!(result.is_err());
    let board = coordinator.board();
    assert_eq!(ids(&board, TaskStatus::ToDo), vec!["T1", "T2"]);
    assert!(board.column(TaskStatus::InProgress).is_empty());
    assert_eq!(board, server_truth(coordinator.store()).await);
}

#[tokio::test]
async fn rollback_converges_to_server_truth() {
    let (coordinator, _events) = loaded(seeded_store()).await;

    // Another client changes the store after our load.
    let store = coordinator.store();
    store
        .set_status_externally(&TaskId::new("T3"), TaskStatus::Done)
        .await
        .unwrap();
    store
        .insert_externally(&TaskDraft::from_new(
            NewTask::new("From elsewhere"),
            project(),
            UserId::new("u-2"),
        ))
        .await
        .unwrap();
    store.fail(StoreOp::UpdateTaskStatus);

    let result = coordinator
        .move_task(&TaskId::new("T2"), TaskStatus::ToDo, TaskStatus::Done, 0)
        .await;
    assert!(result.is_err());

    let board = coordinator.board();
    assert_eq!(board, server_truth(store).await);
    assert_eq!(ids(&board, TaskStatus::Done), vec!["T3"]);
    assert_eq!(board.total_tasks(), 4);
}

#[tokio::test]
async fn move_conserves_task_count() {
    let (coordinator, _events) = loaded(seeded_store()).await;
    let total = coordinator.board().total_tasks();

    coordinator
        .move_task(&TaskId::new("T3"), TaskStatus::InProgress, TaskStatus::Done, 5)
        .await
        .unwrap();
    coordinator
        .move_task(&TaskId::new("T2"), TaskStatus::ToDo, TaskStatus::ToDo, 0)
        .await
        .unwrap();

    let board = coordinator.board();
    assert_eq!(board.total_tasks(), total);
    assert_eq!(ids(&board, TaskStatus::ToDo), vec!["T2", "T1"]);
    assert_eq!(ids(&board, TaskStatus::Done), vec!["T3"]);
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn created_task_lands_at_tail_with_server_id() {
    let (coordinator, _events) = loaded(seeded_store().with_next_id(42)).await;

    let task = coordinator
        .create_task(NewTask::new("Fix bug"))
        .await
        .unwrap();

    assert_eq!(task.id.as_str(), "srv-42");
    assert_eq!(task.status, TaskStatus::ToDo);
    let board = coordinator.board();
    assert_eq!(ids(&board, TaskStatus::ToDo), vec!["T1", "T2", "srv-42"]);
    assert_eq!(board.total_tasks(), 4);

    let stored = coordinator.store().fetch_task(&task.id).await.unwrap();
    assert_eq!(stored.title, "Fix bug");
    assert_eq!(stored.created_by, me());
}

#[tokio::test]
async fn created_task_respects_requested_column() {
    let (coordinator, _events) = loaded(seeded_store()).await;

    let task = coordinator
        .create_task(NewTask::new("Already done").with_status(TaskStatus::Done))
        .await
        .unwrap();

    assert_eq!(ids(&coordinator.board(), TaskStatus::Done), vec![task.id.to_string()]);
}

#[tokio::test]
async fn whitespace_title_short_circuits() {
    let (coordinator, _events) = loaded(seeded_store()).await;
    let before = coordinator.board();

    let err = coordinator
        .create_task(NewTask::new(" \t "))
        .await
        .unwrap_err();

    assert_eq!(err, CoordinatorError::Validation(ValidationError::EmptyTitle));
    assert_eq!(coordinator.store().call_count(StoreOp::InsertTask), 0);
    assert_eq!(coordinator.board(), before);
}

// =============================================================================
// Comments
// =============================================================================

#[tokio::test]
async fn empty_comment_is_rejected_without_remote_call() {
    let (coordinator, _events) = loaded(seeded_store()).await;
    let task_id = TaskId::new("T1");
    coordinator.open_task(&task_id).await.unwrap();
    let before = coordinator.comments(&task_id).unwrap();

    let err = coordinator.post_comment(&task_id, "").await.unwrap_err();

    assert_eq!(err, CoordinatorError::Validation(ValidationError::EmptyComment));
    assert_eq!(coordinator.store().call_count(StoreOp::InsertComment), 0);
    assert_eq!(coordinator.comments(&task_id).unwrap(), before);
}

#[tokio::test]
async fn posted_comment_appears_first_and_is_stored() {
    let (coordinator, _events) = loaded(seeded_store()).await;
    let task_id = TaskId::new("T2");
    coordinator.post_comment(&task_id, "older").await.unwrap();
    coordinator.open_task(&task_id).await.unwrap();

    let newest = coordinator.post_comment(&task_id, "newer").await.unwrap();

    let list = coordinator.comments(&task_id).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list.first(), Some(&newest));

    let detail = coordinator.open_task(&task_id).await.unwrap();
    assert_eq!(detail.comments.first().map(|c| c.id.clone()), Some(newest.id));
    assert_eq!(detail.task.comment_count, 2);
}
