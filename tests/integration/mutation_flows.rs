//! Integration tests for concurrent and slow mutations.
//!
//! Tests that local changes are visible before the store answers, that
//! confirmations may arrive out of order, that every remote call is
//! bounded by the configured timeout, and the event stream the view
//! consumes.
//!
//! Verification command: `cargo test --test mutation_flows`

use std::time::Duration;

use taskboard::coordinator::{
    BoardEvent, CoordinatorConfig, CoordinatorError, MutationKind, MutationState,
    TaskCoordinator,
};
use taskboard::store::memory::InMemoryStore;
use taskboard::store::{RemoteStore, StoreError, StoreOp};
use taskboard_proto::{NewTask, ProjectId, TaskId, TaskRecord, TaskStatus, UserId};
use tokio::sync::mpsc;

// =============================================================================
// Test helpers
// =============================================================================

fn project() -> ProjectId {
    ProjectId::new("p-1")
}

fn row(id: &str, status: TaskStatus) -> TaskRecord {
    TaskRecord::new(id, format!("Task {id}"), status, project(), UserId::new("u-1"))
}

fn seeded_store() -> InMemoryStore {
    InMemoryStore::new()
        .with_task(row("T1", TaskStatus::ToDo))
        .with_task(row("T2", TaskStatus::ToDo))
        .with_task(row("T3", TaskStatus::InProgress))
}

async fn loaded_with(
    store: InMemoryStore,
    config: CoordinatorConfig,
) -> (TaskCoordinator<InMemoryStore>, mpsc::Receiver<BoardEvent>) {
    let (coordinator, mut events) =
        TaskCoordinator::new(store, project(), UserId::new("u-1"), config);
    coordinator.refresh().await.unwrap();
    assert!(matches!(
        events.try_recv(),
        Ok(BoardEvent::BoardReloaded { tasks: 3, dropped: 0 })
    ));
    (coordinator, events)
}

fn short_timeout() -> CoordinatorConfig {
    CoordinatorConfig {
        remote_timeout: Duration::from_millis(50),
        ..CoordinatorConfig::default()
    }
}

fn drain(events: &mut mpsc::Receiver<BoardEvent>) -> Vec<BoardEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn status_of(coordinator: &TaskCoordinator<InMemoryStore>, id: &str) -> Option<TaskStatus> {
    coordinator
        .board()
        .find(&TaskId::new(id))
        .map(|(status, _)| status)
}

// =============================================================================
// Optimistic visibility and ordering
// =============================================================================

#[tokio::test]
async fn local_move_is_visible_before_confirmation() {
    let store = seeded_store();
    store.set_status_latency(TaskId::new("T1"), Duration::from_millis(100));
    let (coordinator, _events) = loaded_with(store, CoordinatorConfig::default()).await;

    let t1 = TaskId::new("T1");
    let slow_move = coordinator.move_task(&t1, TaskStatus::ToDo, TaskStatus::Done, 0);
    let observer = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let local = status_of(&coordinator, "T1");
        let remote = coordinator
            .store()
            .fetch_task(&TaskId::new("T1"))
            .await
            .unwrap()
            .status;
        (local, remote)
    };

    let (result, (local, remote)) = tokio::join!(slow_move, observer);
    assert_eq!(result.unwrap(), MutationState::Confirmed);
    assert_eq!(local, Some(TaskStatus::Done));
    assert_eq!(remote, "To Do");
    assert_eq!(status_of(&coordinator, "T1"), Some(TaskStatus::Done));
}

#[tokio::test]
async fn second_gesture_sees_first_local_move() {
    let store = seeded_store();
    store.set_status_latency(TaskId::new("T1"), Duration::from_millis(60));
    let (coordinator, _events) = loaded_with(store, CoordinatorConfig::default()).await;
    let t1 = TaskId::new("T1");

    // The second move names the column the first move put T1 in; it only
    // succeeds if the first move's local change is already applied.
    let first = coordinator.move_task(&t1, TaskStatus::ToDo, TaskStatus::InProgress, 0);
    let second = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        coordinator
            .move_task(&t1, TaskStatus::InProgress, TaskStatus::Done, 0)
            .await
    };

    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap(), MutationState::Confirmed);
    assert_eq!(second.unwrap(), MutationState::Confirmed);
    assert_eq!(status_of(&coordinator, "T1"), Some(TaskStatus::Done));
}

#[tokio::test]
async fn confirmations_may_arrive_out_of_order() {
    let store = seeded_store();
    store.set_status_latency(TaskId::new("T1"), Duration::from_millis(80));
    let (coordinator, mut events) = loaded_with(store, CoordinatorConfig::default()).await;

    let t1 = TaskId::new("T1");
    let t2 = TaskId::new("T2");
    let (a, b) = tokio::join!(
        coordinator.move_task(&t1, TaskStatus::ToDo, TaskStatus::Done, 0),
        coordinator.move_task(&t2, TaskStatus::ToDo, TaskStatus::Done, 0),
    );
    assert_eq!(a.unwrap(), MutationState::Confirmed);
    assert_eq!(b.unwrap(), MutationState::Confirmed);

    let settled: Vec<TaskId> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            BoardEvent::MutationSettled { task_id, .. } => Some(task_id),
            _ => None,
        })
        .collect();
    assert_eq!(settled, vec![TaskId::new("T2"), TaskId::new("T1")]);

    let board = coordinator.board();
    assert_eq!(board.column(TaskStatus::Done).ids(), vec![TaskId::new("T2"), TaskId::new("T1")]);
    assert!(board.column(TaskStatus::ToDo).is_empty());
}

#[tokio::test]
async fn failure_of_one_move_resyncs_without_losing_confirmed_one() {
    let store = seeded_store();
    let (coordinator, _events) = loaded_with(store, CoordinatorConfig::default()).await;

    coordinator
        .move_task(&TaskId::new("T3"), TaskStatus::InProgress, TaskStatus::Done, 0)
        .await
        .unwrap();
    coordinator.store().fail_next(StoreOp::UpdateTaskStatus);
    let failed = coordinator
        .move_task(&TaskId::new("T1"), TaskStatus::ToDo, TaskStatus::InProgress, 0)
        .await;

    assert!(failed.is_err());
    assert_eq!(status_of(&coordinator, "T3"), Some(TaskStatus::Done));
    assert_eq!(status_of(&coordinator, "T1"), Some(TaskStatus::ToDo));
}

// =============================================================================
// Timeouts
// =============================================================================

#[tokio::test]
async fn move_timeout_counts_as_failure() {
    let store = seeded_store();
    store.set_latency(StoreOp::UpdateTaskStatus, Duration::from_secs(5));
    let (coordinator, _events) = loaded_with(store, short_timeout()).await;

    let err = coordinator
        .move_task(&TaskId::new("T2"), TaskStatus::ToDo, TaskStatus::Done, 0)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CoordinatorError::RemoteWrite {
            op: StoreOp::UpdateTaskStatus,
            rolled_back: true,
            source: StoreError::Timeout(StoreOp::UpdateTaskStatus),
        }
    );
    assert_eq!(status_of(&coordinator, "T2"), Some(TaskStatus::ToDo));
}

#[tokio::test]
async fn create_timeout_changes_nothing() {
    let store = seeded_store();
    store.set_latency(StoreOp::InsertTask, Duration::from_secs(5));
    let (coordinator, _events) = loaded_with(store, short_timeout()).await;
    let before = coordinator.board();

    let err = coordinator
        .create_task(NewTask::new("Too slow"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoordinatorError::RemoteWrite {
            source: StoreError::Timeout(StoreOp::InsertTask),
            rolled_back: false,
            ..
        }
    ));
    assert_eq!(coordinator.board(), before);
}

#[tokio::test]
async fn refresh_timeout_keeps_current_board() {
    let store = seeded_store();
    let (coordinator, _events) = loaded_with(store, short_timeout()).await;
    coordinator
        .store()
        .set_latency(StoreOp::FetchTasks, Duration::from_secs(5));
    let before = coordinator.board();

    let err = coordinator.refresh().await.unwrap_err();

    assert!(matches!(
        err,
        CoordinatorError::RemoteRead {
            op: StoreOp::FetchTasks,
            ..
        }
    ));
    assert_eq!(coordinator.board(), before);
}

// =============================================================================
// Events
// =============================================================================

#[tokio::test]
async fn failed_move_event_sequence() {
    let (coordinator, mut events) = loaded_with(seeded_store(), CoordinatorConfig::default()).await;
    coordinator.store().fail(StoreOp::UpdateTaskStatus);

    let _ = coordinator
        .move_task(&TaskId::new("T1"), TaskStatus::ToDo, TaskStatus::Done, 0)
        .await;

    let events = drain(&mut events);
    assert_eq!(events.len(), 4, "{events:?}");
    let BoardEvent::MutationApplied {
        mutation_id: applied,
        kind: MutationKind::MoveTask,
        ..
    } = &events[0]
    else {
        panic!("expected MutationApplied, got {:?}", events[0]);
    };
    assert!(matches!(events[1], BoardEvent::BoardReloaded { .. }));
    assert!(matches!(
        &events[2],
        BoardEvent::MutationSettled {
            mutation_id,
            state: MutationState::RolledBack,
            ..
        } if mutation_id == applied
    ));
    assert!(matches!(&events[3], BoardEvent::Notice(msg) if msg.contains("move")));
}

#[tokio::test]
async fn create_and_comment_emit_only_settled() {
    let (coordinator, mut events) = loaded_with(seeded_store(), CoordinatorConfig::default()).await;

    let task = coordinator.create_task(NewTask::new("New")).await.unwrap();
    coordinator.post_comment(&task.id, "hi").await.unwrap();

    let events = drain(&mut events);
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        BoardEvent::MutationSettled {
            kind: MutationKind::CreateTask,
            state: MutationState::Confirmed,
            task_id,
            ..
        } if *task_id == task.id
    ));
    assert!(matches!(
        &events[1],
        BoardEvent::MutationSettled {
            kind: MutationKind::PostComment,
            ..
        }
    ));
}

#[tokio::test]
async fn failed_comment_leaves_list_untouched() {
    let (coordinator, mut events) = loaded_with(seeded_store(), CoordinatorConfig::default()).await;
    let task_id = TaskId::new("T1");
    coordinator.open_task(&task_id).await.unwrap();
    coordinator.store().fail(StoreOp::InsertComment);

    let err = coordinator.post_comment(&task_id, "lost").await.unwrap_err();

    assert!(matches!(
        err,
        CoordinatorError::RemoteWrite {
            op: StoreOp::InsertComment,
            ..
        }
    ));
    assert!(coordinator.comments(&task_id).unwrap().is_empty());
    assert_eq!(coordinator.board().task(&task_id).unwrap().comment_count, 0);
    assert!(matches!(drain(&mut events).as_slice(), [BoardEvent::Notice(_)]));
}
