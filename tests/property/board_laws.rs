//! Property-based tests for the board state model.
//!
//! Uses proptest to verify:
//! 1. Conservation: any sequence of moves keeps the same set of tasks,
//!    with every task in the column matching its status.
//! 2. Round trip: moving a task and moving it straight back restores the
//!    board exactly.
//! 3. Insertion adds exactly one task, at the tail of its column.
//! 4. A failed move leaves the board untouched.

use std::collections::BTreeSet;

use proptest::prelude::*;
use taskboard::board::{Board, MoveOutcome};
use taskboard_proto::{ProjectId, Task, TaskId, TaskRecord, TaskStatus, UserId};

// --- Strategies ---

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

fn task(id: usize, status: TaskStatus) -> Task {
    let record = TaskRecord::new(
        format!("t{id}"),
        format!("task {id}"),
        status,
        ProjectId::new("p"),
        UserId::new("u"),
    );
    Task::try_from(record).unwrap()
}

/// A board of 1..12 tasks with ids `t0..tN` spread over the columns.
fn arb_board() -> impl Strategy<Value = Board> {
    prop::collection::vec(arb_status(), 1..12).prop_map(|statuses| {
        let tasks = statuses.into_iter().enumerate().map(|(i, s)| task(i, s));
        Board::from_tasks(tasks).board
    })
}

/// A move request: which task (by index into all ids), where to, and at
/// what position (possibly past the end).
fn arb_move() -> impl Strategy<Value = (usize, TaskStatus, usize)> {
    (any::<usize>(), arb_status(), 0usize..16)
}

fn all_ids(board: &Board) -> BTreeSet<TaskId> {
    board.columns().iter().flat_map(|c| c.ids()).collect()
}

fn pick(board: &Board, n: usize) -> (TaskId, TaskStatus) {
    let ids: Vec<TaskId> = all_ids(board).into_iter().collect();
    let id = ids[n % ids.len()].clone();
    let (status, _) = board.find(&id).unwrap();
    (id, status)
}

fn assert_consistent(board: &Board) -> Result<(), TestCaseError> {
    for column in board.columns() {
        for task in column.tasks() {
            prop_assert_eq!(task.status, column.status());
        }
    }
    Ok(())
}

// --- Properties ---

proptest! {
    #[test]
    fn moves_conserve_tasks(
        mut board in arb_board(),
        moves in prop::collection::vec(arb_move(), 0..24),
    ) {
        let before_ids = all_ids(&board);
        let before_total = board.total_tasks();

        for (n, to, index) in moves {
            let (id, from) = pick(&board, n);
            board.move_task(&id, from, to, index).unwrap();
            prop_assert_eq!(board.total_tasks(), before_total);
            prop_assert_eq!(board.find(&id).map(|(s, _)| s), Some(to));
        }

        prop_assert_eq!(all_ids(&board), before_ids);
        assert_consistent(&board)?;
    }

    #[test]
    fn move_then_move_back_restores(
        board in arb_board(),
        (n, to, index) in arb_move(),
    ) {
        let mut moved = board.clone();
        let (id, from) = pick(&board, n);
        match moved.move_task(&id, from, to, index).unwrap() {
            MoveOutcome::Unchanged => prop_assert_eq!(&moved, &board),
            MoveOutcome::Moved { from_index, .. } => {
                moved.move_task(&id, to, from, from_index).unwrap();
                prop_assert_eq!(&moved, &board);
            }
        }
    }

    #[test]
    fn insert_adds_one_task_at_tail(board in arb_board(), status in arb_status()) {
        let mut grown = board.clone();
        let new_task = task(999, status);
        grown.insert_task(new_task.clone()).unwrap();

        prop_assert_eq!(grown.total_tasks(), board.total_tasks() + 1);
        prop_assert_eq!(grown.column(status).tasks().last(), Some(&new_task));
        prop_assert!(grown.insert_task(new_task).is_err());
        prop_assert_eq!(grown.total_tasks(), board.total_tasks() + 1);
    }

    #[test]
    fn failed_move_changes_nothing(
        board in arb_board(),
        (n, to, index) in arb_move(),
    ) {
        let (id, actual) = pick(&board, n);
        let wrong = TaskStatus::ALL
            .into_iter()
            .find(|s| *s != actual)
            .unwrap();
        let mut attempted = board.clone();
        prop_assert!(attempted.move_task(&id, wrong, to, index).is_err());
        prop_assert_eq!(attempted, board);
    }
}
