//! Plain-text rendering of the board and task details.

use std::fmt::Write;

use taskboard_proto::{Priority, Task};

use crate::board::{Board, Column};
use crate::detail::TaskDetail;

/// One-letter priority badge.
const fn priority_badge(priority: Priority) -> char {
    match priority {
        Priority::Low => 'L',
        Priority::Medium => 'M',
        Priority::High => 'H',
    }
}

fn plural(n: u32, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// A single card line: `[H] T1  Title  (2 comments, 1 file)`.
#[must_use]
pub fn task_line(task: &Task) -> String {
    let mut line = format!("[{}] {}  {}", priority_badge(task.priority), task.id, task.title);
    let mut extras = Vec::new();
    if task.comment_count > 0 {
        extras.push(plural(task.comment_count, "comment"));
    }
    if task.file_count > 0 {
        extras.push(plural(task.file_count, "file"));
    }
    if !extras.is_empty() {
        let _ = write!(line, "  ({})", extras.join(", "));
    }
    line
}

fn column_block(out: &mut String, column: &Column) {
    let _ = writeln!(out, "{} ({})", column.status(), column.len());
    if column.is_empty() {
        let _ = writeln!(out, "  (empty)");
    }
    for task in column.tasks() {
        let _ = writeln!(out, "  {}", task_line(task));
    }
}

/// Renders all columns in board order.
#[must_use]
pub fn board(board: &Board) -> String {
    let mut out = String::new();
    for (i, column) in board.columns().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        column_block(&mut out, column);
    }
    out
}

/// Renders an opened task; comment times use `timestamp_format`.
#[must_use]
pub fn detail(detail: &TaskDetail, timestamp_format: &str) -> String {
    let task = &detail.task;
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", task.id, task.title);
    let _ = writeln!(out, "Status:   {}", task.status);
    let _ = writeln!(out, "Priority: {}", task.priority);
    if let Some(description) = &task.description {
        let _ = writeln!(out, "\n{description}");
    }

    if !detail.assignees.is_empty() {
        let names: Vec<String> = detail
            .assignees
            .iter()
            .map(|u| format!("{} ({})", u.display_name(), u.initials()))
            .collect();
        let _ = writeln!(out, "\nAssignees: {}", names.join(", "));
    }

    if !detail.files.is_empty() {
        let _ = writeln!(out, "\nFiles:");
        for file in &detail.files {
            let _ = writeln!(
                out,
                "  {}  {}  ({})",
                file.file_name,
                file.file_url,
                file.uploaded_by.display_name()
            );
        }
    }

    let _ = writeln!(out, "\nComments ({}):", detail.comments.len());
    if detail.comments.is_empty() {
        let _ = writeln!(out, "  No comments yet.");
    }
    for comment in &detail.comments {
        let _ = writeln!(
            out,
            "  {} [{}] {}: {}",
            comment.display_timestamp(timestamp_format),
            comment.author.initials(),
            comment.author.display_name(),
            comment.content
        );
    }
    out
}
