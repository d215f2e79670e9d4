//! `taskboard` command-line client.
//!
//! Shows and edits a project's kanban board kept in a JSON store document.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! # Print the board
//! cargo run --bin taskboard -- --project demo board
//!
//! # Create, move and comment
//! cargo run --bin taskboard -- create "Write release notes" --priority high
//! cargo run --bin taskboard -- move srv-1 in-progress --index 0
//! cargo run --bin taskboard -- comment srv-1 "Started on this"
//!
//! # Or via environment variables
//! TASKBOARD_PROJECT=demo TASKBOARD_USER=u-1 cargo run -- show srv-1
//! ```

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::config::{CliArgs, ClientConfig, Command};
use taskboard::coordinator::{BoardEvent, CoordinatorError, TaskCoordinator};
use taskboard::render;
use taskboard::store::StoreError;
use taskboard::store::file::JsonFileStore;
use taskboard_proto::{NewTask, TaskId, UserId, UserRef};

/// Failures surfaced to the command line.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("task {0} is not on the board")]
    UnknownTask(TaskId),
}

impl CliError {
    fn user_message(&self) -> String {
        match self {
            Self::Coordinator(e) => e.user_message(),
            Self::Store(e) => format!("Could not update the store: {e}"),
            Self::UnknownTask(id) => format!("Task {id} is not on this board."),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(
        store = %config.store_path.display(),
        project = %config.project_id,
        user = %config.user_id,
        "taskboard starting"
    );

    let command = cli.command.clone().unwrap_or(Command::Board);
    let store = JsonFileStore::new(config.store_path.clone());
    let (coordinator, mut events) = TaskCoordinator::new(
        store,
        config.project_id.clone(),
        config.user_id.clone(),
        config.coordinator_config(),
    );

    let result = run(&coordinator, command, &config).await;
    log_events(&mut events);

    match result {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Logs are written to a file so stdout carries only command output.
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Runs one command and returns what to print.
async fn run(
    coordinator: &TaskCoordinator<JsonFileStore>,
    command: Command,
    config: &ClientConfig,
) -> Result<String, CliError> {
    match command {
        Command::Board => {
            let dropped = coordinator.refresh().await?;
            let mut out = render::board(&coordinator.board());
            if !dropped.is_empty() {
                out.push_str(&format!("\n({} unreadable tasks skipped)\n", dropped.len()));
            }
            Ok(out)
        }
        Command::Create {
            title,
            description,
            status,
            priority,
        } => {
            let mut new_task = NewTask::new(title);
            if let Some(d) = description {
                new_task = new_task.with_description(d);
            }
            if let Some(s) = status {
                new_task = new_task.with_status(s);
            }
            if let Some(p) = priority {
                new_task = new_task.with_priority(p);
            }
            let task = coordinator.create_task(new_task).await?;
            Ok(format!("Created {} in {}\n", task.id, task.status))
        }
        Command::Move {
            task_id,
            status,
            index,
        } => {
            let task_id = TaskId::new(task_id);
            coordinator.refresh().await?;
            let (from, _) = coordinator
                .board()
                .find(&task_id)
                .ok_or_else(|| CliError::UnknownTask(task_id.clone()))?;
            coordinator
                .move_task(&task_id, from, status, index.unwrap_or(usize::MAX))
                .await?;
            Ok(format!(
                "Moved {task_id} to {status}\n\n{}",
                render::board(&coordinator.board())
            ))
        }
        Command::Comment { task_id, content } => {
            let task_id = TaskId::new(task_id);
            let comment = coordinator.post_comment(&task_id, &content).await?;
            Ok(format!(
                "Commented on {task_id} at {}\n",
                comment.display_timestamp(&config.timestamp_format)
            ))
        }
        Command::Show { task_id } => {
            let detail = coordinator.open_task(&TaskId::new(task_id)).await?;
            Ok(render::detail(&detail, &config.timestamp_format))
        }
        Command::User {
            user_id,
            full_name,
            avatar,
        } => {
            let user = UserRef {
                id: UserId::new(user_id),
                full_name: Some(full_name),
                avatar_url: avatar,
            };
            let line = format!("Saved {} ({})\n", user.display_name(), user.initials());
            coordinator.store().upsert_user(user).await?;
            Ok(line)
        }
    }
}

/// Drains coordinator events into the log.
fn log_events(events: &mut mpsc::Receiver<BoardEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            BoardEvent::Notice(message) => tracing::warn!(%message, "notice"),
            other => tracing::debug!(event = ?other, "board event"),
        }
    }
}
