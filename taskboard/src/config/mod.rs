//! Configuration system for the taskboard client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use taskboard_proto::{
    DEFAULT_TIMESTAMP_FORMAT, MAX_TASK_TITLE_LENGTH, Priority, ProjectId, TaskStatus, UserId,
    is_valid_timestamp_format,
};

use crate::coordinator::{CoordinatorConfig, DEFAULT_EVENT_BUFFER, DEFAULT_REMOTE_TIMEOUT};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The timestamp format is not a valid chrono format string.
    #[error("invalid timestamp format '{0}'")]
    InvalidTimestampFormat(String),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    store: StoreFileConfig,
    session: SessionFileConfig,
    board: BoardFileConfig,
}

/// `[store]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    path: Option<PathBuf>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    project_id: Option<String>,
    user_id: Option<String>,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    remote_timeout_secs: Option<u64>,
    event_buffer: Option<usize>,
    max_task_title_len: Option<usize>,
    timestamp_format: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Store --
    /// Location of the JSON store document.
    pub store_path: PathBuf,

    // -- Session --
    /// Project shown on the board.
    pub project_id: ProjectId,
    /// Acting user (task creator, comment author).
    pub user_id: UserId,

    // -- Board --
    /// Bound on every remote call.
    pub remote_timeout: Duration,
    /// Buffer size for the coordinator event channel.
    pub event_buffer: usize,
    /// Maximum task title length in characters.
    pub max_task_title_len: usize,
    /// Comment timestamp display format (chrono).
    pub timestamp_format: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            project_id: ProjectId::new("default"),
            user_id: UserId::new("local-user"),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            event_buffer: DEFAULT_EVENT_BUFFER,
            max_task_title_len: MAX_TASK_TITLE_LENGTH,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// CLI args and env vars are parsed via `clap`. If `--config` is given
    /// and the file does not exist, returns an error. If no `--config` is
    /// given, the default path (`~/.config/taskboard/config.toml`) is tried
    /// and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// or if the resolved values are invalid.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        let config = Self::resolve(cli, &file);
        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimestampFormat`] if the timestamp
    /// format contains an unknown or incomplete specifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_timestamp_format(&self.timestamp_format) {
            return Err(ConfigError::InvalidTimestampFormat(self.timestamp_format.clone()));
        }
        Ok(())
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            store_path: cli
                .store
                .clone()
                .or_else(|| file.store.path.clone())
                .unwrap_or(defaults.store_path),
            project_id: cli
                .project
                .clone()
                .or_else(|| file.session.project_id.clone())
                .map_or(defaults.project_id, ProjectId::new),
            user_id: cli
                .user
                .clone()
                .or_else(|| file.session.user_id.clone())
                .map_or(defaults.user_id, UserId::new),
            remote_timeout: file
                .board
                .remote_timeout_secs
                .map_or(defaults.remote_timeout, Duration::from_secs),
            event_buffer: file.board.event_buffer.unwrap_or(defaults.event_buffer),
            max_task_title_len: file
                .board
                .max_task_title_len
                .unwrap_or(defaults.max_task_title_len),
            timestamp_format: cli
                .timestamp_format
                .clone()
                .or_else(|| file.board.timestamp_format.clone())
                .unwrap_or(defaults.timestamp_format),
        }
    }

    /// Coordinator tunables from this configuration.
    #[must_use]
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            remote_timeout: self.remote_timeout,
            event_buffer: self.event_buffer,
            max_title_len: self.max_task_title_len,
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Kanban task board synced with a shared store")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the JSON store document.
    #[arg(long, global = true, env = "TASKBOARD_STORE")]
    pub store: Option<PathBuf>,

    /// Project whose board to show.
    #[arg(long, global = true, env = "TASKBOARD_PROJECT")]
    pub project: Option<String>,

    /// Acting user id.
    #[arg(long, global = true, env = "TASKBOARD_USER")]
    pub user: Option<String>,

    /// Timestamp display format (chrono format string).
    #[arg(long, global = true)]
    pub timestamp_format: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info", env = "TASKBOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskboard.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// What to do (default: `board`).
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Board operations exposed on the command line.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the board.
    Board,

    /// Create a task at the tail of its column.
    Create {
        /// Task title.
        title: String,
        /// Longer description.
        #[arg(long)]
        description: Option<String>,
        /// Initial column (todo, in-progress, done).
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Priority (low, medium, high).
        #[arg(long)]
        priority: Option<Priority>,
    },

    /// Move a task to another column.
    Move {
        /// Task id.
        task_id: String,
        /// Destination column (todo, in-progress, done).
        status: TaskStatus,
        /// Position in the destination column (default: last).
        #[arg(long)]
        index: Option<usize>,
    },

    /// Comment on a task.
    Comment {
        /// Task id.
        task_id: String,
        /// Comment text.
        content: String,
    },

    /// Show a task with its comments, files and assignees.
    Show {
        /// Task id.
        task_id: String,
    },

    /// Create or update a user profile in the store.
    User {
        /// User id.
        user_id: String,
        /// Display name.
        full_name: String,
        /// Avatar image URL.
        #[arg(long)]
        avatar: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Default store location: `<data dir>/taskboard/board.json`.
fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("taskboard")
        .join("board.json")
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskboard").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
