use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::security::sanitizer::sanitize_error_text;
use crate::security::validator::ValidationError;

/// Why a git invocation (or the setup around it) failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionFailure {
    /// The git binary could not be found
    ToolNotFound,
    /// The working directory is not inside a git repository
    NotARepository,
    /// The installed git is older than the supported minimum
    UnsupportedVersion,
    /// git succeeded but printed something the parsers cannot use
    UnexpectedOutput,
    /// Spawning, reading or waiting failed at the OS level
    Io,
    /// git exited unsuccessfully; `None` when killed by a signal
    NonZeroExit { code: Option<i32> },
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionFailure::ToolNotFound => write!(f, "git not found"),
            ExecutionFailure::NotARepository => write!(f, "not a git repository"),
            ExecutionFailure::UnsupportedVersion => write!(f, "unsupported git version"),
            ExecutionFailure::UnexpectedOutput => write!(f, "unexpected git output"),
            ExecutionFailure::Io => write!(f, "I/O error"),
            ExecutionFailure::NonZeroExit { code: Some(code) } => {
                write!(f, "exit status {}", code)
            }
            ExecutionFailure::NonZeroExit { code: None } => write!(f, "terminated by signal"),
        }
    }
}

/// A failed git invocation; the message is sanitized on construction
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{failure}: {message}")]
pub struct ExecutionError {
    pub failure: ExecutionFailure,
    pub message: String,
}

impl ExecutionError {
    pub fn new(failure: ExecutionFailure, message: &str, repo_root: Option<&Path>) -> Self {
        Self {
            failure,
            message: sanitize_error_text(message, repo_root),
        }
    }

    pub fn from_io(context: &str, err: &io::Error, repo_root: Option<&Path>) -> Self {
        let failure = if err.kind() == io::ErrorKind::NotFound {
            ExecutionFailure::ToolNotFound
        } else {
            ExecutionFailure::Io
        };
        Self::new(failure, &format!("{}: {}", context, err), repo_root)
    }

    pub fn unexpected_output(message: &str) -> Self {
        Self::new(ExecutionFailure::UnexpectedOutput, message, None)
    }
}

/// Errors that can cross the context-extraction boundary
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Git execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("git {subcommand} timed out after {}ms", timeout.as_millis())]
    Timeout {
        subcommand: String,
        timeout: Duration,
    },

    #[error("git {subcommand} produced more than {limit} bytes of output")]
    BufferExceeded { subcommand: String, limit: usize },

    #[error("git {subcommand} was cancelled")]
    Cancelled { subcommand: String },
}

/// Machine-readable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Execution,
    Timeout,
    BufferExceeded,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Execution => "execution",
            ErrorKind::Timeout => "timeout",
            ErrorKind::BufferExceeded => "buffer_exceeded",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl GitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GitError::Validation(_) => ErrorKind::Validation,
            GitError::Execution(_) => ErrorKind::Execution,
            GitError::Timeout { .. } => ErrorKind::Timeout,
            GitError::BufferExceeded { .. } => ErrorKind::BufferExceeded,
            GitError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Whether the same request may succeed with a larger budget or narrower scope
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GitError::Timeout { .. } | GitError::BufferExceeded { .. }
        )
    }

    pub fn execution_failure(&self) -> Option<ExecutionFailure> {
        match self {
            GitError::Execution(err) => Some(err.failure),
            _ => None,
        }
    }

    pub fn is_tool_not_found(&self) -> bool {
        self.execution_failure() == Some(ExecutionFailure::ToolNotFound)
    }

    pub fn not_a_repository(path: &Path) -> Self {
        GitError::Execution(ExecutionError::new(
            ExecutionFailure::NotARepository,
            &format!("not a git repository (or any parent): {}", path.display()),
            None,
        ))
    }
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;
