//! Serializable error reports for callers that forward failures to a UI or
//! an AI agent.

use serde::Serialize;

use crate::error::{ErrorKind, ExecutionFailure, GitError};
use crate::security::validator::ValidationRule;

/// A machine-readable description of a failed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    /// Sanitized error text
    pub message: String,
    pub retryable: bool,
    pub suggestion: Option<String>,
}

impl ErrorReport {
    pub fn from_error(error: &GitError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            retryable: error.is_retryable(),
            suggestion: suggest(error).map(str::to_string),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&GitError> for ErrorReport {
    fn from(error: &GitError) -> Self {
        Self::from_error(error)
    }
}

fn suggest(error: &GitError) -> Option<&'static str> {
    match error {
        GitError::Validation(err) => Some(match err.rule {
            ValidationRule::PathTraversal | ValidationRule::AbsolutePath => {
                "Pass paths relative to the repository root, without '..' segments."
            }
            ValidationRule::BranchName | ValidationRule::CommitHash => {
                "Use a branch name (letters, digits, '/', '_', '-') or a full 40-character commit hash."
            }
            ValidationRule::OutOfRange => {
                "Keep max_commits at or below 1000 and diff_context at or below 100; size and time limits must be non-zero."
            }
            _ => "Remove option-like or shell-special characters from the request.",
        }),
        GitError::Timeout { .. } => {
            Some("Retry with a larger timeout, or restrict the request with paths.")
        }
        GitError::BufferExceeded { .. } => Some(
            "Narrow the request with paths or fewer context lines, or raise max_output_bytes.",
        ),
        GitError::Cancelled { .. } => None,
        GitError::Execution(err) => match err.failure {
            ExecutionFailure::ToolNotFound => {
                Some("Install git, or set executor.git_binary in ~/.config/gitctx/config.toml.")
            }
            ExecutionFailure::NotARepository => {
                Some("Run inside a git work tree, or set working_dir to one.")
            }
            ExecutionFailure::UnsupportedVersion => Some("Upgrade git to 2.13 or newer."),
            _ => match_error_patterns(&err.message),
        },
    }
}

/// Match common git failure text
fn match_error_patterns(error_text: &str) -> Option<&'static str> {
    let lower = error_text.to_lowercase();

    if lower.contains("not a git repository") {
        return Some("Run inside a git work tree, or set working_dir to one.");
    }

    if lower.contains("dubious ownership") {
        return Some(
            "The repository is owned by another user; add it with: git config --global --add safe.directory <path>",
        );
    }

    if lower.contains("unknown revision")
        || lower.contains("ambiguous argument")
        || lower.contains("bad revision")
    {
        return Some("The diff base does not exist; check the branch name or commit hash.");
    }

    if lower.contains("pathspec") && lower.contains("did not match") {
        return Some("File path not found in the repository.");
    }

    if lower.contains("index.lock") {
        return Some("Another git process holds the index lock; retry once it finishes.");
    }

    if lower.contains("permission denied") {
        return Some("Check read permissions on the repository directory.");
    }

    None
}
