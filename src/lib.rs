//! Read-only, injection-safe git repository context for AI prompt builders.
//!
//! `get_git_context` validates its options, shells out to an allow-listed set
//! of read-only git subcommands, parses the output into a typed
//! [`GitContext`], and (by default) sanitizes every attacker-influenced field
//! before returning it.

pub mod config;
pub mod context;
pub mod error;
pub mod git;
pub mod report;
pub mod security;

// Re-export commonly used types for convenience
pub use context::{
    ContextBuilder, ContextOptions, GitContext, get_git_context, get_git_context_blocking,
};
pub use error::{ErrorKind, ExecutionError, ExecutionFailure, GitError, GitResult};
pub use git::{
    BranchInfo, ChangeStatus, ChangedFile, Commit, GitStatus, GitVersion, ParsedDiff, Repository,
    RepositoryInfo, SafeExecutor,
};
pub use report::ErrorReport;
pub use security::{Sanitizer, ValidationError, ValidationRule, sanitize_for_ai};
