//! The context snapshot returned to callers and the options that shape it.

pub mod builder;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::git::executor::ExecutorConfig;
use crate::git::parser::{BranchInfo, ChangedFile, Commit, GitStatus, ParsedDiff, RepositoryInfo};
use crate::security::sanitizer::DEFAULT_MAX_MESSAGE_CHARS;
use crate::security::validator::{
    ValidationError, ValidationRule, validate_file_path, validate_revision,
};

pub use builder::{ContextBuilder, get_git_context, get_git_context_blocking};

/// Largest accepted `max_commits`
pub const MAX_COMMITS_LIMIT: usize = 1000;

/// Largest accepted `diff_context`
pub const MAX_DIFF_CONTEXT: u32 = 100;

/// One consistent, read-only snapshot of a repository
///
/// Built fresh on every call and never mutated afterwards; fields are read
/// through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitContext {
    pub(crate) repository: RepositoryInfo,
    pub(crate) branch: BranchInfo,
    pub(crate) status: GitStatus,
    pub(crate) recent_commits: Vec<Commit>,
    pub(crate) diff: ParsedDiff,
    pub(crate) changed_files: Vec<ChangedFile>,
}

impl GitContext {
    pub fn repository(&self) -> &RepositoryInfo {
        &self.repository
    }

    pub fn branch(&self) -> &BranchInfo {
        &self.branch
    }

    pub fn status(&self) -> &GitStatus {
        &self.status
    }

    pub fn recent_commits(&self) -> &[Commit] {
        &self.recent_commits
    }

    pub fn diff(&self) -> &ParsedDiff {
        &self.diff
    }

    pub fn changed_files(&self) -> &[ChangedFile] {
        &self.changed_files
    }

    /// Serialize to the camelCase JSON wire shape
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Per-call options for `get_git_context`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    /// Number of recent commits to include
    pub max_commits: usize,
    /// Context lines around each diff hunk
    pub diff_context: u32,
    /// Run the sanitizer over the snapshot before returning it
    pub sanitize_for_ai: bool,
    /// Revision to diff against instead of HEAD
    pub diff_base: Option<String>,
    /// Restrict status and diff to these repository-relative paths
    pub paths: Vec<String>,
    /// Where to start repository discovery; the process cwd when unset
    pub working_dir: Option<PathBuf>,
    /// Bound on commit messages and author names when sanitizing
    pub max_message_chars: usize,
    pub executor: ExecutorConfig,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_commits: 10,
            diff_context: 3,
            sanitize_for_ai: true,
            diff_base: None,
            paths: Vec::new(),
            working_dir: None,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            executor: ExecutorConfig::default(),
        }
    }
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options seeded from a loaded config file
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_commits: config.context.max_commits,
            diff_context: config.context.diff_context,
            sanitize_for_ai: config.context.sanitize_for_ai,
            max_message_chars: config.context.max_message_chars,
            executor: config.executor.to_executor_config(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_working_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn with_max_commits(mut self, max_commits: usize) -> Self {
        self.max_commits = max_commits;
        self
    }

    #[must_use]
    pub fn with_diff_context(mut self, lines: u32) -> Self {
        self.diff_context = lines;
        self
    }

    #[must_use]
    pub fn with_sanitize_for_ai(mut self, sanitize: bool) -> Self {
        self.sanitize_for_ai = sanitize;
        self
    }

    #[must_use]
    pub fn with_diff_base(mut self, base: impl Into<String>) -> Self {
        self.diff_base = Some(base.into());
        self
    }

    #[must_use]
    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_max_message_chars(mut self, max_chars: usize) -> Self {
        self.max_message_chars = max_chars;
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    /// Check every option before any subprocess runs
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_commits > MAX_COMMITS_LIMIT {
            return Err(out_of_range("max_commits", self.max_commits));
        }
        if self.diff_context > MAX_DIFF_CONTEXT {
            return Err(out_of_range("diff_context", self.diff_context));
        }
        if self.max_message_chars == 0 {
            return Err(out_of_range("max_message_chars", 0));
        }
        if self.executor.timeout.is_zero() {
            return Err(out_of_range("timeout", 0));
        }
        if self.executor.max_output_bytes == 0 {
            return Err(out_of_range("max_output_bytes", 0));
        }

        if let Some(ref base) = self.diff_base {
            validate_revision(base)?;
        }
        for path in &self.paths {
            validate_file_path(path)?;
        }

        Ok(())
    }
}

fn out_of_range(option: &str, value: impl std::fmt::Display) -> ValidationError {
    ValidationError::new(ValidationRule::OutOfRange, &format!("{}={}", option, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_options() {
        let options = ContextOptions::default();
        assert_eq!(options.max_commits, 10);
        assert_eq!(options.diff_context, 3);
        assert!(options.sanitize_for_ai);
        assert_eq!(options.max_message_chars, 500);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_limits() {
        let err = ContextOptions::new()
            .with_max_commits(MAX_COMMITS_LIMIT + 1)
            .validate()
            .unwrap_err();
        assert_eq!(err.rule, ValidationRule::OutOfRange);
        assert_eq!(err.value, "max_commits=1001");

        assert!(ContextOptions::new().with_diff_context(101).validate().is_err());
        assert!(ContextOptions::new().with_max_message_chars(0).validate().is_err());
        assert!(ContextOptions::new().with_max_commits(0).validate().is_ok());

        let executor = ExecutorConfig {
            timeout: Duration::ZERO,
            ..ExecutorConfig::default()
        };
        assert!(ContextOptions::new().with_executor(executor).validate().is_err());
    }

    #[test]
    fn test_validate_base_and_paths() {
        assert!(ContextOptions::new().with_diff_base("main").validate().is_ok());

        let err = ContextOptions::new()
            .with_diff_base("--output=/etc/passwd")
            .validate()
            .unwrap_err();
        assert_eq!(err.rule, ValidationRule::LeadingDash);

        let err = ContextOptions::new()
            .with_paths(["src", "../secrets"])
            .validate()
            .unwrap_err();
        assert_eq!(err.rule, ValidationRule::PathTraversal);
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default_config();
        config.context.max_commits = 3;
        config.context.sanitize_for_ai = false;
        config.executor.timeout_ms = 1500;

        let options = ContextOptions::from_config(&config);
        assert_eq!(options.max_commits, 3);
        assert!(!options.sanitize_for_ai);
        assert_eq!(options.executor.timeout, Duration::from_millis(1500));
        assert!(options.paths.is_empty());
    }
}
