//! Sanitization of text headed for an AI context window or an error message.
//!
//! Four independent transformations: injection phrasings are replaced with a
//! fixed token, messages are truncated, credentials and tokens are redacted,
//! and home-directory paths are rewritten to `~`. Every field is sanitized to
//! a fixpoint, so applying the sanitizer twice yields the same result as
//! applying it once.

use std::path::Path;

use regex::{Captures, Regex};
use tracing::debug;

use crate::context::GitContext;
use crate::git::parser::{
    BranchInfo, ChangedFile, Commit, DiffHunk, DiffLine, FileDiff, GitStatus, ParsedDiff,
    RenamedFile, RepositoryInfo,
};
use crate::security::patterns::{
    HOME_PREFIX_REGEX, INJECTION_PATTERNS, INJECTION_TOKEN, URL_CREDENTIALS_REGEX,
    URL_USER_ONLY_REGEX, home_dir_regex, repo_root_regex, secret_patterns,
};

/// Default bound on commit messages, in characters
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 500;

/// Appended to truncated messages; counted against the bound
pub const TRUNCATION_MARKER: &str = " [truncated]";

/// Bound on sanitized error messages, in characters
const MAX_ERROR_CHARS: usize = 2000;

/// Upper bound on passes when settling a value
const MAX_PASSES: usize = 8;

/// Sanitizes repository context for AI consumption
#[derive(Debug, Clone)]
pub struct Sanitizer {
    injection_patterns: Vec<Regex>,
    home_pattern: Option<Regex>,
    max_message_chars: usize,
}

impl Sanitizer {
    /// Create a sanitizer for the current user's home directory
    pub fn new() -> Self {
        let home = std::env::var("HOME").ok();
        Self::with_home_dir(home.as_deref())
    }

    /// Create a sanitizer for an explicit home directory (or none)
    pub fn with_home_dir(home: Option<&str>) -> Self {
        Self {
            injection_patterns: INJECTION_PATTERNS.clone(),
            home_pattern: home.and_then(home_dir_regex),
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
        }
    }

    /// Set the message length bound
    #[must_use]
    pub fn with_max_message_chars(mut self, max_chars: usize) -> Self {
        self.max_message_chars = max_chars;
        self
    }

    /// Append a pattern to the fixed injection list
    ///
    /// This is the only extension point. Matches are replaced with the same
    /// `[FILTERED]` token; a pattern that can match that token, or that ends
    /// in an anchor, breaks idempotence.
    #[must_use]
    pub fn with_injection_pattern(mut self, pattern: Regex) -> Self {
        self.injection_patterns.push(pattern);
        self
    }

    pub fn max_message_chars(&self) -> usize {
        self.max_message_chars
    }

    /// Sanitize every attacker-influenced field of a context
    pub fn sanitize_context(&self, ctx: GitContext) -> GitContext {
        let GitContext {
            repository,
            branch,
            status,
            recent_commits,
            diff,
            changed_files,
        } = ctx;

        GitContext {
            repository: self.sanitize_repository(repository),
            branch: self.sanitize_branch(branch),
            status: self.sanitize_status(status),
            recent_commits: recent_commits
                .into_iter()
                .map(|commit| self.sanitize_commit(commit))
                .collect(),
            diff: self.sanitize_diff(diff),
            changed_files: changed_files
                .into_iter()
                .map(|file| ChangedFile {
                    path: self.sanitize_text(&file.path),
                    status: file.status,
                })
                .collect(),
        }
    }

    /// Replace known injection phrasings with `[FILTERED]`
    pub fn redact_injections(&self, text: &str) -> String {
        let mut result = text.to_string();
        for pattern in &self.injection_patterns {
            if pattern.is_match(&result) {
                result = pattern.replace_all(&result, INJECTION_TOKEN).into_owned();
            }
        }
        result
    }

    /// Rewrite absolute home-directory paths to `~`
    pub fn redact_home_paths(&self, text: &str) -> String {
        let mut result = text.to_string();
        if let Some(ref home) = self.home_pattern {
            result = home.replace_all(&result, "${1}~${2}").into_owned();
        }
        HOME_PREFIX_REGEX.replace_all(&result, "${1}~").into_owned()
    }

    /// Bound a message to the configured length, marker included
    pub fn truncate_message(&self, text: &str) -> String {
        truncate_chars(text, self.max_message_chars)
    }

    /// Credentials, home paths and injections, settled to a fixpoint
    pub fn sanitize_text(&self, text: &str) -> String {
        settle(text, |value| {
            let value = redact_credentials(value);
            let value = self.redact_home_paths(&value);
            self.redact_injections(&value)
        })
    }

    /// `sanitize_text` followed by truncation, settled to a fixpoint
    pub fn sanitize_message(&self, text: &str) -> String {
        settle(text, |value| {
            let value = self.sanitize_text(value);
            self.truncate_message(&value)
        })
    }

    fn sanitize_repository(&self, repository: RepositoryInfo) -> RepositoryInfo {
        RepositoryInfo {
            root: self.sanitize_text(&repository.root),
            remote_url: repository.remote_url.map(|url| self.sanitize_text(&url)),
            ..repository
        }
    }

    fn sanitize_branch(&self, branch: BranchInfo) -> BranchInfo {
        match branch {
            BranchInfo::Tracking {
                current,
                upstream,
                ahead,
                behind,
            } => BranchInfo::Tracking {
                current: self.sanitize_text(&current),
                upstream: self.sanitize_text(&upstream),
                ahead,
                behind,
            },
            BranchInfo::Local { current } => BranchInfo::Local {
                current: self.sanitize_text(&current),
            },
            BranchInfo::Unborn { current } => BranchInfo::Unborn {
                current: self.sanitize_text(&current),
            },
            BranchInfo::Detached { commit_hash } => BranchInfo::Detached { commit_hash },
        }
    }

    fn sanitize_status(&self, status: GitStatus) -> GitStatus {
        let paths = |list: Vec<String>| -> Vec<String> {
            list.iter().map(|path| self.sanitize_text(path)).collect()
        };

        GitStatus {
            staged: paths(status.staged),
            modified: paths(status.modified),
            untracked: paths(status.untracked),
            deleted: paths(status.deleted),
            renamed: status
                .renamed
                .into_iter()
                .map(|rename| RenamedFile {
                    from: self.sanitize_text(&rename.from),
                    to: self.sanitize_text(&rename.to),
                })
                .collect(),
            conflicted: paths(status.conflicted),
        }
    }

    fn sanitize_commit(&self, commit: Commit) -> Commit {
        Commit {
            author: self.sanitize_message(&commit.author),
            message: self.sanitize_message(&commit.message),
            ..commit
        }
    }

    fn sanitize_diff(&self, diff: ParsedDiff) -> ParsedDiff {
        ParsedDiff {
            stats: diff.stats,
            files: diff
                .files
                .into_iter()
                .map(|file| FileDiff {
                    path: self.sanitize_text(&file.path),
                    old_path: file.old_path.map(|path| self.sanitize_text(&path)),
                    hunks: file
                        .hunks
                        .into_iter()
                        .map(|hunk| DiffHunk {
                            header: self.sanitize_text(&hunk.header),
                            lines: hunk
                                .lines
                                .into_iter()
                                .map(|line| DiffLine {
                                    content: self.sanitize_text(&line.content),
                                    kind: line.kind,
                                })
                                .collect(),
                            ..hunk
                        })
                        .collect(),
                    ..file
                })
                .collect(),
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Sanitize a context with the default sanitizer
pub fn sanitize_for_ai(ctx: GitContext) -> GitContext {
    Sanitizer::new().sanitize_context(ctx)
}

/// Redact URL userinfo and known token shapes
pub fn redact_credentials(text: &str) -> String {
    let mut result = URL_CREDENTIALS_REGEX
        .replace_all(text, "${1}***:***@")
        .into_owned();
    result = URL_USER_ONLY_REGEX
        .replace_all(&result, "${1}***@")
        .into_owned();

    for pattern in secret_patterns() {
        if pattern.regex.is_match(&result) {
            debug!(pattern = pattern.name, "redacted secret");
            result = pattern
                .regex
                .replace_all(&result, pattern.replacement)
                .into_owned();
        }
    }

    result
}

/// Sanitize free text before it reaches a log line, an error, or a prompt
///
/// Paths under `repo_root` become repository-relative, home directories
/// become `~`, and credentials are redacted.
pub fn sanitize_error_text(text: &str, repo_root: Option<&Path>) -> String {
    let mut result = text.trim().to_string();

    if let Some(root) = repo_root.and_then(Path::to_str).and_then(repo_root_regex) {
        result = settle(&result, |value| {
            root.replace_all(value, |caps: &Captures| {
                let lead = &caps[1];
                match (caps.get(2), caps.get(3)) {
                    (Some(_), _) => lead.to_string(),
                    (None, tail) => format!("{}.{}", lead, tail.map_or("", |m| m.as_str())),
                }
            })
            .into_owned()
        });
    }

    let sanitizer = Sanitizer::new();
    result = settle(&result, |value| {
        let value = redact_credentials(value);
        sanitizer.redact_home_paths(&value)
    });

    truncate_chars(&result, MAX_ERROR_CHARS)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let marker_chars = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_chars {
        return text.chars().take(max_chars).collect();
    }

    let kept: String = text.chars().take(max_chars - marker_chars).collect();
    let mut truncated = kept.trim_end().to_string();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Apply `step` until the value stops changing
fn settle<F>(text: &str, step: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut current = step(text);
    for _ in 0..MAX_PASSES {
        let next = step(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}
