use std::env;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::context::{ContextOptions, GitContext};
use crate::error::{ExecutionError, GitResult};
use crate::git::executor::{GitRunner, SafeExecutor};
use crate::git::parser::{ChangedFile, GitStatus, RepositoryInfo};
use crate::git::repository::{Repository, discover_root};
use crate::git::version::GitVersion;
use crate::security::sanitizer::Sanitizer;

/// Snapshots slower than this are logged at `warn`
const SLOW_SNAPSHOT: Duration = Duration::from_millis(500);

/// Builds a `GitContext`, optionally under a cancellation token
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    options: ContextOptions,
    cancel: CancellationToken,
}

impl ContextBuilder {
    pub fn new(options: ContextOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling `token` kills in-flight git processes and fails the build
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Validate, discover, collect every section, then sanitize
    #[instrument(
        name = "git_context",
        skip_all,
        fields(
            max_commits = self.options.max_commits,
            sanitize = self.options.sanitize_for_ai,
        )
    )]
    pub async fn build(&self) -> GitResult<GitContext> {
        let started = Instant::now();
        self.options.validate()?;

        let start = match self.options.working_dir {
            Some(ref dir) => dir.clone(),
            None => env::current_dir().map_err(|e| {
                ExecutionError::from_io("cannot read current directory", &e, None)
            })?,
        };
        let root = discover_root(&start)?;

        let executor = SafeExecutor::with_config(&root, self.options.executor.clone())
            .with_cancellation(self.cancel.child_token());
        let repo = Repository::with_runner(executor);

        let context = collect(&repo, &self.options).await?;
        let context = if self.options.sanitize_for_ai {
            Sanitizer::new()
                .with_max_message_chars(self.options.max_message_chars)
                .sanitize_context(context)
        } else {
            context
        };

        let elapsed = started.elapsed();
        if elapsed > SLOW_SNAPSHOT {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                "git context snapshot exceeded its budget"
            );
        }
        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            commits = context.recent_commits.len(),
            changed_files = context.changed_files.len(),
            "git context collected"
        );

        Ok(context)
    }
}

/// Run every section concurrently and assemble the raw snapshot
///
/// The first failing section fails the whole call; the remaining futures are
/// dropped, which kills their git processes.
pub(crate) async fn collect<R: GitRunner>(
    repo: &Repository<R>,
    options: &ContextOptions,
) -> GitResult<GitContext> {
    let (_version, location, remote_url, branch, entries, recent_commits, diff) = tokio::try_join!(
        GitVersion::validate(repo.runner()),
        repo.location(),
        repo.remote_url(),
        repo.branch(),
        repo.status_entries(&options.paths),
        repo.recent_commits(options.max_commits),
        repo.diff(
            options.diff_context,
            options.diff_base.as_deref(),
            &options.paths
        ),
    )?;

    let status = GitStatus::from_entries(&entries);
    let changed_files = ChangedFile::from_entries(&entries);
    let operation = repo.operation(&location);
    let repository = RepositoryInfo::new(&location, remote_url, operation, &status);

    Ok(GitContext {
        repository,
        branch,
        status,
        recent_commits,
        diff,
        changed_files,
    })
}

/// Collect a snapshot of the repository described by `options`
pub async fn get_git_context(options: &ContextOptions) -> GitResult<GitContext> {
    ContextBuilder::new(options.clone()).build().await
}

/// Blocking wrapper around `get_git_context`
///
/// Runs on a private current-thread runtime, so it must not be called from
/// inside an async context.
pub fn get_git_context_blocking(options: &ContextOptions) -> GitResult<GitContext> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ExecutionError::from_io("failed to start runtime", &e, None))?;

    runtime.block_on(get_git_context(options))
}
