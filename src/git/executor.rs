use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ExecutionError, ExecutionFailure, GitError, GitResult};
use crate::security::validator::{validate_args, validate_file_path};
use crate::security::PATHSPEC_SUBCOMMANDS;

/// Default wall-clock budget per git invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default ceiling on captured stdout
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// stderr beyond this is dropped silently
const MAX_STDERR_BYTES: usize = 64 * 1024;

/// How long to wait for a killed child to be reaped
const REAP_TIMEOUT: Duration = Duration::from_secs(2);

/// Options prepended to every invocation, never caller-controlled
const HARDENING_ARGS: &[&str] = &[
    "--no-pager",
    "-c",
    "core.fsmonitor=false",
    "-c",
    "core.quotePath=false",
    "-c",
    "color.ui=false",
];

/// Environment that could redirect git or make it run other programs
const SCRUBBED_ENV: &[&str] = &[
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_OBJECT_DIRECTORY",
    "GIT_ALTERNATE_OBJECT_DIRECTORIES",
    "GIT_COMMON_DIR",
    "GIT_NAMESPACE",
    "GIT_SSH",
    "GIT_SSH_COMMAND",
    "GIT_EXTERNAL_DIFF",
    "GIT_CONFIG",
    "GIT_CONFIG_PARAMETERS",
    "GIT_CONFIG_COUNT",
    "GIT_ASKPASS",
    "SSH_ASKPASS",
    "GIT_EDITOR",
    "GIT_PAGER",
    "PAGER",
    "GIT_TRACE",
    "GIT_TRACE_PACKET",
    "GIT_TRACE_SETUP",
];

const FIXED_ENV: &[(&str, &str)] = &[
    ("GIT_TERMINAL_PROMPT", "0"),
    ("GIT_OPTIONAL_LOCKS", "0"),
    ("GIT_LITERAL_PATHSPECS", "1"),
    ("GIT_PAGER", "cat"),
    ("LC_ALL", "C"),
];

/// Limits applied to every invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub git_binary: PathBuf,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Something that can run an allow-listed git command and return its stdout
///
/// `SafeExecutor` is the production implementation; tests script responses.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run `git <args> -- <paths>` and return stdout
    async fn run_git(&self, args: Vec<String>, paths: Vec<String>) -> GitResult<String>;

    /// Directory git runs in
    fn repo_path(&self) -> &Path;
}

/// Executes git without a shell, within time and output limits
#[derive(Debug, Clone)]
pub struct SafeExecutor {
    repo_path: PathBuf,
    config: ExecutorConfig,
    cancel: CancellationToken,
}

impl SafeExecutor {
    /// Create a new SafeExecutor for the given repository path
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self::with_config(repo_path, ExecutorConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(repo_path: P, config: ExecutorConfig) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling `token` kills any running invocation
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute a git command with no path arguments
    ///
    /// Example: `executor.exec_safe(&["status", "--porcelain=v2"])`
    pub async fn exec_safe(&self, args: &[&str]) -> GitResult<String> {
        self.exec_with_paths(args, &[]).await
    }

    /// Execute a git command, passing `paths` after a literal `--`
    pub async fn exec_with_paths(&self, args: &[&str], paths: &[&str]) -> GitResult<String> {
        self.run_git(
            args.iter().map(|a| a.to_string()).collect(),
            paths.iter().map(|p| p.to_string()).collect(),
        )
        .await
    }

    async fn run(&self, args: &[String], paths: &[String]) -> GitResult<String> {
        validate_args(args)?;
        for path in paths {
            validate_file_path(path)?;
        }

        let subcommand = args.first().cloned().unwrap_or_default();
        if self.cancel.is_cancelled() {
            return Err(GitError::Cancelled { subcommand });
        }

        let argv = build_argv(args, paths);
        let mut command = Command::new(&self.config.git_binary);
        command
            .args(&argv)
            .current_dir(&self.repo_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for var in SCRUBBED_ENV {
            command.env_remove(var);
        }
        command.envs(FIXED_ENV.iter().copied());
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let child = command.spawn().map_err(|e| {
            ExecutionError::from_io("failed to spawn git", &e, Some(self.repo_path.as_path()))
        })?;
        let mut guard = ChildGuard::new(child);

        let (Some(stdout), Some(stderr)) = (guard.child.stdout.take(), guard.child.stderr.take())
        else {
            guard.terminate().await;
            return Err(ExecutionError::new(
                ExecutionFailure::Io,
                "git output pipes unavailable",
                None,
            )
            .into());
        };

        let outcome = {
            let capture = capture_output(
                &mut guard.child,
                stdout,
                stderr,
                self.config.max_output_bytes,
            );
            tokio::select! {
                result = capture => Outcome::Finished(result),
                _ = tokio::time::sleep(self.config.timeout) => Outcome::TimedOut,
                _ = self.cancel.cancelled() => Outcome::Cancelled,
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Outcome::Finished(Ok(captured)) => {
                guard.reaped = true;
                self.finish(&subcommand, captured, elapsed_ms)
            }
            Outcome::Finished(Err(CaptureError::Overflow)) => {
                guard.terminate().await;
                warn!(
                    subcommand = %subcommand,
                    limit = self.config.max_output_bytes,
                    "git output exceeded limit"
                );
                Err(GitError::BufferExceeded {
                    subcommand,
                    limit: self.config.max_output_bytes,
                })
            }
            Outcome::Finished(Err(CaptureError::Io(e))) => {
                guard.terminate().await;
                let repo_root = Some(self.repo_path.as_path());
                Err(ExecutionError::from_io("failed to read git output", &e, repo_root).into())
            }
            Outcome::TimedOut => {
                guard.terminate().await;
                warn!(
                    subcommand = %subcommand,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "git timed out"
                );
                Err(GitError::Timeout {
                    subcommand,
                    timeout: self.config.timeout,
                })
            }
            Outcome::Cancelled => {
                guard.terminate().await;
                warn!(subcommand = %subcommand, "git cancelled");
                Err(GitError::Cancelled { subcommand })
            }
        }
    }

    fn finish(&self, subcommand: &str, captured: Captured, elapsed_ms: u64) -> GitResult<String> {
        let Captured {
            status,
            stdout,
            stderr,
        } = captured;
        debug!(subcommand, exit_code = ?status.code(), elapsed_ms, "git finished");

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                format!("git {} failed", subcommand)
            } else {
                format!("git {} failed: {}", subcommand, stderr)
            };
            return Err(ExecutionError::new(
                ExecutionFailure::NonZeroExit {
                    code: status.code(),
                },
                &message,
                Some(self.repo_path.as_path()),
            )
            .into());
        }

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

#[async_trait]
impl GitRunner for SafeExecutor {
    async fn run_git(&self, args: Vec<String>, paths: Vec<String>) -> GitResult<String> {
        self.run(&args, &paths).await
    }

    fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}

/// Full argv: hardening options, caller args, then `--` and paths
///
/// Pathspec subcommands always get `--` so a revision is never read as a
/// path and a path is never read as an option.
pub(crate) fn build_argv(args: &[String], paths: &[String]) -> Vec<String> {
    let mut argv: Vec<String> = HARDENING_ARGS.iter().map(|a| a.to_string()).collect();
    argv.extend(args.iter().cloned());

    let takes_pathspec = args
        .first()
        .is_some_and(|sub| PATHSPEC_SUBCOMMANDS.contains(&sub.as_str()));
    if takes_pathspec || !paths.is_empty() {
        argv.push("--".to_string());
        argv.extend(paths.iter().cloned());
    }

    argv
}

enum Outcome {
    Finished(Result<Captured, CaptureError>),
    TimedOut,
    Cancelled,
}

struct Captured {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

enum CaptureError {
    Overflow,
    Io(io::Error),
}

impl From<io::Error> for CaptureError {
    fn from(e: io::Error) -> Self {
        CaptureError::Io(e)
    }
}

async fn capture_output<O, E>(
    child: &mut Child,
    stdout: O,
    stderr: E,
    limit: usize,
) -> Result<Captured, CaptureError>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let (stdout, stderr) = tokio::try_join!(
        read_capped(stdout, limit),
        read_truncated(stderr, MAX_STDERR_BYTES)
    )?;
    let status = child.wait().await?;
    Ok(Captured {
        status,
        stdout,
        stderr,
    })
}

/// Read to EOF, failing as soon as more than `limit` bytes arrive
async fn read_capped<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
) -> Result<Vec<u8>, CaptureError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        if buf.len() + n > limit {
            return Err(CaptureError::Overflow);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Read to EOF, keeping only the first `limit` bytes
async fn read_truncated<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
) -> Result<Vec<u8>, CaptureError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        let room = limit.saturating_sub(buf.len());
        buf.extend_from_slice(&chunk[..n.min(room)]);
    }
}

/// Kills the child's process group unless it has been reaped
struct ChildGuard {
    child: Child,
    pid: Option<u32>,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        let pid = child.id();
        Self {
            child,
            pid,
            reaped: false,
        }
    }

    fn kill(&mut self) {
        if let Some(pid) = self.pid {
            kill_process_group(pid);
        }
        let _ = self.child.start_kill();
    }

    async fn terminate(&mut self) {
        self.kill();
        if tokio::time::timeout(REAP_TIMEOUT, self.child.wait())
            .await
            .is_err()
        {
            warn!(pid = ?self.pid, "git did not exit after SIGKILL");
        }
        self.reaped = true;
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            self.kill();
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg has no memory-safety preconditions. The group was
    // created for this child by process_group(0) and the child has not been
    // reaped, so the id cannot have been reused.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
