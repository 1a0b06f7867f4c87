use std::env;
use std::path::{Path, PathBuf};

use crate::error::{ExecutionError, ExecutionFailure, GitError, GitResult};
use crate::git::executor::{ExecutorConfig, GitRunner, SafeExecutor};
use crate::git::parser::{
    self, BranchInfo, Commit, ParsedDiff, RepoLocation, RepoOperation, StatusEntry,
};
use crate::security::validator::validate_revision;
use crate::security::LOG_FORMAT_FLAG;

/// A git repository and one read-only query per context section
#[derive(Debug)]
pub struct Repository<R = SafeExecutor> {
    path: PathBuf,
    runner: R,
}

impl Repository<SafeExecutor> {
    /// Detect git repository from current working directory
    pub fn discover() -> GitResult<Self> {
        let current_dir = env::current_dir().map_err(|e| {
            ExecutionError::from_io("cannot read current directory", &e, None)
        })?;

        Self::discover_from(&current_dir)
    }

    /// Detect git repository starting from a specific directory
    pub fn discover_from<P: AsRef<Path>>(start_path: P) -> GitResult<Self> {
        let path = discover_root(start_path.as_ref())?;
        Ok(Self::new(path))
    }

    /// Create a Repository for a known work tree
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_config(path, ExecutorConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(path: P, config: ExecutorConfig) -> Self {
        let path = path.as_ref().to_path_buf();
        let runner = SafeExecutor::with_config(&path, config);

        Self { path, runner }
    }
}

impl<R: GitRunner> Repository<R> {
    /// Wrap an arbitrary runner; its directory becomes the repository path
    pub fn with_runner(runner: R) -> Self {
        Self {
            path: runner.repo_path().to_path_buf(),
            runner,
        }
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn git(&self, args: &[&str], paths: &[String]) -> GitResult<String> {
        self.runner
            .run_git(args.iter().map(|a| a.to_string()).collect(), paths.to_vec())
            .await
    }

    /// Work tree root and absolute git directory
    pub async fn location(&self) -> GitResult<RepoLocation> {
        let output = self
            .git(&["rev-parse", "--show-toplevel", "--absolute-git-dir"], &[])
            .await?;
        parser::parse_rev_parse(&output).ok_or_else(|| {
            ExecutionError::unexpected_output("rev-parse printed no repository location").into()
        })
    }

    /// Preferred remote URL with credentials masked
    pub async fn remote_url(&self) -> GitResult<Option<String>> {
        let output = self.git(&["remote", "-v"], &[]).await?;
        Ok(parser::parse_remote_url(&output))
    }

    /// Operation in progress, from marker files in the git directory
    pub fn operation(&self, location: &RepoLocation) -> RepoOperation {
        RepoOperation::from_markers(|name| location.git_dir.join(name).exists())
    }

    pub async fn branch(&self) -> GitResult<BranchInfo> {
        let output = self
            .git(
                &["status", "--porcelain=v2", "--branch", "-z", "--untracked-files=no"],
                &[],
            )
            .await?;
        parser::parse_branch_headers(&output).ok_or_else(|| {
            ExecutionError::unexpected_output("status printed no branch header").into()
        })
    }

    /// Status entries, optionally restricted to `paths`
    pub async fn status_entries(&self, paths: &[String]) -> GitResult<Vec<StatusEntry>> {
        let output = self
            .git(
                &["status", "--porcelain=v2", "-z", "--untracked-files=all"],
                paths,
            )
            .await?;
        Ok(parser::parse_status_porcelain_v2(&output))
    }

    /// Whether HEAD resolves to a commit; false on an unborn branch
    pub async fn head_exists(&self) -> GitResult<bool> {
        match self
            .git(&["rev-parse", "--verify", "--quiet", "HEAD"], &[])
            .await
        {
            Ok(_) => Ok(true),
            Err(err)
                if err.execution_failure()
                    == Some(ExecutionFailure::NonZeroExit { code: Some(1) }) =>
            {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Up to `count` commits reachable from HEAD, newest first
    pub async fn recent_commits(&self, count: usize) -> GitResult<Vec<Commit>> {
        if count == 0 || !self.head_exists().await? {
            return Ok(Vec::new());
        }

        let max_count = format!("--max-count={}", count);
        let output = self
            .git(
                &["log", "-z", &max_count, "--no-color", LOG_FORMAT_FLAG, "HEAD"],
                &[],
            )
            .await?;
        Ok(parser::parse_log(&output, count))
    }

    /// Working tree and index against `base`, HEAD, or the empty tree
    ///
    /// Without a base the diff is against HEAD; on an unborn branch only the
    /// index can be compared.
    pub async fn diff(
        &self,
        context_lines: u32,
        base: Option<&str>,
        paths: &[String],
    ) -> GitResult<ParsedDiff> {
        let unified = format!("--unified={}", context_lines);
        let mut args = vec![
            "diff",
            "--no-color",
            "--no-ext-diff",
            "--no-textconv",
            "--find-renames",
            "--src-prefix=a/",
            "--dst-prefix=b/",
            unified.as_str(),
        ];

        match base {
            Some(base) => {
                validate_revision(base)?;
                args.push(base);
            }
            None if self.head_exists().await? => args.push("HEAD"),
            None => args.push("--cached"),
        }

        let output = self.git(&args, paths).await?;
        Ok(parser::parse_diff(&output))
    }
}

/// Walk up from `start` to the first directory containing `.git`
pub fn discover_root(start: &Path) -> GitResult<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        // `.git` is a directory, or a file for worktrees and submodules
        if current.join(".git").exists() {
            return Ok(current);
        }

        if !current.pop() {
            return Err(GitError::not_a_repository(start));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(repo_path: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(repo_path)
            .output()
            .unwrap()
            .status;
        assert!(status.success(), "git {:?} failed", args);
    }

    fn create_test_repo() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path().to_path_buf();

        git(&repo_path, &["init", "-q"]);
        git(&repo_path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&repo_path, &["config", "user.name", "Test User"]);
        git(&repo_path, &["config", "user.email", "test@example.com"]);
        git(&repo_path, &["config", "commit.gpgsign", "false"]);

        (temp_dir, repo_path)
    }

    fn commit_file(repo_path: &Path, name: &str, content: &str, message: &str) {
        fs::write(repo_path.join(name), content).unwrap();
        git(repo_path, &["add", name]);
        git(repo_path, &["commit", "-q", "-m", message]);
    }

    #[test]
    fn test_discover_from_subdirectory() {
        let (_temp, repo_path) = create_test_repo();

        let sub_dir = repo_path.join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let repo = Repository::discover_from(&sub_dir).unwrap();
        assert_eq!(repo.path(), repo_path.as_path());
    }

    #[test]
    fn test_discover_not_a_repo() {
        let temp_dir = TempDir::new().unwrap();
        let result = Repository::discover_from(temp_dir.path());

        let err = result.unwrap_err();
        assert_eq!(
            err.execution_failure(),
            Some(ExecutionFailure::NotARepository)
        );
    }

    #[tokio::test]
    async fn test_empty_repo() {
        let (_temp, repo_path) = create_test_repo();
        let repo = Repository::new(&repo_path);

        assert!(!repo.head_exists().await.unwrap());
        assert_eq!(
            repo.branch().await.unwrap(),
            BranchInfo::Unborn {
                current: "main".to_string()
            }
        );
        assert!(repo.recent_commits(10).await.unwrap().is_empty());
        assert!(repo.status_entries(&[]).await.unwrap().is_empty());
        assert!(repo.diff(3, None, &[]).await.unwrap().is_empty());
        assert_eq!(repo.remote_url().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_location() {
        let (_temp, repo_path) = create_test_repo();
        let repo = Repository::new(&repo_path);

        let location = repo.location().await.unwrap();
        assert_eq!(
            location.root.canonicalize().unwrap(),
            repo_path.canonicalize().unwrap()
        );
        assert!(location.git_dir.ends_with(".git"));
        assert_eq!(repo.operation(&location), RepoOperation::None);
    }

    #[tokio::test]
    async fn test_commits_and_diff() {
        let (_temp, repo_path) = create_test_repo();
        commit_file(&repo_path, "a.txt", "one\n", "First");
        commit_file(&repo_path, "a.txt", "one\ntwo\n", "Second");
        let repo = Repository::new(&repo_path);

        let commits = repo.recent_commits(10).await.unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].message, "Second");
        assert_eq!(commits[0].author, "Test User");
        assert_eq!(repo.recent_commits(1).await.unwrap().len(), 1);

        fs::write(repo_path.join("a.txt"), "one\ntwo\nthree\n").unwrap();
        let diff = repo.diff(3, None, &[]).await.unwrap();
        assert_eq!(diff.files.len(), 1);
        assert_eq!(diff.stats.additions, 1);

        let diff = repo
            .diff(0, Some(commits[1].hash.as_str()), &[])
            .await
            .unwrap();
        assert_eq!(diff.stats.additions, 2);
    }

    #[tokio::test]
    async fn test_staged_file_in_unborn_repo() {
        let (_temp, repo_path) = create_test_repo();
        fs::write(repo_path.join("staged.txt"), "staged content\n").unwrap();
        git(&repo_path, &["add", "staged.txt"]);
        let repo = Repository::new(&repo_path);

        let entries = repo.status_entries(&[]).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].index, 'A');

        let diff = repo.diff(3, None, &[]).await.unwrap();
        assert_eq!(diff.files[0].path, "staged.txt");
    }

    #[tokio::test]
    async fn test_diff_rejects_bad_base() {
        let (_temp, repo_path) = create_test_repo();
        let repo = Repository::new(&repo_path);

        let err = repo.diff(3, Some("--output=/tmp/x"), &[]).await.unwrap_err();
        assert!(matches!(err, GitError::Validation(_)));
    }
}
