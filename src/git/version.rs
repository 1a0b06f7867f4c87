use crate::error::{ExecutionError, ExecutionFailure, GitError, GitResult};
use crate::git::executor::GitRunner;

/// Minimum required git version
///
/// 2.13 is the first release with `--absolute-git-dir` and porcelain v2
/// branch headers.
const MIN_GIT_VERSION: (u32, u32) = (2, 13);

/// Represents a git version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// Detect the version of the git a runner invokes
    pub async fn detect<R: GitRunner + ?Sized>(runner: &R) -> GitResult<Self> {
        let output = runner.run_git(vec!["version".to_string()], Vec::new()).await?;
        Self::parse(&output)
    }

    /// Parse git version from string like "git version 2.39.2"
    pub fn parse(version_str: &str) -> GitResult<Self> {
        // Expected format: "git version X.Y.Z" or "git version X.Y.Z.windows.1" etc.
        let parts: Vec<&str> = version_str.split_whitespace().collect();

        if parts.len() < 3 || parts[0] != "git" || parts[1] != "version" {
            return Err(unexpected(&format!(
                "unexpected git version format: {}",
                version_str.trim()
            )));
        }

        let nums: Vec<&str> = parts[2].split('.').collect();
        if nums.len() < 2 {
            return Err(unexpected(&format!(
                "invalid version number format: {}",
                parts[2]
            )));
        }

        let major = nums[0]
            .parse::<u32>()
            .map_err(|_| unexpected(&format!("invalid major version: {}", nums[0])))?;

        let minor = nums[1]
            .parse::<u32>()
            .map_err(|_| unexpected(&format!("invalid minor version: {}", nums[1])))?;

        // Patch may carry a suffix such as "2-rc1"
        let patch = nums
            .get(2)
            .and_then(|p| {
                let digits: String = p.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().ok()
            })
            .unwrap_or(0);

        Ok(GitVersion {
            major,
            minor,
            patch,
        })
    }

    /// Check if this version meets minimum requirements
    pub fn is_supported(&self) -> bool {
        self.major > MIN_GIT_VERSION.0
            || (self.major == MIN_GIT_VERSION.0 && self.minor >= MIN_GIT_VERSION.1)
    }

    /// Detect the version and reject binaries older than the minimum
    pub async fn validate<R: GitRunner + ?Sized>(runner: &R) -> GitResult<Self> {
        let version = Self::detect(runner).await?;

        if !version.is_supported() {
            return Err(GitError::Execution(ExecutionError::new(
                ExecutionFailure::UnsupportedVersion,
                &format!(
                    "git {} is too old; {}.{} or newer is required",
                    version, MIN_GIT_VERSION.0, MIN_GIT_VERSION.1
                ),
                None,
            )));
        }

        Ok(version)
    }
}

fn unexpected(message: &str) -> GitError {
    GitError::Execution(ExecutionError::unexpected_output(message))
}

impl std::fmt::Display for GitVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
