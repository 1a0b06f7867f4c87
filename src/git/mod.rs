pub mod executor;
pub mod parser;
pub mod repository;
pub mod version;

// Re-export commonly used types
pub use executor::{ExecutorConfig, GitRunner, SafeExecutor};
pub use parser::{
    BranchInfo, ChangeKind, ChangeStatus, ChangedFile, Commit, DiffHunk, DiffLine, DiffStats,
    FileDiff, GitStatus, LineKind, ParsedDiff, RenamedFile, RepoOperation, RepositoryInfo,
};
pub use repository::Repository;
pub use version::GitVersion;
