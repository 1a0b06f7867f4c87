pub mod patterns;
pub mod sanitizer;
pub mod validator;

pub use sanitizer::{Sanitizer, sanitize_error_text, sanitize_for_ai};
pub use validator::{
    ArgValidator, ValidationError, ValidationRule, validate_args, validate_branch_name,
    validate_commit_hash, validate_file_path, validate_revision,
};

/// Allowlist of permitted git subcommands
///
/// Every entry is read-only. The executor refuses anything else, so adding a
/// subcommand here widens what the boundary can do to a repository and needs
/// careful review.
pub const ALLOWED_GIT_SUBCOMMANDS: &[&str] = &[
    "status",
    "log",
    "diff",
    "rev-parse",
    "remote",
    "version",
];

/// Subcommands that must not receive positional arguments
///
/// `remote add <name> <url>` would write config, so `remote` is only usable
/// in its listing form.
pub const POSITIONAL_FREE_SUBCOMMANDS: &[&str] = &["remote", "version"];

/// Subcommands whose trailing arguments are pathspecs
///
/// The executor always terminates option parsing with `--` for these.
pub const PATHSPEC_SUBCOMMANDS: &[&str] = &["status", "log", "diff"];

/// Pretty format used for `git log -z`: hash, author, ISO-8601 author date, body
///
/// The first three fields are git-generated and never contain a newline, so
/// each takes one line and the body takes the rest. Records are separated by
/// NUL, which git does not allow in commit messages.
pub const LOG_FORMAT_FLAG: &str = "--format=%H%n%an%n%aI%n%B";

/// Flags that may appear in an argument array
pub const SAFE_FLAGS: &[&str] = &[
    // status
    "--porcelain=v2",
    "--branch",
    "-z",
    "--untracked-files=all",
    "--untracked-files=normal",
    "--untracked-files=no",
    // log / diff
    "--no-color",
    "--no-ext-diff",
    "--no-textconv",
    "--cached",
    "--find-renames",
    "--src-prefix=a/",
    "--dst-prefix=b/",
    LOG_FORMAT_FLAG,
    // rev-parse
    "--verify",
    "--quiet",
    "--show-toplevel",
    "--absolute-git-dir",
    // remote
    "-v",
    "--verbose",
];

/// Flags that take a decimal value, e.g. `--max-count=10`
pub const SAFE_NUMERIC_FLAG_PREFIXES: &[&str] = &["--max-count=", "--unified="];
