use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::security::sanitizer::sanitize_error_text;
use crate::security::{
    ALLOWED_GIT_SUBCOMMANDS, POSITIONAL_FREE_SUBCOMMANDS, SAFE_FLAGS, SAFE_NUMERIC_FLAG_PREFIXES,
};

/// Characters with meaning to a POSIX shell
pub const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '$', '(', ')', '`', '<', '>'];

/// Longest offending value kept in an error, in characters
const MAX_REPORTED_VALUE_CHARS: usize = 120;

static BRANCH_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9/_-]+$").expect("static regex: branch name")
});

static COMMIT_HASH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-f0-9]{40}$").expect("static regex: commit hash")
});

/// The rule an input broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationRule {
    EmptyInput,
    BranchName,
    CommitHash,
    PathTraversal,
    AbsolutePath,
    LeadingDash,
    ShellMetacharacter,
    ControlCharacter,
    DisallowedFlag,
    DisallowedSubcommand,
    UnexpectedPositional,
    OutOfRange,
}

impl ValidationRule {
    /// Stable machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationRule::EmptyInput => "empty_input",
            ValidationRule::BranchName => "branch_name",
            ValidationRule::CommitHash => "commit_hash",
            ValidationRule::PathTraversal => "path_traversal",
            ValidationRule::AbsolutePath => "absolute_path",
            ValidationRule::LeadingDash => "leading_dash",
            ValidationRule::ShellMetacharacter => "shell_metacharacter",
            ValidationRule::ControlCharacter => "control_character",
            ValidationRule::DisallowedFlag => "disallowed_flag",
            ValidationRule::DisallowedSubcommand => "disallowed_subcommand",
            ValidationRule::UnexpectedPositional => "unexpected_positional",
            ValidationRule::OutOfRange => "out_of_range",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ValidationRule::EmptyInput => "Empty input",
            ValidationRule::BranchName => "Invalid branch name",
            ValidationRule::CommitHash => "Invalid commit hash",
            ValidationRule::PathTraversal => "Path escapes the repository",
            ValidationRule::AbsolutePath => "Absolute paths are not allowed",
            ValidationRule::LeadingDash => "Value could be read as an option",
            ValidationRule::ShellMetacharacter => "Contains shell metacharacters",
            ValidationRule::ControlCharacter => "Contains control characters",
            ValidationRule::DisallowedFlag => "Flag is not allowed",
            ValidationRule::DisallowedSubcommand => "Git subcommand not allowed",
            ValidationRule::UnexpectedPositional => "Subcommand takes no positional arguments",
            ValidationRule::OutOfRange => "Value out of range",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// An input was refused before reaching the subprocess boundary
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{rule}: {value:?}")]
pub struct ValidationError {
    pub rule: ValidationRule,
    /// The offending value, already sanitized and length-capped
    pub value: String,
}

impl ValidationError {
    pub fn new(rule: ValidationRule, value: &str) -> Self {
        let cleaned = sanitize_error_text(value, None);
        let value = if cleaned.chars().count() > MAX_REPORTED_VALUE_CHARS {
            let mut short: String = cleaned.chars().take(MAX_REPORTED_VALUE_CHARS).collect();
            short.push_str("...");
            short
        } else {
            cleaned
        };

        Self { rule, value }
    }
}

/// Validates argument arrays against the read-only allowlists
#[derive(Debug, Clone)]
pub struct ArgValidator {
    allowed_subcommands: HashSet<&'static str>,
    positional_free: HashSet<&'static str>,
    safe_flags: HashSet<&'static str>,
}

impl ArgValidator {
    pub fn new() -> Self {
        Self {
            allowed_subcommands: ALLOWED_GIT_SUBCOMMANDS.iter().copied().collect(),
            positional_free: POSITIONAL_FREE_SUBCOMMANDS.iter().copied().collect(),
            safe_flags: SAFE_FLAGS.iter().copied().collect(),
        }
    }

    /// Validate a full argument array, subcommand first
    pub fn validate<S: AsRef<str>>(&self, args: &[S]) -> Result<(), ValidationError> {
        let Some(first) = args.first() else {
            return Err(ValidationError::new(ValidationRule::EmptyInput, ""));
        };

        // Check every element for injection before looking at meaning
        for arg in args {
            check_for_injection(arg.as_ref())?;
        }

        let subcommand = first.as_ref();
        if !self.allowed_subcommands.contains(subcommand) {
            return Err(ValidationError::new(
                ValidationRule::DisallowedSubcommand,
                subcommand,
            ));
        }

        for arg in &args[1..] {
            let arg = arg.as_ref();
            if arg.starts_with('-') {
                if !self.is_safe_flag(arg) {
                    return Err(ValidationError::new(ValidationRule::DisallowedFlag, arg));
                }
            } else if arg.is_empty() {
                return Err(ValidationError::new(ValidationRule::EmptyInput, arg));
            } else if self.positional_free.contains(subcommand) {
                return Err(ValidationError::new(
                    ValidationRule::UnexpectedPositional,
                    arg,
                ));
            }
        }

        Ok(())
    }

    /// Check whether a flag is on the allowlist
    pub fn is_safe_flag(&self, flag: &str) -> bool {
        if self.safe_flags.contains(flag) {
            return true;
        }

        SAFE_NUMERIC_FLAG_PREFIXES.iter().any(|prefix| {
            flag.strip_prefix(prefix).is_some_and(|value| {
                !value.is_empty() && value.len() <= 6 && value.bytes().all(|b| b.is_ascii_digit())
            })
        })
    }
}

impl Default for ArgValidator {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_VALIDATOR: LazyLock<ArgValidator> = LazyLock::new(ArgValidator::new);

/// Validate an argument array destined for git
pub fn validate_args<S: AsRef<str>>(args: &[S]) -> Result<(), ValidationError> {
    DEFAULT_VALIDATOR.validate(args)
}

/// Validate a branch name supplied by a caller
pub fn validate_branch_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new(ValidationRule::EmptyInput, name));
    }
    if name.starts_with('-') {
        return Err(ValidationError::new(ValidationRule::LeadingDash, name));
    }
    if !BRANCH_NAME_REGEX.is_match(name) || name.starts_with('/') || name.ends_with('/') {
        return Err(ValidationError::new(ValidationRule::BranchName, name));
    }

    Ok(())
}

/// Validate a full 40-character lowercase commit hash
pub fn validate_commit_hash(hash: &str) -> Result<(), ValidationError> {
    if COMMIT_HASH_REGEX.is_match(hash) {
        Ok(())
    } else {
        Err(ValidationError::new(ValidationRule::CommitHash, hash))
    }
}

/// Validate a revision: either a commit hash or a branch name
pub fn validate_revision(revision: &str) -> Result<(), ValidationError> {
    if validate_commit_hash(revision).is_ok() {
        return Ok(());
    }
    validate_branch_name(revision)
}

/// Validate a repository-relative file path
pub fn validate_file_path(path: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::new(ValidationRule::EmptyInput, path));
    }
    if path.chars().any(char::is_control) {
        return Err(ValidationError::new(ValidationRule::ControlCharacter, path));
    }
    if path.starts_with('-') {
        return Err(ValidationError::new(ValidationRule::LeadingDash, path));
    }

    let normalized = path.replace('\\', "/");
    if normalized.starts_with('/') || has_drive_prefix(&normalized) {
        return Err(ValidationError::new(ValidationRule::AbsolutePath, path));
    }

    let traverses = normalized
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .any(|segment| segment == "..");
    if traverses {
        return Err(ValidationError::new(ValidationRule::PathTraversal, path));
    }

    Ok(())
}

/// Check for shell syntax and control characters
fn check_for_injection(arg: &str) -> Result<(), ValidationError> {
    if arg.contains(SHELL_METACHARACTERS) {
        return Err(ValidationError::new(
            ValidationRule::ShellMetacharacter,
            arg,
        ));
    }
    if arg.chars().any(char::is_control) {
        return Err(ValidationError::new(ValidationRule::ControlCharacter, arg));
    }
    Ok(())
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
