// Test to ensure the security allowlists stay read-only and consistent with
// the commands the repository layer issues

use gitctx::security::{
    ALLOWED_GIT_SUBCOMMANDS, ArgValidator, LOG_FORMAT_FLAG, PATHSPEC_SUBCOMMANDS,
    POSITIONAL_FREE_SUBCOMMANDS, SAFE_FLAGS, SAFE_NUMERIC_FLAG_PREFIXES, validate_args,
};
use std::collections::HashSet;

#[test]
fn test_allowlist_is_exactly_the_read_only_set() {
    let allowed: HashSet<&str> = ALLOWED_GIT_SUBCOMMANDS.iter().copied().collect();
    let expected: HashSet<&str> = ["status", "log", "diff", "rev-parse", "remote", "version"]
        .into_iter()
        .collect();

    assert_eq!(allowed, expected);
}

#[test]
fn test_allowlist_has_no_write_operations() {
    let write_ops = [
        "add", "commit", "checkout", "switch", "restore", "reset", "revert", "merge", "rebase",
        "cherry-pick", "stash", "clean", "push", "pull", "fetch", "clone", "config", "tag",
        "branch", "gc", "am", "apply", "submodule", "worktree", "update-ref",
    ];

    for op in &write_ops {
        assert!(
            !ALLOWED_GIT_SUBCOMMANDS.contains(op),
            "Write operation '{}' must not be allowlisted",
            op
        );
    }
}

#[test]
fn test_validator_uses_shared_allowlist() {
    let validator = ArgValidator::new();

    // Test that validator accepts all subcommands in the shared allowlist
    for subcommand in ALLOWED_GIT_SUBCOMMANDS {
        let result = validator.validate(&[*subcommand]);
        assert!(
            result.is_ok(),
            "Validator rejected allowed subcommand '{}': {:?}",
            subcommand,
            result.err()
        );
    }
}

#[test]
fn test_helper_lists_are_subsets_of_allowlist() {
    for subcommand in PATHSPEC_SUBCOMMANDS.iter().chain(POSITIONAL_FREE_SUBCOMMANDS) {
        assert!(
            ALLOWED_GIT_SUBCOMMANDS.contains(subcommand),
            "'{}' is not allowlisted",
            subcommand
        );
    }
}

#[test]
fn test_safe_flags_exclude_dangerous_options() {
    let dangerous = [
        "--output",
        "--ext-diff",
        "--textconv",
        "--upload-pack",
        "--exec",
        "--exec-path",
        "--git-dir",
        "--work-tree",
        "-c",
        "--open-files-in-pager",
    ];

    for flag in &dangerous {
        assert!(!SAFE_FLAGS.contains(flag), "'{}' must not be safe", flag);
        assert!(
            !SAFE_FLAGS.iter().any(|safe| safe.starts_with(&format!("{}=", flag))),
            "'{}=...' must not be safe",
            flag
        );
    }
}

#[test]
fn test_every_safe_flag_is_accepted() {
    let validator = ArgValidator::new();

    for flag in SAFE_FLAGS {
        assert!(validator.is_safe_flag(flag), "'{}' rejected", flag);
    }
    assert!(validator.is_safe_flag(LOG_FORMAT_FLAG));
    for prefix in SAFE_NUMERIC_FLAG_PREFIXES {
        assert!(validator.is_safe_flag(&format!("{}10", prefix)));
        assert!(!validator.is_safe_flag(&format!("{}-1", prefix)));
        assert!(!validator.is_safe_flag(prefix));
    }
}

#[test]
fn test_log_command_is_accepted() {
    assert!(SAFE_FLAGS.contains(&"-z"));
    assert!(!LOG_FORMAT_FLAG.contains("%x1e"));
    assert!(!LOG_FORMAT_FLAG.contains("%x1f"));

    let args = ["log", "-z", "--max-count=10", "--no-color", LOG_FORMAT_FLAG, "HEAD"];
    assert!(validate_args(&args).is_ok(), "{:?}", validate_args(&args).err());
}

#[test]
fn test_no_duplicates_in_allowlists() {
    let mut seen = HashSet::new();
    for cmd in ALLOWED_GIT_SUBCOMMANDS {
        assert!(seen.insert(cmd), "Duplicate subcommand in allowlist: {}", cmd);
    }

    let mut seen = HashSet::new();
    for flag in SAFE_FLAGS {
        assert!(seen.insert(flag), "Duplicate safe flag: {}", flag);
    }
}
