//! Pattern tables used by the sanitizer.
//!
//! The regexes here are static and known to compile, so construction uses
//! `expect`. None of the replacement tokens (`[FILTERED]`, `[REDACTED]`,
//! `***`, `~`) can be matched by any pattern, which keeps sanitization
//! idempotent.

use regex::Regex;
use std::sync::LazyLock;

/// Replacement for prompt-injection phrasings and delimiters
pub const INJECTION_TOKEN: &str = "[FILTERED]";

/// Replacement for secrets and tokens
pub const SECRET_TOKEN: &str = "[REDACTED]";

/// Known prompt-injection phrasings and chat-template delimiters.
///
/// No pattern ends in a word boundary or end anchor: truncating text must
/// never turn a non-match into a match.
pub static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)ignore\s+(?:all\s+|any\s+)?(?:the\s+|your\s+)?(?:previous|prior|above|earlier|preceding)\s+(?:instructions?|prompts?|messages?|context|rules)",
        r"(?i)disregard\s+(?:all\s+|any\s+)?(?:the\s+|your\s+)?(?:previous|prior|above|earlier|preceding)\s+(?:instructions?|prompts?|messages?|context|rules)",
        r"(?i)forget\s+(?:all\s+|everything\s+)?(?:your\s+|the\s+)?(?:previous\s+|prior\s+)?instructions",
        r"(?i)override\s+(?:the\s+|your\s+)?(?:safety|system)\s+(?:rules|instructions|prompt)",
        r"(?i)system\s+prompt",
        r"(?i)new\s+instructions\s*:",
        r"(?im)^[ \t]*(?:system|assistant)[ \t]*:",
        r"<\|[A-Za-z0-9_]{1,32}\|>",
        r"(?i)\[/?INST\]",
        r"<</?SYS>>",
        r"(?i)</?(?:system|instructions?|assistant)>",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static regex: injection pattern"))
    .collect()
});

/// A secret shape and how to replace it
pub struct SecretPattern {
    pub name: &'static str,
    pub regex: &'static LazyLock<Regex>,
    pub replacement: &'static str,
}

static GITHUB_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bgh[pousr]_[A-Za-z0-9_]{36,}").expect("static regex: GitHub token pattern")
});

static GITHUB_PAT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bgithub_pat_[A-Za-z0-9_]{22,}").expect("static regex: GitHub PAT pattern")
});

static AWS_ACCESS_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bAKIA[0-9A-Z]{16}").expect("static regex: AWS access key pattern")
});

static SLACK_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bxox[baprs]-[A-Za-z0-9-]{10,}").expect("static regex: Slack token pattern")
});

static API_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bsk-(?:ant-)?[A-Za-z0-9_-]{20,}").expect("static regex: API key pattern")
});

static PRIVATE_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-----BEGIN [A-Z ]*PRIVATE KEY-----").expect("static regex: private key pattern")
});

static BEARER_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\bbearer\s+)[A-Za-z0-9_\-.=]{8,}")
        .expect("static regex: bearer token pattern")
});

static ASSIGNMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\b(?:password|passwd|pwd|secret|token|api[_-]?key)\s*[=:]\s*['"]?)[^\s'"\[]{8,}"#)
        .expect("static regex: secret assignment pattern")
});

/// Token shapes redacted from AI-facing text and error messages
pub fn secret_patterns() -> [SecretPattern; 8] {
    [
        SecretPattern {
            name: "GitHub Token",
            regex: &GITHUB_TOKEN_REGEX,
            replacement: SECRET_TOKEN,
        },
        SecretPattern {
            name: "GitHub Personal Access Token",
            regex: &GITHUB_PAT_REGEX,
            replacement: SECRET_TOKEN,
        },
        SecretPattern {
            name: "AWS Access Key ID",
            regex: &AWS_ACCESS_KEY_REGEX,
            replacement: SECRET_TOKEN,
        },
        SecretPattern {
            name: "Slack Token",
            regex: &SLACK_TOKEN_REGEX,
            replacement: SECRET_TOKEN,
        },
        SecretPattern {
            name: "API Key",
            regex: &API_KEY_REGEX,
            replacement: SECRET_TOKEN,
        },
        SecretPattern {
            name: "Private Key",
            regex: &PRIVATE_KEY_REGEX,
            replacement: SECRET_TOKEN,
        },
        SecretPattern {
            name: "Bearer Token",
            regex: &BEARER_TOKEN_REGEX,
            replacement: "${1}[REDACTED]",
        },
        SecretPattern {
            name: "Secret Assignment",
            regex: &ASSIGNMENT_REGEX,
            replacement: "${1}[REDACTED]",
        },
    ]
}

/// `scheme://user:password@` userinfo
pub static URL_CREDENTIALS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z0-9+.\-]*://)[^/@\s:]+:[^/@\s]*@")
        .expect("static regex: URL credentials pattern")
});

/// `http(s)://token@` userinfo without a password
pub static URL_USER_ONLY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://)[^/@\s:]+@").expect("static regex: URL user pattern")
});

/// Home directories of any user on Linux, macOS and Windows
pub static HOME_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(^|[^A-Za-z0-9._/~-])(?:/home/|/Users/|[A-Za-z]:\\Users\\)[^/\\\s'":]+"#)
        .expect("static regex: home prefix pattern")
});

/// Build a pattern matching one specific home directory
pub fn home_dir_regex(home: &str) -> Option<Regex> {
    let trimmed = home.trim_end_matches('/');
    if trimmed.len() < 2 {
        return None;
    }

    let pattern = format!(
        r"(^|[^A-Za-z0-9._/~-]){}(/|$|[^A-Za-z0-9._-])",
        regex::escape(trimmed)
    );
    Regex::new(&pattern).ok()
}

/// Build a pattern matching one specific repository root
///
/// Group 2 captures the separator when a path inside the root follows, group
/// 3 the boundary after the bare root. Sibling directories sharing the root
/// as a prefix (`repo2` for `repo`) do not match.
pub fn repo_root_regex(root: &str) -> Option<Regex> {
    let trimmed = root.trim_end_matches('/');
    if trimmed.len() < 2 {
        return None;
    }

    let pattern = format!(
        r"(^|[^A-Za-z0-9._/~-]){}(?:(/)|($|[^A-Za-z0-9._/-]))",
        regex::escape(trimmed)
    );
    Regex::new(&pattern).ok()
}
