//! Parsers that turn raw git output into typed structures.
//!
//! Every parser is pure and tolerant: malformed records are skipped and
//! irregular repository states map onto explicit variants.

pub mod branch;
pub mod diff;
pub mod log;
pub mod repository;
pub mod status;

pub use branch::{BranchInfo, parse_branch_headers};
pub use diff::{
    ChangeKind, DiffHunk, DiffLine, DiffStats, FileDiff, LineKind, ParsedDiff, parse_diff,
};
pub use log::{Commit, parse_log};
pub use repository::{
    RepoLocation, RepoOperation, RepositoryInfo, mask_url_credentials, parse_remote_url,
    parse_rev_parse,
};
pub use status::{
    ChangeStatus, ChangedFile, GitStatus, RecordKind, RenamedFile, StatusEntry,
    parse_status_porcelain_v2,
};

/// Split porcelain output into records, NUL-terminated (`-z`) or line-based
pub(crate) fn records(output: &str) -> Vec<&str> {
    if output.contains('\0') {
        output.split('\0').filter(|r| !r.is_empty()).collect()
    } else {
        output.lines().filter(|r| !r.is_empty()).collect()
    }
}

/// Undo git's C-style quoting of a path (`"a\tb"`, `"caf\303\251"`)
///
/// Unquoted input is returned unchanged.
pub(crate) fn unquote_path(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return raw.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.bytes().peekable();
    while let Some(b) = chars.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match chars.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'r') => bytes.push(b'\r'),
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b'f') => bytes.push(0x0c),
            Some(b'v') => bytes.push(0x0b),
            Some(d @ b'0'..=b'7') => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&next @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(next - b'0');
                            chars.next();
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xff) as u8);
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}
