use serde::{Deserialize, Serialize};

use super::unquote_path;

/// How a file changed in a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Context,
    Addition,
    Deletion,
    /// `\ No newline at end of file`
    NoNewline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: LineKind,
    /// Line text without the leading marker
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// The full `@@ ... @@` line, including any function context
    pub header: String,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    pub path: String,
    /// Previous path of a rename or copy
    pub old_path: Option<String>,
    pub change: ChangeKind,
    pub is_binary: bool,
    pub hunks: Vec<DiffHunk>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffStats {
    pub files_changed: usize,
    pub additions: usize,
    pub deletions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDiff {
    pub stats: DiffStats,
    pub files: Vec<FileDiff>,
}

impl ParsedDiff {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// File being assembled while its header and hunks are read
struct PendingFile {
    old_path: Option<String>,
    new_path: Option<String>,
    change: ChangeKind,
    is_binary: bool,
    hunks: Vec<DiffHunk>,
}

impl PendingFile {
    fn from_header(rest: &str) -> Self {
        let (old_path, new_path) = match split_header_paths(rest) {
            Some((old, new)) => (Some(old), Some(new)),
            None => (None, None),
        };
        Self {
            old_path,
            new_path,
            change: ChangeKind::Modified,
            is_binary: false,
            hunks: Vec::new(),
        }
    }

    fn finish(self) -> Option<FileDiff> {
        let path = match self.change {
            ChangeKind::Deleted => self.old_path.clone().or_else(|| self.new_path.clone()),
            _ => self.new_path.clone().or_else(|| self.old_path.clone()),
        }?;
        let old_path = match self.change {
            ChangeKind::Renamed | ChangeKind::Copied => self.old_path,
            _ => None,
        };

        Some(FileDiff {
            path,
            old_path,
            change: self.change,
            is_binary: self.is_binary,
            hunks: self.hunks,
        })
    }
}

/// Parse unified diff output into per-file hunks and aggregate stats
///
/// Hunk membership is decided by the line counts in each hunk header, so
/// content lines that look like headers (`--- a`, `diff --git`) stay in
/// their hunk.
pub fn parse_diff(output: &str) -> ParsedDiff {
    let mut files = Vec::new();
    let mut current: Option<PendingFile> = None;
    let mut old_remaining = 0u32;
    let mut new_remaining = 0u32;

    for line in output.lines() {
        if (old_remaining > 0 || new_remaining > 0)
            && let Some(hunk) = current.as_mut().and_then(|f| f.hunks.last_mut())
        {
            let kind = match line.as_bytes().first() {
                None | Some(b' ') => Some(LineKind::Context),
                Some(b'-') => Some(LineKind::Deletion),
                Some(b'+') => Some(LineKind::Addition),
                Some(b'\\') => Some(LineKind::NoNewline),
                _ => None,
            };

            if let Some(kind) = kind {
                match kind {
                    LineKind::Context => {
                        old_remaining = old_remaining.saturating_sub(1);
                        new_remaining = new_remaining.saturating_sub(1);
                    }
                    LineKind::Deletion => old_remaining = old_remaining.saturating_sub(1),
                    LineKind::Addition => new_remaining = new_remaining.saturating_sub(1),
                    LineKind::NoNewline => {}
                }
                hunk.lines.push(DiffLine {
                    kind,
                    content: line.get(1..).unwrap_or_default().to_string(),
                });
                continue;
            }

            // Truncated hunk; fall through to header handling
            old_remaining = 0;
            new_remaining = 0;
        }

        if let Some(rest) = line
            .strip_prefix("diff --git ")
            .or_else(|| line.strip_prefix("diff --cc "))
            .or_else(|| line.strip_prefix("diff --combined "))
        {
            if let Some(file) = current.take().and_then(PendingFile::finish) {
                files.push(file);
            }
            current = Some(if line.starts_with("diff --git ") {
                PendingFile::from_header(rest)
            } else {
                let path = unquote_path(rest);
                PendingFile {
                    old_path: Some(path.clone()),
                    new_path: Some(path),
                    change: ChangeKind::Modified,
                    is_binary: false,
                    hunks: Vec::new(),
                }
            });
            continue;
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if line.starts_with("@@ ") {
            if let Some(hunk) = parse_hunk_header(line) {
                old_remaining = hunk.old_lines;
                new_remaining = hunk.new_lines;
                file.hunks.push(hunk);
            }
        } else if line.starts_with('\\') {
            if let Some(hunk) = file.hunks.last_mut() {
                hunk.lines.push(DiffLine {
                    kind: LineKind::NoNewline,
                    content: line.get(1..).unwrap_or_default().to_string(),
                });
            }
        } else if !file.hunks.is_empty() {
            // Lines after a hunk that are not a new header belong to nothing
        } else if let Some(path) = line.strip_prefix("--- ") {
            match side_path(path, "a/") {
                Some(path) => file.old_path = Some(path),
                None => file.change = ChangeKind::Added,
            }
        } else if let Some(path) = line.strip_prefix("+++ ") {
            match side_path(path, "b/") {
                Some(path) => file.new_path = Some(path),
                None => file.change = ChangeKind::Deleted,
            }
        } else if let Some(path) = line.strip_prefix("rename from ") {
            file.change = ChangeKind::Renamed;
            file.old_path = Some(unquote_path(path));
        } else if let Some(path) = line.strip_prefix("rename to ") {
            file.change = ChangeKind::Renamed;
            file.new_path = Some(unquote_path(path));
        } else if let Some(path) = line.strip_prefix("copy from ") {
            file.change = ChangeKind::Copied;
            file.old_path = Some(unquote_path(path));
        } else if let Some(path) = line.strip_prefix("copy to ") {
            file.change = ChangeKind::Copied;
            file.new_path = Some(unquote_path(path));
        } else if line.starts_with("new file mode ") {
            file.change = ChangeKind::Added;
        } else if line.starts_with("deleted file mode ") {
            file.change = ChangeKind::Deleted;
        } else if line.starts_with("Binary files ") || line == "GIT binary patch" {
            file.is_binary = true;
        }
    }

    if let Some(file) = current.take().and_then(PendingFile::finish) {
        files.push(file);
    }

    let mut stats = DiffStats {
        files_changed: files.len(),
        ..DiffStats::default()
    };
    for line in files.iter().flat_map(|f| &f.hunks).flat_map(|h| &h.lines) {
        match line.kind {
            LineKind::Addition => stats.additions += 1,
            LineKind::Deletion => stats.deletions += 1,
            _ => {}
        }
    }

    ParsedDiff { stats, files }
}

/// Parse `@@ -a,b +c,d @@ context` into an empty hunk
fn parse_hunk_header(line: &str) -> Option<DiffHunk> {
    let rest = line.strip_prefix("@@ ")?;
    let (ranges, _) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(' ')?;

    let (old_start, old_lines) = parse_range(old.strip_prefix('-')?)?;
    let (new_start, new_lines) = parse_range(new.strip_prefix('+')?)?;

    Some(DiffHunk {
        old_start,
        old_lines,
        new_start,
        new_lines,
        header: line.to_string(),
        lines: Vec::new(),
    })
}

/// `start,count` or `start` (count defaults to 1)
fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Path from a `---`/`+++` line; `None` for `/dev/null`
fn side_path(raw: &str, prefix: &str) -> Option<String> {
    // git appends a tab when the name contains a space
    let raw = raw.strip_suffix('\t').unwrap_or(raw);
    if raw == "/dev/null" {
        return None;
    }
    let path = unquote_path(raw);
    Some(path.strip_prefix(prefix).map(str::to_string).unwrap_or(path))
}

/// Best-effort split of `a/<old> b/<new>` from a `diff --git` line
///
/// Exact for quoted names and for unrenamed files; the `---`/`+++` and
/// `rename` lines override the guess when present.
fn split_header_paths(rest: &str) -> Option<(String, String)> {
    if rest.starts_with('"') {
        let end = quoted_end(rest)?;
        let old = unquote_path(rest.get(..=end)?);
        let new_raw = rest.get(end + 1..)?.trim_start();
        let new = unquote_path(new_raw);
        return Some((
            old.strip_prefix("a/")?.to_string(),
            new.strip_prefix("b/")?.to_string(),
        ));
    }

    // Same path on both sides: "a/P b/P"
    if rest.len() % 2 == 1 {
        let mid = rest.len() / 2;
        if let (Some(old), Some(" "), Some(new)) =
            (rest.get(..mid), rest.get(mid..=mid), rest.get(mid + 1..))
            && let (Some(old), Some(new)) = (old.strip_prefix("a/"), new.strip_prefix("b/"))
            && old == new
        {
            return Some((old.to_string(), new.to_string()));
        }
    }

    let (old, new) = rest.rsplit_once(" b/")?;
    let new = if new.starts_with('"') {
        unquote_path(new)
    } else {
        new.to_string()
    };
    Some((old.strip_prefix("a/")?.to_string(), new))
}

/// Byte index of the closing quote of a leading quoted string
fn quoted_end(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate().skip(1) {
        match b {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(i),
            _ => {}
        }
    }
    None
}
