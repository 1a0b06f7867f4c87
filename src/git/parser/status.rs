use serde::{Deserialize, Serialize};

use super::records;

/// Porcelain v2 record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// `1` ordinary changed entry
    Ordinary,
    /// `2` renamed or copied entry
    RenameOrCopy,
    /// `u` unmerged entry
    Unmerged,
    /// `?` untracked path
    Untracked,
}

/// A single entry from `git status --porcelain=v2`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub kind: RecordKind,
    /// Index status letter (`.` when unchanged)
    pub index: char,
    /// Worktree status letter (`.` when unchanged)
    pub worktree: char,
    pub path: String,
    /// Source path of a rename or copy
    pub orig_path: Option<String>,
}

impl StatusEntry {
    fn new(kind: RecordKind, xy: &str, path: &str) -> Option<Self> {
        let mut letters = xy.chars();
        let index = letters.next()?;
        let worktree = letters.next()?;
        if path.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            index,
            worktree,
            path: path.to_string(),
            orig_path: None,
        })
    }

    pub fn is_deletion(&self) -> bool {
        self.index == 'D' || self.worktree == 'D'
    }
}

/// Parse `git status --porcelain=v2` output, with or without `-z`
///
/// Header (`#`) and ignored (`!`) records are skipped, as are malformed
/// records.
pub fn parse_status_porcelain_v2(output: &str) -> Vec<StatusEntry> {
    let nul_terminated = output.contains('\0');
    let mut entries = Vec::new();
    let mut iter = records(output).into_iter();

    while let Some(record) = iter.next() {
        let Some((tag, rest)) = record.split_once(' ') else {
            continue;
        };

        match tag {
            "1" => {
                // 1 <XY> <sub> <mH> <mI> <mW> <hH> <hI> <path>
                let fields: Vec<&str> = rest.splitn(8, ' ').collect();
                if fields.len() == 8
                    && let Some(entry) = StatusEntry::new(RecordKind::Ordinary, fields[0], fields[7])
                {
                    entries.push(entry);
                }
            }
            "2" => {
                // 2 <XY> <sub> <mH> <mI> <mW> <hH> <hI> <Xscore> <path><sep><origPath>
                let fields: Vec<&str> = rest.splitn(9, ' ').collect();
                if fields.len() != 9 {
                    continue;
                }
                let (path, orig) = if nul_terminated {
                    (fields[8], iter.next())
                } else {
                    match fields[8].split_once('\t') {
                        Some((path, orig)) => (path, Some(orig)),
                        None => (fields[8], None),
                    }
                };
                let Some(orig) = orig else {
                    continue;
                };
                if let Some(mut entry) = StatusEntry::new(RecordKind::RenameOrCopy, fields[0], path)
                {
                    entry.orig_path = Some(orig.to_string());
                    entries.push(entry);
                }
            }
            "u" => {
                // u <XY> <sub> <m1> <m2> <m3> <mW> <h1> <h2> <h3> <path>
                let fields: Vec<&str> = rest.splitn(10, ' ').collect();
                if fields.len() == 10
                    && let Some(entry) = StatusEntry::new(RecordKind::Unmerged, fields[0], fields[9])
                {
                    entries.push(entry);
                }
            }
            "?" => {
                if let Some(entry) = StatusEntry::new(RecordKind::Untracked, "??", rest) {
                    entries.push(entry);
                }
            }
            _ => {}
        }
    }

    entries
}

/// A rename recorded in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamedFile {
    pub from: String,
    pub to: String,
}

/// Working-tree status grouped into disjoint sets
///
/// A path lands in exactly one set, by precedence: conflicted, untracked,
/// renamed, deleted, staged, modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStatus {
    pub staged: Vec<String>,
    pub modified: Vec<String>,
    pub untracked: Vec<String>,
    pub deleted: Vec<String>,
    pub renamed: Vec<RenamedFile>,
    pub conflicted: Vec<String>,
}

impl GitStatus {
    pub fn from_entries(entries: &[StatusEntry]) -> Self {
        let mut status = GitStatus::default();

        for entry in entries {
            match entry.kind {
                RecordKind::Unmerged => status.conflicted.push(entry.path.clone()),
                RecordKind::Untracked => status.untracked.push(entry.path.clone()),
                RecordKind::RenameOrCopy if entry.index == 'R' => {
                    status.renamed.push(RenamedFile {
                        from: entry.orig_path.clone().unwrap_or_default(),
                        to: entry.path.clone(),
                    });
                }
                _ if entry.is_deletion() => status.deleted.push(entry.path.clone()),
                _ if entry.index != '.' => status.staged.push(entry.path.clone()),
                _ if entry.worktree != '.' => status.modified.push(entry.path.clone()),
                _ => {}
            }
        }

        status
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
            && self.modified.is_empty()
            && self.untracked.is_empty()
            && self.deleted.is_empty()
            && self.renamed.is_empty()
            && self.conflicted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
            + self.modified.len()
            + self.untracked.len()
            + self.deleted.len()
            + self.renamed.len()
            + self.conflicted.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
    Untracked,
    Conflicted,
}

/// One changed path with a single summarizing status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    pub status: ChangeStatus,
}

impl ChangedFile {
    pub fn from_entry(entry: &StatusEntry) -> Self {
        let status = match entry.kind {
            RecordKind::Unmerged => ChangeStatus::Conflicted,
            RecordKind::Untracked => ChangeStatus::Untracked,
            RecordKind::RenameOrCopy if entry.index == 'C' => ChangeStatus::Copied,
            RecordKind::RenameOrCopy => ChangeStatus::Renamed,
            RecordKind::Ordinary if entry.is_deletion() => ChangeStatus::Deleted,
            RecordKind::Ordinary if entry.index == 'A' => ChangeStatus::Added,
            RecordKind::Ordinary if entry.index == 'T' || entry.worktree == 'T' => {
                ChangeStatus::TypeChanged
            }
            RecordKind::Ordinary => ChangeStatus::Modified,
        };

        Self {
            path: entry.path.clone(),
            status,
        }
    }

    pub fn from_entries(entries: &[StatusEntry]) -> Vec<Self> {
        entries.iter().map(Self::from_entry).collect()
    }
}
