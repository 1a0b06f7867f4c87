use serde::{Deserialize, Serialize};

use super::records;

/// Current branch state, one variant per situation git distinguishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BranchInfo {
    /// A branch with a configured upstream
    Tracking {
        current: String,
        upstream: String,
        ahead: u32,
        behind: u32,
    },
    /// A branch without an upstream
    Local { current: String },
    /// A branch with no commits yet
    Unborn { current: String },
    /// HEAD points directly at a commit
    Detached {
        #[serde(rename = "commitHash")]
        commit_hash: String,
    },
}

impl BranchInfo {
    /// Branch name, `None` when detached
    pub fn name(&self) -> Option<&str> {
        match self {
            BranchInfo::Tracking { current, .. }
            | BranchInfo::Local { current }
            | BranchInfo::Unborn { current } => Some(current),
            BranchInfo::Detached { .. } => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, BranchInfo::Detached { .. })
    }
}

/// Parse the `# branch.*` headers of `git status --porcelain=v2 --branch`
///
/// Returns `None` when the output carries no `branch.head` header.
pub fn parse_branch_headers(output: &str) -> Option<BranchInfo> {
    let mut oid = None;
    let mut head = None;
    let mut upstream = None;
    let mut ahead = 0;
    let mut behind = 0;

    for record in records(output) {
        let Some(header) = record.strip_prefix("# ") else {
            continue;
        };
        let Some((key, value)) = header.split_once(' ') else {
            continue;
        };

        match key {
            "branch.oid" => oid = Some(value),
            "branch.head" => head = Some(value),
            "branch.upstream" => upstream = Some(value),
            "branch.ab" => {
                // branch.ab +<ahead> -<behind>
                let mut counts = value.split(' ');
                ahead = parse_count(counts.next(), '+');
                behind = parse_count(counts.next(), '-');
            }
            _ => {}
        }
    }

    let head = head?;

    if head == "(detached)" {
        return Some(BranchInfo::Detached {
            commit_hash: oid.unwrap_or_default().to_string(),
        });
    }

    if oid == Some("(initial)") {
        return Some(BranchInfo::Unborn {
            current: head.to_string(),
        });
    }

    match upstream {
        Some(upstream) => Some(BranchInfo::Tracking {
            current: head.to_string(),
            upstream: upstream.to_string(),
            ahead,
            behind,
        }),
        None => Some(BranchInfo::Local {
            current: head.to_string(),
        }),
    }
}

fn parse_count(field: Option<&str>, sign: char) -> u32 {
    field
        .and_then(|f| f.strip_prefix(sign))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}
