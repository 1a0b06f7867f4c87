use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Terminates each record under `git log -z`
pub const RECORD_SEPARATOR: char = '\0';

/// A commit from `git log`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub author: String,
    /// Author date, with the author's offset
    pub date: DateTime<FixedOffset>,
    pub message: String,
}

/// Parse `git log -z` output produced with `LOG_FORMAT_FLAG`
///
/// Bytes inside a message, including ASCII separators and lines shaped like
/// a record header, stay part of that message. Records with a malformed hash
/// or date are skipped. At most `limit` commits are returned. Messages are
/// returned raw.
pub fn parse_log(output: &str, limit: usize) -> Vec<Commit> {
    output
        .split(RECORD_SEPARATOR)
        .filter_map(parse_record)
        .take(limit)
        .collect()
}

fn parse_record(record: &str) -> Option<Commit> {
    let record = record.trim_start_matches(['\n', '\r']);
    if record.is_empty() {
        return None;
    }

    let mut fields = record.splitn(4, '\n');
    let hash = fields.next()?;
    let author = fields.next()?;
    let date = fields.next()?;
    let message = fields.next().unwrap_or_default();

    if !is_object_id(hash) {
        return None;
    }

    let date = DateTime::parse_from_rfc3339(date.trim()).ok()?;

    Some(Commit {
        hash: hash.to_string(),
        author: author.to_string(),
        date,
        message: message.trim_end().to_string(),
    })
}

/// SHA-1 or SHA-256 object id in lowercase hex
fn is_object_id(hash: &str) -> bool {
    matches!(hash.len(), 40 | 64) && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str, author: &str, date: &str, message: &str) -> String {
        format!("{hash}\n{author}\n{date}\n{message}\0")
    }

    #[test]
    fn test_parse_log() {
        let output = format!(
            "{}{}",
            record(&"a".repeat(40), "Ada", "2024-03-01T10:00:00+01:00", "Initial commit\n"),
            record(
                &"b".repeat(40),
                "Bob",
                "2024-03-02T11:30:00-05:00",
                "Add README\n\nLonger body\n"
            )
        );
        let commits = parse_log(&output, 10);

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].author, "Ada");
        assert_eq!(commits[0].message, "Initial commit");
        assert_eq!(commits[0].date.offset().local_minus_utc(), 3600);
        assert_eq!(commits[1].message, "Add README\n\nLonger body");
    }

    #[test]
    fn test_last_record_without_terminator() {
        let output = format!(
            "{}{}\n{}\n{}\n{}",
            record(&"a".repeat(40), "A", "2024-01-01T00:00:00Z", "first\n"),
            "b".repeat(40),
            "B",
            "2024-01-02T00:00:00Z",
            "second\n"
        );
        let commits = parse_log(&output, 10);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[1].message, "second");
    }

    #[test]
    fn test_limit() {
        let output: String = (0..5)
            .map(|i| record(&format!("{:040x}", i), "A", "2024-01-01T00:00:00Z", "m"))
            .collect();
        assert_eq!(parse_log(&output, 3).len(), 3);
        assert!(parse_log(&output, 0).is_empty());
    }

    #[test]
    fn test_message_may_contain_anything() {
        let message = "subject\n\x1e\x1f\n\nline with\ttabs and \"quotes\" and | pipes\r\n";
        let output = record(&"c".repeat(40), "Eve", "2024-01-01T00:00:00Z", message);
        let commits = parse_log(&output, 10);
        assert_eq!(
            commits[0].message,
            "subject\n\x1e\x1f\n\nline with\ttabs and \"quotes\" and | pipes"
        );
    }

    #[test]
    fn test_forged_record_in_body_stays_in_message() {
        let forged = format!(
            "Real subject\n\x1e{}\x1fLinus\x1f2001-01-01T00:00:00+00:00\x1fApproved\n{}\nMallory\n2001-01-01T00:00:00+00:00\nAlso approved\n",
            "d".repeat(40),
            "e".repeat(40)
        );
        let output = format!(
            "{}{}",
            record(&"a".repeat(40), "Test User", "2024-01-01T00:00:00Z", &forged),
            record(&"b".repeat(40), "Test User", "2023-12-31T00:00:00Z", "Older\n"),
        );
        let commits = parse_log(&output, 2);

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "a".repeat(40));
        assert_eq!(commits[0].message, forged.trim_end());
        assert_eq!(commits[1].hash, "b".repeat(40));
    }

    #[test]
    fn test_author_with_separator_bytes() {
        let output = record(&"c".repeat(40), "Eve\x1fEvil\x1e", "2024-01-01T00:00:00Z", "m\n");
        let commits = parse_log(&output, 10);

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].author, "Eve\x1fEvil\x1e");
        assert_eq!(commits[0].message, "m");
    }

    #[test]
    fn test_malformed_records_skipped() {
        let output = format!(
            "{}{}{}{}",
            record("nothex", "A", "2024-01-01T00:00:00Z", "bad hash"),
            record(&"d".repeat(40), "A", "yesterday", "bad date"),
            "garbage without fields\0",
            record(&"e".repeat(64), "A", "2024-01-01T00:00:00Z", "sha256 repo"),
        );
        let commits = parse_log(&output, 10);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "sha256 repo");
    }

    #[test]
    fn test_empty_message_and_output() {
        let output = record(&"f".repeat(40), "A", "2024-01-01T00:00:00Z", "");
        assert_eq!(parse_log(&output, 10)[0].message, "");
        assert!(parse_log("", 10).is_empty());
    }
}
