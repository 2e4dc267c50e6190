//! Append-only audit trail of assignment decisions.

use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::allocator::Assignment;

/// Writes one line per assignment decision to a plain-text log.
///
/// The audit trail is observability, not state: a failed append is logged
/// as a warning and never fails the assignment that caused it.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a decision line:
    /// `<rfc3339> <decision> id=<id> key=<key> title=<title>`
    pub fn record(&self, assignment: &Assignment, title: &str) {
        if let Err(e) = self.append(assignment, title) {
            tracing::warn!(
                "[registry] audit append failed for {}: {e}",
                self.path.display()
            );
        }
    }

    fn append(&self, assignment: &Assignment, title: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(
            file,
            "{} {} id={} key={} title={}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            assignment.decision,
            assignment.id,
            assignment.key,
            title.replace(['\r', '\n'], " "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AssignmentDecision;
    use crate::types::{CategoryId, CategoryKey};
    use tempfile::TempDir;

    fn sample_assignment() -> Assignment {
        Assignment {
            id: CategoryId::first(),
            key: CategoryKey::derive("時間管理ツール"),
            decision: AssignmentDecision::Registered,
        }
    }

    #[test]
    fn test_record_appends_one_line_per_decision() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::new(dir.path().join("audit.log"));

        audit.record(&sample_assignment(), "時間管理ツール");
        audit.record(&sample_assignment(), "another title");

        let content = std::fs::read_to_string(audit.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("registered id=001 key=時間管理ツール"));
        assert!(lines[1].ends_with("title=another title"));
    }

    #[test]
    fn test_record_flattens_newlines_in_title() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::new(dir.path().join("audit.log"));

        audit.record(&sample_assignment(), "line one\nline two");

        let content = std::fs::read_to_string(audit.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("title=line one line two"));
    }

    #[test]
    fn test_record_swallows_unwritable_path() {
        // Parent is a file, so the append can never succeed.
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let audit = AuditLog::new(blocker.join("audit.log"));
        audit.record(&sample_assignment(), "ignored");
    }
}
