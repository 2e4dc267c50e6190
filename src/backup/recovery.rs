//! Restore the watched document from the snapshot archive.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::archive::BackupArchive;
use super::{BackupError, BackupResult};
use crate::config::Settings;
use crate::log_event;

/// Written in place of the document when restore has nothing to restore
/// from. Deliberately self-describing: an operator finding this file
/// knows what happened and what to do next.
pub const PLACEHOLDER: &str = "\
# Requests document (recovered placeholder)

The watched requests document was deleted and no backup snapshot was
available, so this placeholder was written in its place.

To recover manually:

1. Look in the backup directory (default `.triago/backups/`) for
   `snapshot-*.json` files and copy the `raw_content` field of the
   newest one back into this file.
2. If no snapshots exist, rewrite the document from scratch. The next
   save is snapshotted automatically while `triago watch` is running.
";

/// What a successful restore put back on disk.
#[derive(Debug, Clone)]
pub struct Restored {
    pub content_hash: String,
    pub byte_length: u64,
}

/// Rewrites the watched document from the latest snapshot.
///
/// Restore only reads the archive; it never writes snapshots. When no
/// snapshot exists the caller decides between surfacing the error and
/// falling back to [`RecoveryEngine::write_placeholder`].
pub struct RecoveryEngine {
    document_path: PathBuf,
}

impl RecoveryEngine {
    pub fn new(document_path: impl Into<PathBuf>) -> Self {
        Self {
            document_path: document_path.into(),
        }
    }

    /// Wire up a recovery engine for the configured watched document.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.watcher.document_path.clone())
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// Overwrite the document with the latest snapshot's raw content,
    /// byte for byte.
    pub fn restore(&self, archive: &BackupArchive) -> BackupResult<Restored> {
        let snapshot = archive.latest()?.ok_or(BackupError::NoBackupAvailable)?;

        self.replace_document(&snapshot.raw_content)?;
        log_event!(
            "recovery",
            "restored",
            "{} ({} bytes, {})",
            self.document_path.display(),
            snapshot.byte_length,
            snapshot.timestamp.to_rfc3339()
        );

        Ok(Restored {
            content_hash: snapshot.content_hash,
            byte_length: snapshot.byte_length,
        })
    }

    /// Write the fixed operator-facing placeholder.
    ///
    /// Depends on no prior state; only an OS-level write failure can
    /// fail it.
    pub fn write_placeholder(&self) -> BackupResult<()> {
        if let Some(parent) = self.document_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| BackupError::FileWrite {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        fs::write(&self.document_path, PLACEHOLDER).map_err(|e| BackupError::FileWrite {
            path: self.document_path.clone(),
            source: e,
        })?;

        log_event!(
            "recovery",
            "placeholder written",
            "{}",
            self.document_path.display()
        );
        Ok(())
    }

    /// Atomic replace so a concurrent reader never sees a torn document.
    fn replace_document(&self, content: &str) -> BackupResult<()> {
        let parent = match self.document_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| BackupError::FileWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| BackupError::FileWrite {
            path: self.document_path.clone(),
            source: e,
        })?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| BackupError::FileWrite {
                path: self.document_path.clone(),
                source: e,
            })?;
        tmp.persist(&self.document_path)
            .map_err(|e| BackupError::FileWrite {
                path: self.document_path.clone(),
                source: e.error,
            })?;

        Ok(())
    }
}
