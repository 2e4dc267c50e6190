//! Guardian handler: snapshots on change, restores on deletion.

use std::path::Path;

use super::error::WatchError;
use super::events::DocumentEventHandler;
use crate::backup::{BackupArchive, RecoveryEngine, SnapshotOutcome, SnapshotTrigger};
use crate::config::Settings;
use crate::{debug_event, log_event};

/// Protects the watched document: every observed create/modify is
/// snapshotted, and a deletion is answered with a restore from the
/// latest snapshot, degrading to the fixed placeholder when restore
/// fails. Failures are isolated per event so the guard survives them.
pub struct DocumentGuardian {
    archive: BackupArchive,
    recovery: RecoveryEngine,
}

impl DocumentGuardian {
    pub fn new(archive: BackupArchive, recovery: RecoveryEngine) -> Self {
        Self { archive, recovery }
    }

    /// Wire up a guardian from the `[backup]`, `[classifier]`, and
    /// `[watcher]` settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            BackupArchive::from_settings(settings),
            RecoveryEngine::from_settings(settings),
        )
    }

    pub fn archive(&self) -> &BackupArchive {
        &self.archive
    }

    fn snapshot_document(&self, path: &Path, trigger: SnapshotTrigger) -> Result<(), WatchError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Vanished between the event and our read; the delete
                // event carries the response.
                debug_event!("guardian", "skipped", "{} gone before read", path.display());
                return Ok(());
            }
            Err(e) => {
                return Err(WatchError::EventError {
                    details: format!("cannot read {}: {e}", path.display()),
                });
            }
        };

        match self.archive.snapshot(&content, trigger) {
            Ok(SnapshotOutcome::Written { snapshot, .. }) => {
                log_event!(
                    "guardian",
                    "snapshot",
                    "{trigger} {} ({} bytes)",
                    path.display(),
                    snapshot.byte_length
                );
                Ok(())
            }
            Ok(SnapshotOutcome::Unchanged) => {
                debug_event!("guardian", "unchanged", "{}", path.display());
                Ok(())
            }
            Err(e) => Err(WatchError::EventError {
                details: format!("snapshot failed: {e}"),
            }),
        }
    }
}

impl DocumentEventHandler for DocumentGuardian {
    fn on_created(&mut self, path: &Path) -> Result<(), WatchError> {
        self.snapshot_document(path, SnapshotTrigger::Add)
    }

    fn on_modified(&mut self, path: &Path) -> Result<(), WatchError> {
        self.snapshot_document(path, SnapshotTrigger::Change)
    }

    /// Deletion is terminal for the event either way: Restored, or
    /// PlaceholderWritten. No retries; the next edit re-enters the
    /// normal watch cycle.
    fn on_deleted(&mut self, path: &Path) -> Result<(), WatchError> {
        match self.recovery.restore(&self.archive) {
            Ok(restored) => {
                log_event!(
                    "guardian",
                    "restored",
                    "{} ({} bytes)",
                    path.display(),
                    restored.byte_length
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!("[guardian] restore of {} failed: {e}", path.display());
                self.recovery
                    .write_placeholder()
                    .map_err(|e| WatchError::EventError {
                        details: format!("placeholder write failed: {e}"),
                    })
            }
        }
    }
}
