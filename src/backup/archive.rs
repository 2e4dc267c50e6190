//! Snapshot archive: immutable history plus a "latest" pointer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::parse::{parse_structure, ParsedForm};
use super::{BackupError, BackupResult};
use crate::config::{ClassifierConfig, Settings};
use crate::debug_event;

/// Mutable pointer file, always equal to the newest snapshot.
const LATEST_FILE: &str = "latest.json";

/// Prefix of immutable snapshot file names.
const SNAPSHOT_PREFIX: &str = "snapshot-";

/// What the watcher observed when the snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotTrigger {
    /// The document appeared.
    Add,
    /// The document content changed.
    Change,
}

impl SnapshotTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotTrigger::Add => "add",
            SnapshotTrigger::Change => "change",
        }
    }
}

impl std::fmt::Display for SnapshotTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable point-in-time copy of the watched document.
///
/// The full raw content is embedded, so any single snapshot file is
/// sufficient to restore the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub timestamp: DateTime<Utc>,
    pub event: SnapshotTrigger,
    /// SHA-256 of the raw content, lowercase hex.
    pub content_hash: String,
    pub raw_content: String,
    pub parsed: ParsedForm,
    pub byte_length: u64,
}

/// Result of one snapshot call.
#[derive(Debug)]
pub enum SnapshotOutcome {
    /// A new snapshot file was written and the latest pointer replaced.
    Written {
        path: PathBuf,
        snapshot: BackupSnapshot,
    },
    /// Content hash matches the latest snapshot; nothing was written.
    /// This is what makes duplicate and coalesced watcher deliveries
    /// harmless.
    Unchanged,
}

/// SHA-256 of a content string, lowercase hex.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Writes and reads document snapshots under one directory.
///
/// Snapshot files are timestamp-named and never rewritten; `latest.json`
/// is replaced atomically on every write. The archive shares no state
/// with the registry and never touches its lock.
pub struct BackupArchive {
    dir: PathBuf,
    /// Keep at most this many snapshot files; `None` keeps everything.
    retention: Option<usize>,
    classifier: ClassifierConfig,
}

impl BackupArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            retention: None,
            classifier: ClassifierConfig::default(),
        }
    }

    /// Cap the number of retained snapshot files.
    pub fn with_retention(mut self, retention: Option<usize>) -> Self {
        self.retention = retention;
        self
    }

    /// Use the given keyword tables for free-text classification.
    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    /// Wire up an archive from the `[backup]` and `[classifier]` settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.backup.dir.clone())
            .with_retention(settings.backup.retention())
            .with_classifier(settings.classifier.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(LATEST_FILE)
    }

    /// Snapshot the given document content.
    ///
    /// Computes the content hash, short-circuits when it matches the
    /// latest snapshot, otherwise writes one immutable snapshot file,
    /// replaces the latest pointer, and prunes to the retention cap.
    /// Structural parsing is best-effort and never fails the snapshot.
    pub fn snapshot(
        &self,
        content: &str,
        event: SnapshotTrigger,
    ) -> BackupResult<SnapshotOutcome> {
        let hash = content_hash(content);
        if let Some(latest) = self.latest()? {
            if latest.content_hash == hash {
                return Ok(SnapshotOutcome::Unchanged);
            }
        }

        let timestamp = Utc::now();
        let snapshot = BackupSnapshot {
            timestamp,
            event,
            content_hash: hash,
            raw_content: content.to_string(),
            parsed: parse_structure(content, &self.classifier),
            byte_length: content.len() as u64,
        };

        fs::create_dir_all(&self.dir).map_err(|e| BackupError::FileWrite {
            path: self.dir.clone(),
            source: e,
        })?;

        let path = self.allocate_snapshot_path(timestamp);
        self.write_record(&path, &snapshot)?;
        self.write_record(&self.latest_path(), &snapshot)?;
        self.prune()?;

        Ok(SnapshotOutcome::Written { path, snapshot })
    }

    /// The most recent snapshot, or `None` when no usable snapshot exists.
    ///
    /// Reads the latest pointer first; a missing or damaged pointer falls
    /// back to the newest parsable snapshot file.
    pub fn latest(&self) -> BackupResult<Option<BackupSnapshot>> {
        match fs::read_to_string(self.latest_path()) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => {
                    tracing::warn!(
                        "[backup] latest pointer {} is damaged ({e}), scanning snapshots",
                        self.latest_path().display()
                    );
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BackupError::FileRead {
                    path: self.latest_path(),
                    source: e,
                });
            }
        }

        self.scan_newest()
    }

    /// Snapshot files in the archive directory, oldest first.
    ///
    /// The timestamp naming makes file-name order chronological; the
    /// collision suffix orders writes that land in one millisecond.
    pub fn snapshot_files(&self) -> BackupResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(BackupError::FileRead {
                    path: self.dir.clone(),
                    source: e,
                });
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| {
                        name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(".json")
                    })
            })
            .collect();

        files.sort_by_key(|path| Self::order_key(path));
        Ok(files)
    }

    /// Sort key splitting `snapshot-<ts>[-N].json` into (ts, N).
    fn order_key(path: &Path) -> (String, u32) {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("");
        let rest = stem.strip_prefix(SNAPSHOT_PREFIX).unwrap_or(stem);

        match rest.split_once('-') {
            Some((ts, counter)) => (ts.to_string(), counter.parse().unwrap_or(0)),
            None => (rest.to_string(), 0),
        }
    }

    /// Newest parsable snapshot file, ignoring damaged ones.
    fn scan_newest(&self) -> BackupResult<Option<BackupSnapshot>> {
        for path in self.snapshot_files()?.into_iter().rev() {
            let Ok(raw) = fs::read_to_string(&path) else {
                continue;
            };
            match serde_json::from_str(&raw) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => {
                    tracing::warn!("[backup] skipping damaged snapshot {}: {e}", path.display());
                }
            }
        }
        Ok(None)
    }

    /// Timestamp-named path for a new snapshot, suffixed on collision.
    fn allocate_snapshot_path(&self, timestamp: DateTime<Utc>) -> PathBuf {
        let base = timestamp.format("%Y%m%dT%H%M%S%3fZ");
        let candidate = self.dir.join(format!("{SNAPSHOT_PREFIX}{base}.json"));
        if !candidate.exists() {
            return candidate;
        }

        let mut counter = 1u32;
        loop {
            let candidate = self
                .dir
                .join(format!("{SNAPSHOT_PREFIX}{base}-{counter}.json"));
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Serialize a snapshot record and atomically move it into place.
    fn write_record(&self, path: &Path, snapshot: &BackupSnapshot) -> BackupResult<()> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| BackupError::Serialization(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| BackupError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| BackupError::FileWrite {
                path: path.to_path_buf(),
                source: e,
            })?;
        tmp.persist(path).map_err(|e| BackupError::FileWrite {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        Ok(())
    }

    /// Remove the oldest snapshot files past the retention cap.
    fn prune(&self) -> BackupResult<()> {
        let Some(keep) = self.retention else {
            return Ok(());
        };

        let files = self.snapshot_files()?;
        if files.len() <= keep {
            return Ok(());
        }

        let excess = files.len() - keep;
        for path in &files[..excess] {
            fs::remove_file(path).map_err(|e| BackupError::FileWrite {
                path: path.clone(),
                source: e,
            })?;
        }
        debug_event!("backup", "pruned", "{excess} snapshot(s) past retention {keep}");

        Ok(())
    }
}
