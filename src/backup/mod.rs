//! Snapshot archive and recovery for the watched request document.
//!
//! # Architecture
//!
//! ```text
//! Document content
//!       |
//!       v
//! parse::parse_structure ----> ParsedForm (json / markdown / free text)
//!       |
//!       v
//! BackupArchive::snapshot ---> snapshot-<timestamp>.json  (immutable)
//!                         ---> latest.json                (mutable pointer)
//!       |
//!       v
//! RecoveryEngine::restore ---> watched document, byte for byte
//! ```
//!
//! Snapshots embed the full raw content, so any single snapshot file is
//! enough to bring the document back. `latest.json` is only an
//! optimization; recovery falls back to scanning the snapshot files when
//! the pointer is missing or damaged.

pub mod archive;
pub mod parse;
pub mod recovery;

pub use archive::{BackupArchive, BackupSnapshot, SnapshotOutcome, SnapshotTrigger};
pub use parse::{
    detect_app_type, detect_priority, parse_structure, FreeTextItem, MarkdownSection, ParsedForm,
};
pub use recovery::{RecoveryEngine, Restored, PLACEHOLDER};

use std::path::PathBuf;
use thiserror::Error;

/// Errors from snapshot and recovery operations.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("No backup snapshot available")]
    NoBackupAvailable,

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot serialization error: {0}")]
    Serialization(String),
}

pub type BackupResult<T> = Result<T, BackupError>;
