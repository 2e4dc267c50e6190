//! Typed document events and the handler seam.
//!
//! The watcher reduces raw filesystem notifications to three event
//! kinds before anything downstream sees them. Handlers implement
//! [`DocumentEventHandler`] and are driven by the watch loop.

use std::path::{Path, PathBuf};

use super::error::WatchError;

/// What happened to the watched document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEventKind {
    Created,
    Modified,
    Deleted,
}

impl DocumentEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentEventKind::Created => "created",
            DocumentEventKind::Modified => "modified",
            DocumentEventKind::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for DocumentEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed change to the watched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEvent {
    pub kind: DocumentEventKind,
    pub path: PathBuf,
}

impl DocumentEvent {
    pub fn new(kind: DocumentEventKind, path: PathBuf) -> Self {
        Self { kind, path }
    }

    pub fn created(path: PathBuf) -> Self {
        Self::new(DocumentEventKind::Created, path)
    }

    pub fn modified(path: PathBuf) -> Self {
        Self::new(DocumentEventKind::Modified, path)
    }

    pub fn deleted(path: PathBuf) -> Self {
        Self::new(DocumentEventKind::Deleted, path)
    }
}

/// Consumes document events in delivery order.
///
/// The filesystem gives no ordering guarantee stronger than delivery
/// order, and coalesced bursts can replay the same state twice, so
/// implementations must tolerate duplicate events.
pub trait DocumentEventHandler {
    fn on_created(&mut self, path: &Path) -> Result<(), WatchError>;
    fn on_modified(&mut self, path: &Path) -> Result<(), WatchError>;
    fn on_deleted(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Route one event to the matching callback.
    fn handle(&mut self, event: &DocumentEvent) -> Result<(), WatchError> {
        match event.kind {
            DocumentEventKind::Created => self.on_created(&event.path),
            DocumentEventKind::Modified => self.on_modified(&event.path),
            DocumentEventKind::Deleted => self.on_deleted(&event.path),
        }
    }
}
