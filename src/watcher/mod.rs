//! Document watcher: notify-backed protection for the requests file.
//!
//! A single watcher observes the document's parent directory, folds
//! raw filesystem noise into created/modified/deleted events, and
//! feeds them to a handler. The stock handler is the guardian, which
//! snapshots content and restores the file when it disappears.
//!
//! # Architecture
//!
//! ```text
//! DocumentWatcher
//!   - notify::RecommendedWatcher on the parent dir
//!   - Debouncer collapses modify bursts
//!   - Translates to DocumentEvent
//!         |
//!         v
//! DocumentEventHandler (DocumentGuardian)
//!   - created/modified -> BackupArchive::snapshot
//!   - deleted          -> RecoveryEngine::restore
//! ```

mod debouncer;
mod document;
mod error;
mod events;
mod guardian;

pub use debouncer::Debouncer;
pub use document::DocumentWatcher;
pub use error::WatchError;
pub use events::{DocumentEvent, DocumentEventHandler, DocumentEventKind};
pub use guardian::DocumentGuardian;
