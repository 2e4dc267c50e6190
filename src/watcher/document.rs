//! Notify-backed watcher for the single guarded document.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::debouncer::Debouncer;
use super::error::WatchError;
use super::events::{DocumentEvent, DocumentEventHandler};
use crate::config::Settings;
use crate::{debug_event, log_event};

/// How often the run loop drains the debouncer while the channel is quiet.
const TICK: Duration = Duration::from_millis(100);

/// Watches one file path and reduces raw filesystem notifications to
/// typed created/modified/deleted events.
///
/// The parent directory is watched non-recursively since the document
/// itself may not exist yet (or may stop existing; that is the point).
/// Creations and deletions dispatch immediately; modifications pass
/// through the debouncer so editor save bursts count once. A debounced
/// path whose file is gone by release time is delivered as deleted,
/// which folds rename-as-modify into the delete path.
pub struct DocumentWatcher {
    document_path: PathBuf,
    debouncer: Debouncer,
    emit_initial: bool,
    event_rx: Receiver<notify::Result<Event>>,
    /// Kept alive for the lifetime of the watch; dropping it stops
    /// notify's delivery.
    watcher: notify::RecommendedWatcher,
}

impl DocumentWatcher {
    pub fn new(
        document_path: impl Into<PathBuf>,
        debounce: Duration,
        emit_initial: bool,
    ) -> Result<Self, WatchError> {
        let document_path = absolutize(document_path.into());

        let (tx, rx) = crossbeam_channel::bounded(100);
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        Ok(Self {
            document_path,
            debouncer: Debouncer::new(debounce),
            emit_initial,
            event_rx: rx,
            watcher,
        })
    }

    /// Wire up a watcher from the `[watcher]` settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, WatchError> {
        Self::new(
            settings.watcher.document_path.clone(),
            settings.watcher.debounce(),
            settings.watcher.emit_initial,
        )
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// Watch the document and feed events to the handler until the
    /// channel closes.
    ///
    /// Handler errors are logged and never stop the loop; one bad event
    /// must not leave the document unguarded.
    pub fn run(&mut self, handler: &mut dyn DocumentEventHandler) -> Result<(), WatchError> {
        let watch_dir = match self.document_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        self.watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: watch_dir.clone(),
                reason: e.to_string(),
            })?;

        log_event!("watcher", "watching", "{}", self.document_path.display());

        if self.emit_initial && self.document_path.exists() {
            debug_event!("watcher", "initial", "document already present");
            dispatch(
                handler,
                DocumentEvent::created(self.document_path.clone()),
            );
        }

        loop {
            match self.event_rx.recv_timeout(TICK) {
                Ok(Ok(event)) => self.reduce(handler, event),
                Ok(Err(e)) => {
                    tracing::error!("[watcher] file watch error: {e}");
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(WatchError::ChannelClosed),
            }

            for path in self.debouncer.take_ready() {
                let event = if path.exists() {
                    DocumentEvent::modified(path)
                } else {
                    DocumentEvent::deleted(path)
                };
                dispatch(handler, event);
            }
        }
    }

    /// Reduce one raw notify event to typed document events.
    fn reduce(&mut self, handler: &mut dyn DocumentEventHandler, event: Event) {
        for path in &event.paths {
            if *path != self.document_path {
                continue;
            }

            match event.kind {
                EventKind::Create(_) => {
                    // A create supersedes any pending modification.
                    self.debouncer.remove(path);
                    dispatch(handler, DocumentEvent::created(path.clone()));
                }
                EventKind::Modify(_) => {
                    self.debouncer.record(path.clone());
                }
                EventKind::Remove(_) => {
                    self.debouncer.remove(path);
                    dispatch(handler, DocumentEvent::deleted(path.clone()));
                }
                _ => {
                    debug_event!("watcher", "ignored", "{:?} {}", event.kind, path.display());
                }
            }
        }
    }
}

fn dispatch(handler: &mut dyn DocumentEventHandler, event: DocumentEvent) {
    debug_event!("watcher", event.kind.as_str(), "{}", event.path.display());
    if let Err(e) = handler.handle(&event) {
        tracing::error!("[watcher] {} handler failed: {e}", event.kind);
    }
}

/// Resolve a possibly-relative path against the current directory, since
/// notify reports absolute paths.
fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path)
    }
}
