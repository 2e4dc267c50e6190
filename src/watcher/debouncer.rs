//! Debouncing for modification events.
//!
//! Editors save in bursts (auto-save, format-on-save, atomic rename
//! dances), so a modification only counts once the path has been quiet
//! for the configured window.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Tracks recently modified paths and releases them once stable.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending changes: path -> last change timestamp.
    pending: HashMap<PathBuf, Instant>,
    /// How long a path must be quiet before it is released.
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
        }
    }

    /// Record a modification, resetting the timer for this path.
    pub fn record(&mut self, path: PathBuf) {
        self.pending.insert(path, Instant::now());
    }

    /// Drop a pending path (when a create or delete supersedes it).
    pub fn remove(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Take all paths that have been quiet for the full window.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|path, last_change| {
            if now.duration_since(*last_change) >= self.window {
                ready.push(path.clone());
                false
            } else {
                true
            }
        });

        ready
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
