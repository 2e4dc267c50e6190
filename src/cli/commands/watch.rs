//! Watch command.

use crate::config::Settings;
use crate::watcher::{DocumentGuardian, DocumentWatcher};

/// Run watch command - guard the requests document in the foreground.
///
/// Blocks until the watch channel closes or the watcher fails. Ctrl-C
/// stops it; snapshots already written stay on disk.
pub fn run_watch(settings: &Settings) {
    let mut watcher = match DocumentWatcher::from_settings(settings) {
        Ok(watcher) => watcher,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("Watching: {}", watcher.document_path().display());
    println!("Snapshots: {}", settings.backup.dir.display());
    println!("Press Ctrl+C to stop");

    let mut guardian = DocumentGuardian::from_settings(settings);
    if let Err(e) = watcher.run(&mut guardian) {
        eprintln!("Watcher stopped: {e}");
        std::process::exit(1);
    }
}
