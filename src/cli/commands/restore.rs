//! Restore command.

use crate::backup::{BackupArchive, BackupError, RecoveryEngine};
use crate::config::Settings;

/// Run restore command - rewrite the document from the latest snapshot.
pub fn run_restore(settings: &Settings, placeholder_on_failure: bool) {
    let archive = BackupArchive::from_settings(settings);
    let recovery = RecoveryEngine::from_settings(settings);

    match recovery.restore(&archive) {
        Ok(restored) => {
            println!(
                "Restored {} ({} bytes, sha256 {})",
                recovery.document_path().display(),
                restored.byte_length,
                restored.content_hash
            );
        }
        Err(BackupError::NoBackupAvailable) if placeholder_on_failure => {
            if let Err(e) = recovery.write_placeholder() {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            println!(
                "No snapshot available; wrote placeholder to {}",
                recovery.document_path().display()
            );
        }
        Err(e) => {
            eprintln!("Error: {e}");
            if matches!(e, BackupError::NoBackupAvailable) {
                eprintln!("Run 'triago watch' to start collecting snapshots.");
            }
            std::process::exit(1);
        }
    }
}
