//! Replays synthetic document events through the guardian and checks
//! the snapshot archive and recovery behavior end to end.

use tempfile::TempDir;
use triago::backup::{BackupArchive, RecoveryEngine, SnapshotTrigger};
use triago::watcher::{DocumentEvent, DocumentEventHandler, DocumentGuardian};

struct Setup {
    _dir: TempDir,
    document: std::path::PathBuf,
    archive_dir: std::path::PathBuf,
}

fn setup() -> (DocumentGuardian, Setup) {
    let dir = TempDir::new().unwrap();
    let document = dir.path().join("REQUESTS.md");
    let archive_dir = dir.path().join("backups");
    let guardian = DocumentGuardian::new(
        BackupArchive::new(&archive_dir),
        RecoveryEngine::new(&document),
    );
    (
        guardian,
        Setup {
            _dir: dir,
            document,
            archive_dir,
        },
    )
}

#[test]
fn test_create_modify_delete_cycle_restores_latest_bytes() {
    let (mut guardian, s) = setup();

    std::fs::write(&s.document, "# Requests\n\n- first\n").unwrap();
    guardian
        .handle(&DocumentEvent::created(s.document.clone()))
        .unwrap();

    let final_content = "# Requests\n\n- first\n- second: 緊急のウェブサイト改修\n";
    std::fs::write(&s.document, final_content).unwrap();
    guardian
        .handle(&DocumentEvent::modified(s.document.clone()))
        .unwrap();

    // Duplicate modify with identical bytes adds nothing.
    guardian
        .handle(&DocumentEvent::modified(s.document.clone()))
        .unwrap();
    assert_eq!(guardian.archive().snapshot_files().unwrap().len(), 2);

    std::fs::remove_file(&s.document).unwrap();
    guardian
        .handle(&DocumentEvent::deleted(s.document.clone()))
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(&s.document).unwrap(),
        final_content,
        "restore must be byte-identical to the latest snapshot"
    );
}

#[test]
fn test_snapshots_record_trigger_and_classification() {
    let (mut guardian, s) = setup();

    std::fs::write(&s.document, "緊急: ウェブサイトのログイン障害").unwrap();
    guardian
        .handle(&DocumentEvent::created(s.document.clone()))
        .unwrap();

    let latest = guardian.archive().latest().unwrap().unwrap();
    assert_eq!(latest.event, SnapshotTrigger::Add);
    assert_eq!(latest.raw_content, "緊急: ウェブサイトのログイン障害");

    // Free text lines get app type and priority labels.
    let json = serde_json::to_value(&latest.parsed).unwrap();
    assert_eq!(json["format"], "free_text");
    assert_eq!(json["items"][0]["app_type"], "web");
    assert_eq!(json["items"][0]["priority"], "high");
}

#[test]
fn test_delete_without_snapshots_writes_placeholder() {
    let (mut guardian, s) = setup();

    guardian
        .handle(&DocumentEvent::deleted(s.document.clone()))
        .unwrap();

    let content = std::fs::read_to_string(&s.document).unwrap();
    assert!(!content.is_empty());
    assert!(content.contains("recover"), "placeholder explains recovery");

    // The placeholder itself was never snapshotted.
    assert!(!s.archive_dir.exists() || guardian.archive().snapshot_files().unwrap().is_empty());
}

#[test]
fn test_retention_prunes_oldest_snapshots() {
    let dir = TempDir::new().unwrap();
    let document = dir.path().join("REQUESTS.md");
    let mut guardian = DocumentGuardian::new(
        BackupArchive::new(dir.path().join("backups")).with_retention(Some(2)),
        RecoveryEngine::new(&document),
    );

    for i in 0..4 {
        std::fs::write(&document, format!("revision {i}")).unwrap();
        guardian
            .handle(&DocumentEvent::modified(document.clone()))
            .unwrap();
    }

    assert_eq!(guardian.archive().snapshot_files().unwrap().len(), 2);

    // Latest still points at the newest revision.
    std::fs::remove_file(&document).unwrap();
    guardian
        .handle(&DocumentEvent::deleted(document.clone()))
        .unwrap();
    assert_eq!(std::fs::read_to_string(&document).unwrap(), "revision 3");
}

#[test]
fn test_restore_after_manual_pointer_damage() {
    let (mut guardian, s) = setup();

    std::fs::write(&s.document, "only revision").unwrap();
    guardian
        .handle(&DocumentEvent::created(s.document.clone()))
        .unwrap();

    // A truncated pointer must not block recovery; the newest snapshot
    // file is used instead.
    std::fs::write(s.archive_dir.join("latest.json"), "{").unwrap();

    std::fs::remove_file(&s.document).unwrap();
    guardian
        .handle(&DocumentEvent::deleted(s.document.clone()))
        .unwrap();

    assert_eq!(std::fs::read_to_string(&s.document).unwrap(), "only revision");
}
