use std::env;
use tempfile::TempDir;
use triago::Settings;

// Each test uses its own TRIAGO_* variables so parallel execution
// cannot cross-contaminate. load_from always layers the environment,
// so default-value assertions stick to fields no test here overrides.

#[test]
fn test_env_overrides_watcher_and_backup() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    Settings::default().save(&config_path).unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("TRIAGO_WATCHER__DEBOUNCE_MS", "750");
        env::set_var("TRIAGO_BACKUP__MAX_SNAPSHOTS", "5");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    assert_eq!(settings.watcher.debounce_ms, 750);
    assert_eq!(
        settings.watcher.debounce(),
        std::time::Duration::from_millis(750)
    );
    assert_eq!(settings.backup.max_snapshots, 5);
    assert_eq!(settings.backup.retention(), Some(5));

    unsafe {
        env::remove_var("TRIAGO_WATCHER__DEBOUNCE_MS");
        env::remove_var("TRIAGO_BACKUP__MAX_SNAPSHOTS");
    }
}

#[test]
fn test_env_overrides_registry_lock_timing() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    Settings::default().save(&config_path).unwrap();

    unsafe {
        env::set_var("TRIAGO_REGISTRY__LOCK_WAIT_MS", "1200");
        env::set_var("TRIAGO_REGISTRY__LOCK_STALE_SECS", "0");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    assert_eq!(settings.registry.lock_wait_ms, 1200);
    assert_eq!(
        settings.registry.lock_max_wait(),
        std::time::Duration::from_millis(1200)
    );
    // Zero disables stale-marker reclaim entirely.
    assert_eq!(settings.registry.lock_stale_secs, 0);
    assert_eq!(settings.registry.lock_stale_after(), None);

    unsafe {
        env::remove_var("TRIAGO_REGISTRY__LOCK_WAIT_MS");
        env::remove_var("TRIAGO_REGISTRY__LOCK_STALE_SECS");
    }
}

#[test]
fn test_file_overrides_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");

    let config_content = r#"
version = 1

[watcher]
document_path = "docs/REQUESTS.md"
emit_initial = false

[registry]
lock_poll_ms = 25
"#;
    std::fs::write(&config_path, config_content).unwrap();

    let settings = Settings::load_from(&config_path).unwrap();

    assert_eq!(
        settings.watcher.document_path,
        std::path::PathBuf::from("docs/REQUESTS.md")
    );
    assert!(!settings.watcher.emit_initial);
    assert_eq!(settings.registry.lock_poll_ms, 25);

    // Untouched fields keep their defaults, even inside a partially
    // overridden section. Checked fields have no TRIAGO_* override in
    // this binary.
    assert_eq!(
        settings.registry.registry_path,
        std::path::PathBuf::from(".triago/registry.json")
    );
    assert_eq!(settings.backup.dir, std::path::PathBuf::from(".triago/backups"));
    assert!(!settings.classifier.app_types.is_empty());
}

#[test]
fn test_env_layers_over_partial_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");

    let config_content = r#"
version = 1

[registry]
lock_poll_ms = 40
"#;
    std::fs::write(&config_path, config_content).unwrap();

    unsafe {
        env::set_var("TRIAGO_REGISTRY__AUDIT_PATH", "logs/decisions.log");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    // The env layer lands even on fields the file never mentions.
    assert_eq!(settings.registry.lock_poll_ms, 40);
    assert_eq!(
        settings.registry.audit_path,
        std::path::PathBuf::from("logs/decisions.log")
    );

    unsafe {
        env::remove_var("TRIAGO_REGISTRY__AUDIT_PATH");
    }
}
