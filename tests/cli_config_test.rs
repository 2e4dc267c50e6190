use std::process::Command;
use tempfile::TempDir;

fn triago() -> Command {
    Command::new(env!("CARGO_BIN_EXE_triago"))
}

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let output = triago()
        .arg("init")
        .current_dir(temp_path)
        .output()
        .expect("Failed to run init command");

    assert!(output.status.success());

    // Check that config file was created
    let config_path = temp_path.join(".triago/settings.toml");
    assert!(config_path.exists());

    // Verify config content
    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[registry]"));
    assert!(content.contains("[watcher]"));
    assert!(content.contains("[backup]"));
}

#[test]
fn test_init_refuses_to_overwrite_without_force() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    assert!(triago()
        .arg("init")
        .current_dir(temp_path)
        .output()
        .unwrap()
        .status
        .success());

    let second = triago()
        .arg("init")
        .current_dir(temp_path)
        .output()
        .unwrap();
    assert!(!second.status.success());
    let stderr = String::from_utf8(second.stderr).unwrap();
    assert!(stderr.contains("--force"));

    assert!(triago()
        .args(["init", "--force"])
        .current_dir(temp_path)
        .output()
        .unwrap()
        .status
        .success());
}

#[test]
fn test_config_command() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    // Create a custom config
    let config_dir = temp_path.join(".triago");
    std::fs::create_dir_all(&config_dir).unwrap();

    let config_content = r#"
version = 1
[watcher]
debounce_ms = 999
"#;
    std::fs::write(config_dir.join("settings.toml"), config_content).unwrap();

    let output = triago()
        .arg("config")
        .current_dir(temp_path)
        .output()
        .expect("Failed to run config command");

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("version = 1"));
    assert!(stdout.contains("debounce_ms = 999"));
}

#[test]
fn test_assign_prints_id_and_persists() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    assert!(triago()
        .arg("init")
        .current_dir(temp_path)
        .output()
        .unwrap()
        .status
        .success());

    let output = triago()
        .args(["assign", "--title", "時間管理ツール", "--description", "タイマー"])
        .current_dir(temp_path)
        .output()
        .expect("Failed to run assign command");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim(), "001");

    // Overlapping keyword from a separate invocation gets the same id.
    let output = triago()
        .args(["assign", "--title", "ポモドーロタイマー", "--json"])
        .current_dir(temp_path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("assign --json emits valid JSON");
    assert_eq!(parsed["id"], "001");
    assert_eq!(parsed["decision"], "matched");

    assert!(temp_path.join(".triago/registry.json").exists());
    assert!(temp_path.join(".triago/audit.log").exists());
}

#[test]
fn test_list_command_shows_registered_categories() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    assert!(triago()
        .arg("init")
        .current_dir(temp_path)
        .output()
        .unwrap()
        .status
        .success());
    assert!(triago()
        .args(["assign", "--title", "Fix login timeout"])
        .current_dir(temp_path)
        .output()
        .unwrap()
        .status
        .success());

    let output = triago()
        .args(["list", "--json"])
        .current_dir(temp_path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = parsed.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], "001");
    assert_eq!(entries[0]["key"], "fix-login-timeout");
    assert_eq!(entries[0]["display_name"], "Fix login timeout");
}

#[test]
fn test_restore_without_snapshots_reports_error() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    assert!(triago()
        .arg("init")
        .current_dir(temp_path)
        .output()
        .unwrap()
        .status
        .success());

    let output = triago()
        .arg("restore")
        .current_dir(temp_path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("No backup snapshot"), "stderr: {stderr}");

    // With the fallback flag the command succeeds and writes the
    // placeholder document.
    let output = triago()
        .args(["restore", "--placeholder-on-failure"])
        .current_dir(temp_path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let document = temp_path.join("REQUESTS.md");
    let content = std::fs::read_to_string(&document).unwrap();
    assert!(content.contains("placeholder"));
}

#[test]
fn test_custom_config_flag() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let config_path = temp_path.join("custom.toml");
    let registry_path = temp_path.join("my-registry.json");
    let config_content = format!(
        r#"
version = 1
[registry]
registry_path = "{}"
lock_path = "{}"
audit_path = "{}"
"#,
        registry_path.display(),
        temp_path.join("my.lock").display(),
        temp_path.join("my-audit.log").display(),
    );
    std::fs::write(&config_path, config_content).unwrap();

    let output = triago()
        .args(["--config"])
        .arg(&config_path)
        .args(["assign", "--title", "custom path check"])
        .current_dir(temp_path)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    assert!(registry_path.exists());
}
