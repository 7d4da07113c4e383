//! Binary-boundary tests
//!
//! Run the compiled binary end to end to check exit status and error
//! reporting. No remote services are involved; failures are provoked
//! through missing configuration, and the config directory is pointed
//! at a temp dir so a developer's real config file cannot leak in.

use std::process::Command;

use tempfile::TempDir;

fn vault_command(config_home: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_kms-vault"));
    command
        .env("HOME", config_home.path())
        .env("XDG_CONFIG_HOME", config_home.path());
    command
}

#[test]
fn test_missing_key_id_fails_with_logged_error() {
    let dir = TempDir::new().unwrap();
    let output = vault_command(&dir)
        .args(["store", "--bucket", "vault-bucket"])
        .env_remove("KMS_VAULT_KEY_ID")
        .output()
        .expect("Failed to run kms-vault");

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Command failed"), "missing error log in: {stdout}");
    assert!(stdout.contains("key id is required"), "missing cause in: {stdout}");
}

#[test]
fn test_config_init_writes_default_file() {
    let dir = TempDir::new().unwrap();

    let output = vault_command(&dir)
        .args(["config", "init"])
        .output()
        .expect("Failed to run kms-vault");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Config file at"));

    // A second init leaves the existing file alone and still reports it.
    let output = vault_command(&dir)
        .args(["config", "init"])
        .output()
        .expect("Failed to run kms-vault");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Config file at"));
}
