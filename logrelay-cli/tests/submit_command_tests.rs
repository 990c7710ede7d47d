//! Integration tests for `logrelay-cli` against a spool broker.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn cli() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_logrelay-cli"));
    cmd.env_remove("LOGRELAY_CONFIG_FILE");
    cmd
}

fn write_config(dir: &Path, broker_url: &str) -> std::path::PathBuf {
    let path = dir.join("logrelay.yml");
    fs::write(&path, format!("broker_url: \"{broker_url}\"\n")).expect("should write config");
    path
}

fn ready_tasks(spool: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(spool.join("parsers").join("ready")) else {
        return Vec::new();
    };
    let mut tasks: Vec<String> = entries
        .map(|entry| fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect();
    tasks.sort();
    tasks
}

#[test]
fn test_submit_default_message() {
    // Given: A config pointing at a spool directory
    let temp_dir = TempDir::new().unwrap();
    let spool = temp_dir.path().join("spool");
    let config = write_config(temp_dir.path(), &format!("spool://{}", spool.display()));

    // When: Running without a message
    let output = cli().arg("-c").arg(&config).output().unwrap();

    // Then: One parse task carrying the default message is queued
    assert!(output.status.success(), "{:?}", output);
    let tasks = ready_tasks(&spool);
    assert_eq!(
        tasks,
        vec![r#"{"version":1,"task":{"kind":"parse","message":"test message"}}"#.to_owned()]
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("queue 'parsers'"));
}

#[test]
fn test_submit_uses_environment_config() {
    // Given: Config selected through the environment
    let temp_dir = TempDir::new().unwrap();
    let spool = temp_dir.path().join("spool");
    let config = write_config(temp_dir.path(), &format!("spool://{}", spool.display()));

    // When: Submitting a custom message with JSON output
    let output = cli()
        .env("LOGRELAY_CONFIG_FILE", &config)
        .args(["disk full", "--output", "json"])
        .output()
        .unwrap();

    // Then: Receipt is JSON and the task is queued
    assert!(output.status.success(), "{:?}", output);
    let receipt: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(receipt["message"], "disk full");
    assert_eq!(receipt["broker"], "spool");
    assert_eq!(ready_tasks(&spool).len(), 1);
}

#[test]
fn test_submit_with_parser_override() {
    let temp_dir = TempDir::new().unwrap();
    let spool = temp_dir.path().join("spool");
    let config = write_config(temp_dir.path(), &format!("spool://{}", spool.display()));

    let output = cli()
        .arg("-c")
        .arg(&config)
        .args(["hello", "--parsers", r#"[{"plain": {"type": "greeting"}}]"#])
        .output()
        .unwrap();

    assert!(output.status.success(), "{:?}", output);
    let tasks = ready_tasks(&spool);
    assert!(tasks[0].contains(r#""parsers":[{"plain":{"type":"greeting"}}]"#), "{}", tasks[0]);
}

#[test]
fn test_unknown_parser_override_is_a_configuration_error() {
    // Given: An override naming a parser that does not exist
    let temp_dir = TempDir::new().unwrap();
    let spool = temp_dir.path().join("spool");
    let config = write_config(temp_dir.path(), &format!("spool://{}", spool.display()));

    // When: Submitting
    let output = cli()
        .arg("-c")
        .arg(&config)
        .args(["hello", "--parsers", r#"[{"nope": {}}]"#])
        .output()
        .unwrap();

    // Then: Exit code 2 and nothing queued
    assert_eq!(output.status.code(), Some(2));
    assert!(ready_tasks(&spool).is_empty());
}

#[test]
fn test_unsupported_broker_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), "amqp://guest@localhost//");

    let output = cli().arg("-c").arg(&config).output().unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("broker unavailable"));
}

#[test]
fn test_version_flag() {
    let output = cli().arg("-v").output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_relative_spool_resolves_under_home() {
    // Given: A relative spool URL and a home directory, run from elsewhere
    let home = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    let config = home.path().join("logrelay.yml");
    fs::write(
        &config,
        format!(
            "broker_url: \"spool://spool\"\nhome: \"{}\"\n",
            home.path().display()
        ),
    )
    .unwrap();

    // When: Submitting
    let output = cli()
        .current_dir(elsewhere.path())
        .arg("-c")
        .arg(&config)
        .output()
        .unwrap();

    // Then: The task lands in the spool under home, not under the caller's cwd
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(ready_tasks(&home.path().join("spool")).len(), 1);
    assert!(!elsewhere.path().join("spool").exists());
}

#[test]
fn test_missing_home_is_a_configuration_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("logrelay.yml");
    fs::write(
        &config,
        "broker_url: \"spool://spool\"\nhome: \"/nonexistent/logrelay-home\"\n",
    )
    .unwrap();

    let output = cli().arg("-c").arg(&config).output().unwrap();

    assert_eq!(output.status.code(), Some(2));
}
