#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn crawler(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("crawler").unwrap();
    cmd.current_dir(dir.path())
        .env("CRAWLER_ROOT", dir.path())
        .env_remove("RIOT_API_KEY")
        .env_remove("CRAWLER_ADMIN_TOKEN");
    cmd
}

fn init(dir: &TempDir) {
    crawler(dir).arg("init").assert().success();
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// crawler init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_database() {
    let dir = TempDir::new().unwrap();
    crawler(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized crawler"));

    assert!(dir.path().join(".crawler/config.yaml").exists());
    assert!(dir.path().join(".crawler/crawl.redb").exists());
}

#[test]
fn init_keeps_existing_config() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let path = dir.path().join(".crawler/config.yaml");
    std::fs::write(&path, "version: 1\nseed:\n  default_count: 7\n").unwrap();

    crawler(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("kept existing"));
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("default_count: 7"));
}

// ---------------------------------------------------------------------------
// crawler config
// ---------------------------------------------------------------------------

#[test]
fn commands_require_init() {
    let dir = TempDir::new().unwrap();
    crawler(&dir)
        .arg("queue")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn config_validate_warns_about_missing_key() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    crawler(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RIOT_API_KEY"));
}

#[test]
fn config_validate_fails_on_unknown_region() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    std::fs::write(
        dir.path().join(".crawler/config.yaml"),
        "version: 1\nseed:\n  default_region: moon1\n",
    )
    .unwrap();

    crawler(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("moon1"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_show_redacts_the_api_key() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    crawler(&dir)
        .args(["config", "show"])
        .env("RIOT_API_KEY", "RGAPI-secret")
        .assert()
        .success()
        .stdout(predicate::str::contains("<redacted>"))
        .stdout(predicate::str::contains("RGAPI-secret").not());
}

// ---------------------------------------------------------------------------
// crawler queue / seed / retry-failed / process
// ---------------------------------------------------------------------------

#[test]
fn queue_json_on_empty_database() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let json = json_stdout(crawler(&dir).args(["queue", "--json"]));
    assert_eq!(json["total"], 0);
    assert_eq!(json["queue"]["pending"], 0);
}

#[test]
fn seed_on_empty_database_adds_nobody() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let json = json_stdout(crawler(&dir).args(["seed", "--region", "KR", "--count", "5", "-j"]));
    assert_eq!(json["region"], "kr");
    assert_eq!(json["report"]["matchesAnalyzed"], 0);
    assert_eq!(json["report"]["newPlayersAdded"], 0);
}

#[test]
fn seed_rejects_unknown_region_and_zero_count() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    crawler(&dir)
        .args(["seed", "--region", "moon1"])
        .assert()
        .failure();
    crawler(&dir)
        .args(["seed", "--count", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("positive"));
}

#[test]
fn retry_failed_on_empty_database() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    crawler(&dir)
        .arg("retry-failed")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reset 0 failed player(s)"));
}

#[test]
fn process_without_api_key_fails() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    crawler(&dir)
        .arg("process")
        .assert()
        .failure()
        .stderr(predicate::str::contains("RIOT_API_KEY"));
}
