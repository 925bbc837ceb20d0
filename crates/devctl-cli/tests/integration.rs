#![allow(deprecated)]
use assert_cmd::Command;
use devctl_core::config::Config;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn devctl(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("devctl").unwrap();
    cmd.current_dir(dir.path())
        .env("DEVCTL_ROOT", dir.path())
        .env_remove("RUST_LOG")
        .env_remove("DEVCTL_DB_PASSWORD");
    cmd
}

// ---------------------------------------------------------------------------
// Fake tools
// ---------------------------------------------------------------------------

const FAKE_DOCKER: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/docker-calls.log"
if [ "$2" = "ghost" ]; then
  echo "Error response from daemon: No such container: ghost" >&2
  exit 1
fi
case "$1" in
  start|stop|restart) echo "$2" ;;
  logs) echo "log line 1"; echo "log line 2" ;;
  ps)
    echo '{"ID":"a1b2c3d4e5f6a7b8","Names":"web","Image":"nginx:1.25","Status":"Up 2 hours","Ports":"80/tcp","State":"running"}'
    echo 'not json'
    echo '{"ID":"ffee","Names":"db","Image":"mysql:8","Status":"Exited (0)","Ports":"","State":"exited"}'
    ;;
  version) echo "24.0.7" ;;
  *) echo "unknown command: $1" >&2; exit 1 ;;
esac
"#;

const FAKE_DUMP: &str = r#"#!/bin/sh
echo "-- fake dump"
echo "CREATE TABLE t (id INT);"
"#;

const FAKE_CLIENT: &str = r#"#!/bin/sh
if [ "$1" = "-h" ] && echo "$@" | grep -q "SHOW GLOBAL STATUS"; then
  printf 'Threads_connected\t3\nUptime\t500\n'
  exit 0
fi
cat > "$(dirname "$0")/restored.sql"
"#;

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Initialize a project whose config points at the fake tools.
#[cfg(unix)]
fn init_project(dir: &TempDir) -> PathBuf {
    let bin = dir.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let docker = write_script(&bin, "docker", FAKE_DOCKER);
    let dump = write_script(&bin, "mysqldump", FAKE_DUMP);
    let client = write_script(&bin, "mysql", FAKE_CLIENT);

    devctl(dir).arg("init").assert().success();

    let mut cfg = Config::load(dir.path()).unwrap();
    cfg.docker.path = docker.display().to_string();
    cfg.docker.timeout_seconds = 10;
    cfg.database.dump_path = dump.display().to_string();
    cfg.database.client_path = client.display().to_string();
    cfg.save(dir.path()).unwrap();
    bin
}

// ---------------------------------------------------------------------------
// init / config
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_backup_dir() {
    let dir = TempDir::new().unwrap();
    devctl(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .devctl/config.yaml"));
    assert!(dir.path().join(".devctl/config.yaml").is_file());
    assert!(dir.path().join(".devctl/backups").is_dir());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    devctl(&dir).arg("init").assert().success();
    devctl(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .devctl/config.yaml"));
}

#[test]
fn commands_before_init_fail() {
    let dir = TempDir::new().unwrap();
    devctl(&dir)
        .arg("ps")
        .assert()
        .failure()
        .stderr(predicate::str::contains("devctl init"));
}

#[test]
fn config_validate_clean_default() {
    let dir = TempDir::new().unwrap();
    devctl(&dir).arg("init").assert().success();
    devctl(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_rejects_short_token() {
    let dir = TempDir::new().unwrap();
    devctl(&dir).arg("init").assert().success();
    let path = dir.path().join(".devctl/config.yaml");
    let mut yaml = std::fs::read_to_string(&path).unwrap();
    yaml.push_str("tokens:\n  - user: ops\n    token: short\n    capabilities: [view]\n");
    std::fs::write(&path, yaml).unwrap();

    devctl(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("shorter than 16"));
    devctl(&dir)
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("refusing to serve"));
}

#[test]
fn config_show_masks_tokens() {
    let dir = TempDir::new().unwrap();
    devctl(&dir).arg("init").assert().success();
    let path = dir.path().join(".devctl/config.yaml");
    let mut yaml = std::fs::read_to_string(&path).unwrap();
    yaml.push_str(
        "tokens:\n  - user: ops\n    token: supersecrettoken-1234\n    capabilities: [view]\n",
    );
    std::fs::write(&path, yaml).unwrap();

    devctl(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("supe****"))
        .stdout(predicate::str::contains("supersecrettoken").not());
}

// ---------------------------------------------------------------------------
// containers
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn container_start_runs_docker() {
    let dir = TempDir::new().unwrap();
    let bin = init_project(&dir);
    devctl(&dir)
        .args(["container", "start", "web-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Container started successfully"));
    let calls = std::fs::read_to_string(bin.join("docker-calls.log")).unwrap();
    assert_eq!(calls.trim(), "start web-01");
}

#[cfg(unix)]
#[test]
fn container_failure_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let stderr = devctl(&dir)
        .args(["container", "stop", "ghost"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed to stop container ghost"))
        .stderr(predicate::str::contains("error: command exited with code 1"))
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(stderr).unwrap();
    assert_eq!(stderr.matches("No such container: ghost").count(), 1);
}

#[cfg(unix)]
#[test]
fn container_invalid_name_never_runs_docker() {
    let dir = TempDir::new().unwrap();
    let bin = init_project(&dir);
    devctl(&dir)
        .args(["container", "restart", "../etc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid name"));
    assert!(!bin.join("docker-calls.log").exists());
}

#[cfg(unix)]
#[test]
fn container_json_output() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let out = devctl(&dir)
        .args(["--json", "container", "restart", "db"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["success"], true);
    assert_eq!(v["action"], "restart");
    assert_eq!(v["container"], "db");
}

#[cfg(unix)]
#[test]
fn logs_passes_tail_count() {
    let dir = TempDir::new().unwrap();
    let bin = init_project(&dir);
    devctl(&dir)
        .args(["logs", "db", "--lines", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("log line 2"));
    let calls = std::fs::read_to_string(bin.join("docker-calls.log")).unwrap();
    assert_eq!(calls.trim(), "logs --tail 50 db");
}

#[cfg(unix)]
#[test]
fn ps_lists_valid_rows_only() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    devctl(&dir)
        .arg("ps")
        .assert()
        .success()
        .stdout(predicate::str::contains("a1b2c3d4e5f6"))
        .stdout(predicate::str::contains("nginx:1.25"))
        .stdout(predicate::str::contains("mysql:8"))
        .stdout(predicate::str::contains("not json").not());
}

// ---------------------------------------------------------------------------
// backups
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn backup_list_restore_roundtrip() {
    let dir = TempDir::new().unwrap();
    let bin = init_project(&dir);

    devctl(&dir)
        .args(["backup", "--filename", "nightly.sql"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created: nightly.sql"));
    let artifact = dir.path().join(".devctl/backups/nightly.sql");
    assert!(std::fs::read_to_string(&artifact)
        .unwrap()
        .contains("CREATE TABLE"));

    devctl(&dir)
        .arg("backups")
        .assert()
        .success()
        .stdout(predicate::str::contains("nightly.sql"));

    devctl(&dir)
        .args(["restore", "nightly.sql"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restore completed: nightly.sql"));
    let restored = std::fs::read_to_string(bin.join("restored.sql")).unwrap();
    assert!(restored.contains("CREATE TABLE"));
}

#[cfg(unix)]
#[test]
fn backup_default_name_and_no_overwrite() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let out = devctl(&dir)
        .args(["--json", "backup"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let name = v["filename"].as_str().unwrap().to_string();
    assert!(name.starts_with("backup_") && name.ends_with(".sql"));

    devctl(&dir)
        .args(["backup", "--filename", &name])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[cfg(unix)]
#[test]
fn restore_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let bin = init_project(&dir);
    devctl(&dir)
        .args(["restore", "missing.sql"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("backup file not found: missing.sql"));
    assert!(!bin.join("restored.sql").exists());
}

// ---------------------------------------------------------------------------
// info / metrics
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn info_reports_docker_version() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    devctl(&dir)
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("available (server 24.0.7)"));
}

#[cfg(unix)]
#[test]
fn metrics_json_counts() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let out = devctl(&dir)
        .args(["--json", "metrics"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["metrics"]["containers_total"], 2);
    assert_eq!(v["metrics"]["containers_running"], 1);
    assert_eq!(v["metrics"]["db_threads_connected"], 3);
    assert_eq!(v["metrics"]["db_uptime_seconds"], 500);
}
