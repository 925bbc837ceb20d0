//! Command gateway: turns validated requests into exactly one subprocess
//! invocation each and returns the normalized result.
//!
//! The gateway re-validates every name it is handed even though the API
//! layer validated already; nothing reaches an argument vector or a path
//! without passing [`validate_name`].

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::backup::{self, BackupArtifact};
use crate::config::Config;
use crate::error::{DevctlError, Result};
use crate::exec::{CommandExecutor, CommandResult, Invocation, SystemExecutor};
use crate::status::{parse_container_lines, ContainerSummary};
use crate::types::ContainerAction;
use crate::validate::validate_name;

/// Lock key shared by backup and restore.
const DATABASE_LOCK: &str = "database";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ContainerListing {
    pub result: CommandResult,
    pub containers: Vec<ContainerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupOutcome {
    /// Final artifact name, synthesized when none was requested.
    pub filename: String,
    pub result: CommandResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DockerStatus {
    pub available: bool,
    pub version: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseMetrics {
    pub threads_connected: Option<u64>,
    pub uptime_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Per-target locks
// ---------------------------------------------------------------------------

/// One mutex per target name. Actions on the same target run one at a
/// time; different targets do not contend. An entry lives only while some
/// caller holds or waits on it.
#[derive(Debug, Default)]
struct TargetLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TargetLocks {
    /// Run `f` while holding the lock for `key`.
    fn with<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let lock = self.acquire(key);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(key, lock);
        result
    }

    fn acquire(&self, key: &str) -> Arc<Mutex<()>> {
        let mut map = self.map();
        map.entry(key.to_string()).or_default().clone()
    }

    /// Drop the entry when the map and `lock` are its only owners. Clones
    /// are only taken under the map lock, so the count cannot rise while
    /// we check it.
    fn release(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut map = self.map();
        let unused = map
            .get(key)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2);
        if unused {
            map.remove(key);
        }
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub struct Gateway {
    executor: Arc<dyn CommandExecutor>,
    config: Config,
    backup_dir: PathBuf,
    locks: TargetLocks,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("docker", &self.config.docker.path)
            .field("backup_dir", &self.backup_dir)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(config: Config, root: &Path, executor: Arc<dyn CommandExecutor>) -> Self {
        let backup_dir = config.backup_dir(root);
        Self {
            executor,
            config,
            backup_dir,
            locks: TargetLocks::default(),
        }
    }

    /// Gateway backed by real processes.
    pub fn system(config: Config, root: &Path) -> Self {
        Self::new(config, root, Arc::new(SystemExecutor))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Requested tail length bounded to `1..=logs.max_lines`.
    pub fn clamp_lines(&self, requested: u32) -> u32 {
        requested.clamp(1, self.config.logs.max_lines.max(1))
    }

    fn docker(&self) -> Invocation {
        Invocation::new(&self.config.docker.path).timeout(self.config.docker.timeout())
    }

    /// Client invocation with host, port, user and the password in `MYSQL_PWD`.
    fn mysql(&self, program: &str) -> Invocation {
        let db = &self.config.database;
        let port = db.port.to_string();
        let mut inv = Invocation::new(program).args([
            "-h",
            db.host.as_str(),
            "-P",
            port.as_str(),
            "-u",
            db.user.as_str(),
        ]);
        if let Some(password) = db.resolved_password() {
            inv = inv.env("MYSQL_PWD", password);
        }
        inv
    }

    fn run_locked(&self, key: &str, invocation: &Invocation) -> CommandResult {
        self.locks.with(key, || self.executor.execute(invocation))
    }

    // -----------------------------------------------------------------------
    // Containers
    // -----------------------------------------------------------------------

    /// `docker <action> <name>`.
    pub fn run_container_action(
        &self,
        action: ContainerAction,
        container: &str,
    ) -> Result<CommandResult> {
        validate_name(container)?;
        let inv = self.docker().args([action.as_str(), container]);
        Ok(self.run_locked(&format!("container:{container}"), &inv))
    }

    /// `docker logs --tail <n> <name>`.
    pub fn fetch_logs(&self, container: &str, lines: u32) -> Result<CommandResult> {
        validate_name(container)?;
        let lines = self.clamp_lines(lines).to_string();
        let inv = self.docker().args(["logs", "--tail", lines.as_str(), container]);
        Ok(self.executor.execute(&inv))
    }

    /// `docker ps -a --format json`, one container per output line.
    pub fn list_containers(&self) -> ContainerListing {
        let inv = self.docker().args(["ps", "-a", "--format", "json"]);
        let result = self.executor.execute(&inv);
        let containers = if result.success {
            parse_container_lines(&result.output)
        } else {
            Vec::new()
        };
        ContainerListing { result, containers }
    }

    /// Server version via `docker version`. A binary that is not on `PATH`
    /// is reported without spawning anything.
    pub fn docker_status(&self) -> DockerStatus {
        if let Err(e) = which::which(&self.config.docker.path) {
            return DockerStatus {
                available: false,
                version: String::new(),
                error: format!("{}: {e}", self.config.docker.path),
            };
        }
        let inv = self
            .docker()
            .args(["version", "--format", "{{.Server.Version}}"]);
        let result = self.executor.execute(&inv);
        if result.success {
            DockerStatus {
                available: true,
                version: result.output,
                error: String::new(),
            }
        } else {
            DockerStatus {
                available: false,
                version: String::new(),
                error: result.output,
            }
        }
    }

    // -----------------------------------------------------------------------
    // Database
    // -----------------------------------------------------------------------

    /// Dump the database into a new artifact.
    ///
    /// The dump is staged in a hidden temp file inside the backup directory
    /// and renamed into place only when the dump tool exits 0. An existing
    /// artifact of the same name is never replaced.
    pub fn run_backup(&self, filename: Option<&str>) -> Result<BackupOutcome> {
        let filename = match filename.filter(|f| !f.is_empty()) {
            Some(f) => f.to_string(),
            None => backup::default_filename(chrono::Utc::now()),
        };
        validate_name(&filename)?;

        crate::io::ensure_dir(&self.backup_dir)?;
        let target = self.backup_dir.join(&filename);
        if target.exists() {
            return Err(DevctlError::BackupExists(filename));
        }

        let staging = crate::io::staging_file(&self.backup_dir)?;

        let db = &self.config.database;
        let inv = self
            .mysql(&db.dump_path)
            .arg(db.name.as_str())
            .stdout_to(staging.path())
            .timeout(db.timeout());
        let result = self.run_locked(DATABASE_LOCK, &inv);

        if result.success {
            if !crate::io::persist_new(staging, &target)? {
                return Err(DevctlError::BackupExists(filename));
            }
            tracing::info!(file = %filename, "backup written");
        }
        Ok(BackupOutcome { filename, result })
    }

    /// Load an existing artifact into the database via the client's stdin.
    pub fn run_restore(&self, filename: &str) -> Result<CommandResult> {
        let path = backup::resolve_restore_path(&self.backup_dir, filename)?;
        let db = &self.config.database;
        let inv = self
            .mysql(&db.client_path)
            .arg(db.name.as_str())
            .stdin_from(path)
            .timeout(db.timeout());
        Ok(self.run_locked(DATABASE_LOCK, &inv))
    }

    pub fn list_backups(&self) -> Result<Vec<BackupArtifact>> {
        backup::list_artifacts(&self.backup_dir)
    }

    /// `Threads_connected` and `Uptime` from `SHOW GLOBAL STATUS`.
    /// Uses the short docker timeout; a status query should never take long.
    pub fn database_metrics(&self) -> DatabaseMetrics {
        let db = &self.config.database;
        let inv = self
            .mysql(&db.client_path)
            .args([
                "-N",
                "-B",
                "-e",
                "SHOW GLOBAL STATUS WHERE Variable_name IN ('Threads_connected', 'Uptime')",
                db.name.as_str(),
            ])
            .timeout(self.config.docker.timeout());
        let result = self.executor.execute(&inv);
        if !result.success {
            return DatabaseMetrics {
                error: Some(result.output),
                ..DatabaseMetrics::default()
            };
        }
        parse_global_status(&result.output)
    }
}

fn parse_global_status(output: &str) -> DatabaseMetrics {
    let mut metrics = DatabaseMetrics::default();
    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let value = value.parse::<u64>().ok();
        match name {
            "Threads_connected" => metrics.threads_connected = value,
            "Uptime" => metrics.uptime_seconds = value,
            _ => {}
        }
    }
    metrics
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
