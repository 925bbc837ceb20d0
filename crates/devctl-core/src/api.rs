//! Request surface shared by the HTTP server and the CLI.
//!
//! Every entry point takes the caller's [`AuthContext`] and follows the same
//! order: capability check, enabled check, input validation, gateway call.
//! Nothing reaches the gateway until all three pass. Each call is audited.

use serde::Serialize;

use crate::audit::{audited, Audited};
use crate::auth::{AuthContext, Capability};
use crate::backup::BackupArtifact;
use crate::error::{DevctlError, Result};
use crate::exec::CommandResult;
use crate::gateway::{DockerStatus, Gateway};
use crate::status::ContainerSummary;
use crate::types::{ContainerAction, DataAction};
use crate::validate::{validate_container_request, validate_data_request, validate_name};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ManageContainerResponse {
    pub success: bool,
    pub message: String,
    pub output: String,
    pub action: ContainerAction,
    pub container: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogsResponse {
    pub success: bool,
    pub logs: String,
    pub container: String,
    /// Requested tail length after clamping.
    pub lines: u32,
    /// The output cap dropped the oldest of the requested lines.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerStatusResponse {
    pub success: bool,
    pub containers: Vec<ContainerSummary>,
    pub total: usize,
    /// Docker's output when the listing itself failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupRestoreResponse {
    pub success: bool,
    pub message: String,
    pub filename: String,
    pub action: DataAction,
    pub output: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupListResponse {
    pub success: bool,
    pub backups: Vec<BackupArtifact>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfoResponse {
    pub docker: DockerStatus,
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub service_version: String,
    /// Unix seconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Metrics {
    pub containers_total: usize,
    pub containers_running: usize,
    pub backups_total: usize,
    pub backups_bytes: u64,
    pub db_threads_connected: Option<u64>,
    pub db_uptime_seconds: Option<u64>,
    pub load_average: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub success: bool,
    pub metrics: Metrics,
}

impl Audited for ManageContainerResponse {
    fn audit_success(&self) -> bool {
        self.success
    }
    fn audit_exit_code(&self) -> Option<i32> {
        Some(self.exit_code)
    }
}

impl Audited for LogsResponse {
    fn audit_success(&self) -> bool {
        self.success
    }
    fn audit_exit_code(&self) -> Option<i32> {
        Some(self.exit_code)
    }
}

impl Audited for BackupRestoreResponse {
    fn audit_success(&self) -> bool {
        self.success
    }
    fn audit_exit_code(&self) -> Option<i32> {
        Some(self.exit_code)
    }
    fn audit_subject(&self) -> Option<&str> {
        Some(&self.filename)
    }
}

impl Audited for ContainerStatusResponse {
    fn audit_success(&self) -> bool {
        self.success
    }
}

impl Audited for BackupListResponse {
    fn audit_success(&self) -> bool {
        self.success
    }
}

impl Audited for SystemInfoResponse {
    fn audit_success(&self) -> bool {
        true
    }
}

impl Audited for MetricsResponse {
    fn audit_success(&self) -> bool {
        self.success
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn authorize(gw: &Gateway, ctx: &AuthContext, capability: Capability) -> Result<()> {
    ctx.require(capability)?;
    if !gw.config().enabled {
        return Err(DevctlError::Disabled);
    }
    Ok(())
}

/// Human summary for a failed command: the timeout notice (last output
/// line), or `fallback`.
fn failure_message(result: &CommandResult, fallback: String) -> String {
    match result.output.lines().last() {
        Some(notice) if result.timed_out => format!("Command {notice}"),
        _ => fallback,
    }
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

/// Start, stop or restart one container.
pub fn manage_container(
    gw: &Gateway,
    ctx: &AuthContext,
    action: &str,
    container: &str,
) -> Result<ManageContainerResponse> {
    audited(ctx, &format!("container.{action}"), container, || {
        authorize(gw, ctx, Capability::Containers)?;
        let action = validate_container_request(action, container)?;
        let result = gw.run_container_action(action, container)?;

        let message = if result.success {
            format!("Container {} successfully", action.past_tense())
        } else {
            failure_message(&result, format!("Failed to {action} container {container}"))
        };
        Ok(ManageContainerResponse {
            success: result.success,
            message,
            output: result.output,
            action,
            container: container.to_string(),
            exit_code: result.exit_code,
            timed_out: result.timed_out,
        })
    })
}

/// Last `lines` lines of a container's logs. `None` uses `logs.default_lines`.
pub fn get_logs(
    gw: &Gateway,
    ctx: &AuthContext,
    container: &str,
    lines: Option<u32>,
) -> Result<LogsResponse> {
    audited(ctx, "logs", container, || {
        authorize(gw, ctx, Capability::View)?;
        validate_name(container)?;
        let lines = gw.clamp_lines(lines.unwrap_or(gw.config().logs.default_lines));
        let result = gw.fetch_logs(container, lines)?;
        Ok(LogsResponse {
            success: result.success,
            logs: result.output,
            container: container.to_string(),
            lines,
            truncated: result.truncated,
            exit_code: result.exit_code,
            timed_out: result.timed_out,
        })
    })
}

pub fn get_container_status(gw: &Gateway, ctx: &AuthContext) -> Result<ContainerStatusResponse> {
    audited(ctx, "status", "", || {
        authorize(gw, ctx, Capability::View)?;
        let listing = gw.list_containers();
        let message = (!listing.result.success).then(|| listing.result.output.clone());
        Ok(ContainerStatusResponse {
            success: listing.result.success,
            total: listing.containers.len(),
            containers: listing.containers,
            message,
        })
    })
}

// ---------------------------------------------------------------------------
// Backups
// ---------------------------------------------------------------------------

/// Create a backup (empty `filename` synthesizes one) or restore a named one.
pub fn backup_restore(
    gw: &Gateway,
    ctx: &AuthContext,
    action: &str,
    filename: &str,
) -> Result<BackupRestoreResponse> {
    audited(ctx, &format!("database.{action}"), filename, || {
        authorize(gw, ctx, Capability::Manage)?;
        let action = validate_data_request(action, filename)?;

        let (filename, result) = match action {
            DataAction::Backup => {
                let outcome = gw.run_backup(Some(filename))?;
                (outcome.filename, outcome.result)
            }
            DataAction::Restore => (filename.to_string(), gw.run_restore(filename)?),
        };

        let message = match (action, result.success) {
            (DataAction::Backup, true) => format!("Backup created: {filename}"),
            (DataAction::Restore, true) => format!("Restore completed: {filename}"),
            (DataAction::Backup, false) => failure_message(&result, "Backup failed".into()),
            (DataAction::Restore, false) => failure_message(&result, "Restore failed".into()),
        };
        Ok(BackupRestoreResponse {
            success: result.success,
            message,
            filename,
            action,
            output: result.output,
            exit_code: result.exit_code,
            timed_out: result.timed_out,
        })
    })
}

pub fn list_backups(gw: &Gateway, ctx: &AuthContext) -> Result<BackupListResponse> {
    audited(ctx, "backups", "", || {
        authorize(gw, ctx, Capability::View)?;
        let backups = gw.list_backups()?;
        Ok(BackupListResponse {
            success: true,
            total: backups.len(),
            backups,
        })
    })
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

pub fn get_system_info(gw: &Gateway, ctx: &AuthContext) -> Result<SystemInfoResponse> {
    audited(ctx, "system_info", "", || {
        authorize(gw, ctx, Capability::View)?;
        Ok(SystemInfoResponse {
            docker: gw.docker_status(),
            hostname: crate::host::hostname(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        })
    })
}

/// Container, backup, database and host counters. Each source is gathered
/// independently; a database that cannot be reached leaves its fields empty.
pub fn get_metrics(gw: &Gateway, ctx: &AuthContext) -> Result<MetricsResponse> {
    audited(ctx, "metrics", "", || {
        authorize(gw, ctx, Capability::View)?;
        let listing = gw.list_containers();
        let backups = gw.list_backups()?;
        let db = gw.database_metrics();
        if let Some(err) = &db.error {
            tracing::debug!(error = %err, "database metrics unavailable");
        }

        Ok(MetricsResponse {
            success: listing.result.success,
            metrics: Metrics {
                containers_total: listing.containers.len(),
                containers_running: listing.containers.iter().filter(|c| c.is_running()).count(),
                backups_total: backups.len(),
                backups_bytes: backups.iter().map(|b| b.size_bytes).sum(),
                db_threads_connected: db.threads_connected,
                db_uptime_seconds: db.uptime_seconds,
                load_average: crate::host::load_average(),
            },
        })
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
