use devctl_core::api::{self, BackupRestoreResponse};
use devctl_core::gateway::Gateway;
use std::path::Path;

use super::{ensure_success, gateway, operator, Outcome};
use crate::output::{human_bytes, print_json, print_table};

// ---------------------------------------------------------------------------
// backup / restore
// ---------------------------------------------------------------------------

pub fn backup(root: &Path, filename: Option<&str>, json: bool) -> anyhow::Result<()> {
    let gw = gateway(root)?;
    let resp = api::backup_restore(&gw, &operator(), "backup", filename.unwrap_or(""))?;
    report(&gw, resp, json)
}

pub fn restore(root: &Path, filename: &str, json: bool) -> anyhow::Result<()> {
    let gw = gateway(root)?;
    let resp = api::backup_restore(&gw, &operator(), "restore", filename)?;
    report(&gw, resp, json)
}

fn report(gw: &Gateway, resp: BackupRestoreResponse, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&resp)?;
    } else {
        println!("{}", resp.message);
    }
    ensure_success(
        Outcome {
            success: resp.success,
            timed_out: resp.timed_out,
            exit_code: resp.exit_code,
            output: &resp.output,
        },
        gw.config().database.timeout_seconds,
    )
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

pub fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let gw = gateway(root)?;
    let resp = api::list_backups(&gw, &operator())?;

    if json {
        return print_json(&resp);
    }
    if resp.backups.is_empty() {
        println!("No backups in {}", gw.backup_dir().display());
        return Ok(());
    }
    let rows = resp
        .backups
        .iter()
        .map(|b| {
            vec![
                b.filename.clone(),
                human_bytes(b.size_bytes),
                b.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ]
        })
        .collect();
    print_table(&["FILENAME", "SIZE", "CREATED"], rows);
    Ok(())
}
