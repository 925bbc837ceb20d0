use devctl_core::api;
use std::path::Path;

use super::{gateway, operator};
use crate::output::{human_bytes, print_json, print_table};

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let gw = gateway(root)?;
    let resp = api::get_metrics(&gw, &operator())?;

    if json {
        return print_json(&resp);
    }

    let m = &resp.metrics;
    let load = m
        .load_average
        .map(|[a, b, c]| format!("{a:.2} {b:.2} {c:.2}"));
    let rows = vec![
        vec!["containers".into(), m.containers_total.to_string()],
        vec!["containers running".into(), m.containers_running.to_string()],
        vec!["backups".into(), m.backups_total.to_string()],
        vec!["backup size".into(), human_bytes(m.backups_bytes)],
        vec!["db threads connected".into(), or_dash(m.db_threads_connected)],
        vec!["db uptime (s)".into(), or_dash(m.db_uptime_seconds)],
        vec!["load average".into(), or_dash(load)],
    ];
    print_table(&["METRIC", "VALUE"], rows);
    Ok(())
}
