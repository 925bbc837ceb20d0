use devctl_core::api;
use std::path::Path;

use super::{gateway, operator};
use crate::output::print_json;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let gw = gateway(root)?;
    let info = api::get_system_info(&gw, &operator())?;

    if json {
        return print_json(&info);
    }

    let docker = if info.docker.available {
        format!("available (server {})", info.docker.version)
    } else {
        format!("not available: {}", info.docker.error)
    };
    println!("Host:     {} ({}/{})", info.hostname, info.os, info.arch);
    println!("Docker:   {docker}");
    println!("Backups:  {}", gw.backup_dir().display());
    println!("devctl:   {}", info.service_version);
    Ok(())
}
