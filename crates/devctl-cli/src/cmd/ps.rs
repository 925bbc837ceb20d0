use devctl_core::api;
use std::path::Path;

use super::{gateway, operator};
use crate::output::{print_json, print_table};

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let gw = gateway(root)?;
    let resp = api::get_container_status(&gw, &operator())?;

    if json {
        print_json(&resp)?;
    } else if resp.containers.is_empty() && resp.success {
        println!("No containers.");
    } else {
        let rows = resp
            .containers
            .iter()
            .map(|c| {
                vec![
                    c.id.chars().take(12).collect(),
                    c.name.clone(),
                    c.image.clone(),
                    c.status.clone(),
                    c.ports.clone(),
                ]
            })
            .collect();
        print_table(&["ID", "NAME", "IMAGE", "STATUS", "PORTS"], rows);
    }

    if !resp.success {
        anyhow::bail!(
            "container listing failed: {}",
            resp.message.unwrap_or_default()
        );
    }
    Ok(())
}
