use devctl_core::api;
use std::path::Path;

use super::{ensure_success, gateway, operator, Outcome};
use crate::output::print_json;

pub fn run(root: &Path, name: &str, lines: Option<u32>, json: bool) -> anyhow::Result<()> {
    let gw = gateway(root)?;
    let resp = api::get_logs(&gw, &operator(), name, lines)?;

    if json {
        print_json(&resp)?;
    } else if resp.success {
        println!("{}", resp.logs);
    }

    ensure_success(
        Outcome {
            success: resp.success,
            timed_out: resp.timed_out,
            exit_code: resp.exit_code,
            output: &resp.logs,
        },
        gw.config().docker.timeout_seconds,
    )
}
