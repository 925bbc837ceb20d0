use clap::Subcommand;
use devctl_core::api;
use devctl_core::types::ContainerAction;
use std::path::Path;

use super::{ensure_success, gateway, operator, Outcome};
use crate::output::print_json;

#[derive(Subcommand)]
pub enum ContainerSubcommand {
    /// Start a container
    Start { name: String },
    /// Stop a container
    Stop { name: String },
    /// Restart a container
    Restart { name: String },
}

impl ContainerSubcommand {
    fn split(&self) -> (ContainerAction, &str) {
        match self {
            ContainerSubcommand::Start { name } => (ContainerAction::Start, name.as_str()),
            ContainerSubcommand::Stop { name } => (ContainerAction::Stop, name.as_str()),
            ContainerSubcommand::Restart { name } => (ContainerAction::Restart, name.as_str()),
        }
    }
}

pub fn run(root: &Path, subcmd: ContainerSubcommand, json: bool) -> anyhow::Result<()> {
    let gw = gateway(root)?;
    let (action, name) = subcmd.split();
    let resp = api::manage_container(&gw, &operator(), action.as_str(), name)?;

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
        gw.config().docker.timeout_seconds,
    )
}
