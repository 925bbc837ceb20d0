pub mod backup;
pub mod config;
pub mod container;
pub mod info;
pub mod init;
pub mod logs;
pub mod metrics;
pub mod ps;
pub mod serve;

use anyhow::Context;
use devctl_core::auth::AuthContext;
use devctl_core::config::Config;
use devctl_core::gateway::Gateway;
use devctl_core::DevctlError;
use std::path::Path;

/// Gateway over real processes for the project at `root`.
pub fn gateway(root: &Path) -> anyhow::Result<Gateway> {
    let config = Config::load(root).context("failed to load config")?;
    Ok(Gateway::system(config, root))
}

/// The local user. Anyone who can run the binary against the project
/// directory holds every capability.
pub fn operator() -> AuthContext {
    let user = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
    AuthContext::operator(user)
}

/// Outcome fields shared by responses that wrap one subprocess.
pub struct Outcome<'a> {
    pub success: bool,
    pub timed_out: bool,
    pub exit_code: i32,
    pub output: &'a str,
}

/// Turn an unsuccessful command into the matching error so the process
/// exits non-zero.
pub fn ensure_success(outcome: Outcome<'_>, timeout_seconds: u64) -> anyhow::Result<()> {
    if outcome.timed_out {
        // Output written before the kill; the last line is the timeout notice
        // the error repeats.
        if let Some((partial, _)) = outcome.output.rsplit_once('\n') {
            eprintln!("{partial}");
        }
        return Err(DevctlError::TimedOut {
            seconds: timeout_seconds,
        }
        .into());
    }
    if !outcome.success {
        return Err(DevctlError::SubprocessFailed {
            exit_code: outcome.exit_code,
            output: outcome.output.to_string(),
        }
        .into());
    }
    Ok(())
}
