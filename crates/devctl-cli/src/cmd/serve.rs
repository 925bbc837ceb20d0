use anyhow::{Context, Result};
use devctl_core::config::{Config, WarnLevel};
use devctl_server::AppState;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

pub fn run(root: &Path, bind: &str, port: u16) -> Result<()> {
    let config = Config::load(root).context("failed to load config")?;

    let warnings = config.validate();
    for w in &warnings {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => tracing::error!("config: {}", w.message),
        }
    }
    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("refusing to serve: config validation found errors");
    }
    if config.tokens.is_empty() {
        tracing::warn!("no API tokens configured; every /api request will be rejected");
    }

    let addr = bind_addr(bind, port)?;

    let state = AppState::new(config, root);
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(devctl_server::serve(state, addr))
}

/// `--bind` takes a bare IPv4 or IPv6 address; brackets around IPv6 are
/// accepted.
fn bind_addr(bind: &str, port: u16) -> Result<SocketAddr> {
    let host = bind
        .strip_prefix('[')
        .and_then(|b| b.strip_suffix(']'))
        .unwrap_or(bind);
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("invalid bind address '{bind}'"))?;
    Ok(SocketAddr::new(ip, port))
}
