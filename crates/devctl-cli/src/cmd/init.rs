use anyhow::Context;
use devctl_core::{config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing devctl in: {}", root.display());

    let devctl_dir = paths::devctl_dir(root);
    io::ensure_dir(&devctl_dir)
        .with_context(|| format!("failed to create {}", devctl_dir.display()))?;

    let config_path = paths::config_path(root);
    let config = if config_path.exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
        Config::load(root).context("failed to load config")?
    } else {
        let cfg = Config::default();
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
        cfg
    };

    let backup_dir = config.backup_dir(root);
    if backup_dir.is_dir() {
        println!("  exists:  {}", backup_dir.display());
    } else {
        io::ensure_dir(&backup_dir)
            .with_context(|| format!("failed to create {}", backup_dir.display()))?;
        println!("  created: {}", backup_dir.display());
    }

    if config.tokens.is_empty() {
        println!();
        println!("No API tokens configured. Add entries under `tokens:` before running `devctl serve`.");
    }
    Ok(())
}
