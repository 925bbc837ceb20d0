use std::path::{Path, PathBuf};

pub const DEVCTL_DIR: &str = ".devctl";
pub const CONFIG_FILE: &str = ".devctl/config.yaml";
pub const BACKUPS_DIR: &str = ".devctl/backups";

pub fn devctl_dir(root: &Path) -> PathBuf {
    root.join(DEVCTL_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn default_backup_dir(root: &Path) -> PathBuf {
    root.join(BACKUPS_DIR)
}
