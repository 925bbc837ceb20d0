//! Name-safety checks applied before anything is handed to a subprocess.
//!
//! Container names and backup filenames go into an argument vector and, for
//! backups, into a path under the backup directory. The predicate below is
//! the only barrier against argument injection and path traversal, so it
//! fails closed.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{DevctlError, Result};
use crate::types::{ContainerAction, DataAction};

pub const MAX_NAME_LEN: usize = 100;

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("static regex is valid"))
}

/// True when `name` is 1..=100 chars of `[A-Za-z0-9._-]` with no `..` and no `/`.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name_re().is_match(name)
        && !name.contains("..")
        && !name.contains('/')
}

pub fn validate_name(name: &str) -> Result<()> {
    if !is_safe_name(name) {
        return Err(DevctlError::InvalidTargetName(name.to_string()));
    }
    Ok(())
}

/// Parse and validate a container action request.
pub fn validate_container_request(action: &str, container: &str) -> Result<ContainerAction> {
    let action: ContainerAction = action.parse()?;
    validate_name(container)?;
    Ok(action)
}

/// Parse and validate a backup/restore request.
///
/// Backup accepts an empty filename (one is synthesized later); restore does not.
pub fn validate_data_request(action: &str, filename: &str) -> Result<DataAction> {
    let action: DataAction = action.parse()?;
    match action {
        DataAction::Restore if filename.is_empty() => return Err(DevctlError::MissingFilename),
        DataAction::Backup if filename.is_empty() => {}
        _ => validate_name(filename)?,
    }
    Ok(action)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
