use thiserror::Error;

use crate::auth::Capability;

#[derive(Debug, Error)]
pub enum DevctlError {
    #[error("not initialized: run 'devctl init'")]
    NotInitialized,

    #[error("devctl is disabled in configuration")]
    Disabled,

    #[error("invalid action '{0}'")]
    InvalidAction(String),

    #[error("invalid name '{0}': only letters, digits, '.', '_' and '-' are allowed (max 100)")]
    InvalidTargetName(String),

    #[error("filename required for restore")]
    MissingFilename,

    #[error("backup file not found: {0}")]
    FileNotFound(String),

    #[error("backup file already exists: {0}")]
    BackupExists(String),

    #[error("permission denied: missing capability '{capability}'")]
    PermissionDenied { capability: Capability },

    #[error("command exited with code {exit_code}: {output}")]
    SubprocessFailed { exit_code: i32, output: String },

    #[error("command timed out after {seconds}s")]
    TimedOut { seconds: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DevctlError {
    /// Short machine-readable kind, used in logs only.
    pub fn kind(&self) -> &'static str {
        match self {
            DevctlError::NotInitialized => "not_initialized",
            DevctlError::Disabled => "disabled",
            DevctlError::InvalidAction(_) => "invalid_action",
            DevctlError::InvalidTargetName(_) => "invalid_target_name",
            DevctlError::MissingFilename => "missing_filename",
            DevctlError::FileNotFound(_) => "file_not_found",
            DevctlError::BackupExists(_) => "backup_exists",
            DevctlError::PermissionDenied { .. } => "permission_denied",
            DevctlError::SubprocessFailed { .. } => "subprocess_failed",
            DevctlError::TimedOut { .. } => "timed_out",
            DevctlError::Io(_) => "io",
            DevctlError::Yaml(_) => "yaml",
            DevctlError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, DevctlError>;
