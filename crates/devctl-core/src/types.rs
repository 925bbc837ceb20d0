use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DevctlError;

// ---------------------------------------------------------------------------
// ContainerAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerAction {
    Start,
    Stop,
    Restart,
}

impl ContainerAction {
    pub fn all() -> &'static [ContainerAction] {
        &[
            ContainerAction::Start,
            ContainerAction::Stop,
            ContainerAction::Restart,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContainerAction::Start => "start",
            ContainerAction::Stop => "stop",
            ContainerAction::Restart => "restart",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            ContainerAction::Start => "started",
            ContainerAction::Stop => "stopped",
            ContainerAction::Restart => "restarted",
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContainerAction {
    type Err = DevctlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(ContainerAction::Start),
            "stop" => Ok(ContainerAction::Stop),
            "restart" => Ok(ContainerAction::Restart),
            _ => Err(DevctlError::InvalidAction(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// DataAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataAction {
    Backup,
    Restore,
}

impl DataAction {
    pub fn as_str(self) -> &'static str {
        match self {
            DataAction::Backup => "backup",
            DataAction::Restore => "restore",
        }
    }
}

impl fmt::Display for DataAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataAction {
    type Err = DevctlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backup" => Ok(DataAction::Backup),
            "restore" => Ok(DataAction::Restore),
            _ => Err(DevctlError::InvalidAction(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
