use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{DevctlError, Result};

/// Permission needed to call an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read-only: status, logs, system info, metrics, backup listing.
    View,
    /// Start, stop and restart containers.
    Containers,
    /// Database backup and restore.
    Manage,
}

impl Capability {
    pub fn all() -> &'static [Capability] {
        &[Capability::View, Capability::Containers, Capability::Manage]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::View => "view",
            Capability::Containers => "containers",
            Capability::Manage => "manage",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity and permission set of whoever is calling.
///
/// Supplied by the caller's front end (HTTP token middleware or the local
/// CLI) and threaded explicitly through every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub capabilities: BTreeSet<Capability>,
}

impl AuthContext {
    pub fn new(user_id: impl Into<String>, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            user_id: user_id.into(),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    /// A local operator holding every capability.
    pub fn operator(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Capability::all().iter().copied())
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(DevctlError::PermissionDenied { capability })
        }
    }
}
