use serde::{Deserialize, Serialize};
use tracing::warn;

/// One row of `docker ps -a --format json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename(deserialize = "ID"))]
    pub id: String,
    #[serde(rename(deserialize = "Names"))]
    pub name: String,
    #[serde(rename(deserialize = "Image"), default)]
    pub image: String,
    #[serde(rename(deserialize = "Status"), default)]
    pub status: String,
    #[serde(rename(deserialize = "Ports"), default)]
    pub ports: String,
    /// Machine-readable state (`running`, `exited`, ...). Older engines omit it.
    #[serde(rename(deserialize = "State"), default)]
    pub state: String,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state == "running" || (self.state.is_empty() && self.status.starts_with("Up"))
    }
}

/// Parse line-delimited JSON, one container per line.
///
/// Lines that are blank or fail to parse are skipped, so one malformed row
/// never hides the rest of the listing. Order is preserved.
pub fn parse_container_lines(output: &str) -> Vec<ContainerSummary> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<ContainerSummary>(line) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(error = %e, "skipping unparseable container line");
                None
            }
        })
        .collect()
}
