//! Host facts read straight from the kernel. Best-effort: missing files
//! yield `None` rather than errors.

use std::path::Path;

pub fn hostname() -> String {
    ["/proc/sys/kernel/hostname", "/etc/hostname"]
        .iter()
        .filter_map(|p| std::fs::read_to_string(p).ok())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 1, 5 and 15 minute load averages.
pub fn load_average() -> Option<[f64; 3]> {
    read_load_average(Path::new("/proc/loadavg"))
}

fn read_load_average(path: &Path) -> Option<[f64; 3]> {
    let contents = std::fs::read_to_string(path).ok()?;
    parse_load_average(&contents)
}

fn parse_load_average(contents: &str) -> Option<[f64; 3]> {
    let parts: Vec<f64> = contents
        .split_whitespace()
        .take(3)
        .map(str::parse::<f64>)
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [one, five, fifteen] => Some([*one, *five, *fifteen]),
        _ => None,
    }
}
