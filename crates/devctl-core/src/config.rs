use crate::auth::Capability;
use crate::error::{DevctlError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DockerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    #[serde(default = "default_docker_path")]
    pub path: String,
    /// Per-invocation timeout. `0` disables the timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_docker_path() -> String {
    "docker".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            path: default_docker_path(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl DockerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_user")]
    pub user: String,
    /// Plaintext password. Prefer `password_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Name of an environment variable holding the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
    #[serde(default = "default_db_name")]
    pub name: String,
    #[serde(default = "default_dump_path")]
    pub dump_path: String,
    #[serde(default = "default_client_path")]
    pub client_path: String,
    /// Backup/restore timeout. Dumps outlive container actions, so this is
    /// separate from `docker.timeout_seconds`. `0` disables the timeout.
    #[serde(default = "default_db_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_user() -> String {
    "moodle".to_string()
}

fn default_db_name() -> String {
    "moodle".to_string()
}

fn default_dump_path() -> String {
    "mysqldump".to_string()
}

fn default_client_path() -> String {
    "mysql".to_string()
}

fn default_db_timeout_seconds() -> u64 {
    600
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: None,
            password_env: Some("DEVCTL_DB_PASSWORD".to_string()),
            name: default_db_name(),
            dump_path: default_dump_path(),
            client_path: default_client_path(),
            timeout_seconds: default_db_timeout_seconds(),
        }
    }
}

impl DatabaseConfig {
    /// `password_env` wins over the inline `password` when the variable is set.
    pub fn resolved_password(&self) -> Option<String> {
        self.password_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .or_else(|| self.password.clone())
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

// ---------------------------------------------------------------------------
// BackupConfig / LogsConfig / RateLimitConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackupConfig {
    /// Backup directory. Relative paths resolve against the project root.
    /// Defaults to `.devctl/backups`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_lines")]
    pub default_lines: u32,
    #[serde(default = "default_max_lines")]
    pub max_lines: u32,
}

fn default_lines() -> u32 {
    100
}

fn default_max_lines() -> u32 {
    10_000
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            default_lines: default_lines(),
            max_lines: default_max_lines(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rps")]
    pub requests_per_second: f64,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_rps() -> f64 {
    5.0
}

fn default_burst() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            burst: default_burst(),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub user: String,
    pub token: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<TokenConfig>,
}

fn default_version() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            enabled: default_enabled(),
            docker: DockerConfig::default(),
            database: DatabaseConfig::default(),
            backup: BackupConfig::default(),
            logs: LogsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            tokens: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(DevctlError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Absolute backup directory for this project.
    pub fn backup_dir(&self, root: &Path) -> PathBuf {
        match &self.backup.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => paths::default_backup_dir(root),
        }
    }

    /// Find the token entry matching `token`, if any.
    pub fn token(&self, token: &str) -> Option<&TokenConfig> {
        self.tokens.iter().find(|t| t.token == token)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.docker.path.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "docker.path is empty".to_string(),
            });
        }

        if self.docker.timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "docker.timeout_seconds is 0: commands may block forever".to_string(),
            });
        }

        if self.database.password.is_some() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "database.password is stored in plaintext; prefer database.password_env"
                    .to_string(),
            });
        }

        if self.logs.default_lines > self.logs.max_lines {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "logs.default_lines ({}) exceeds logs.max_lines ({})",
                    self.logs.default_lines, self.logs.max_lines
                ),
            });
        }

        if self.rate_limit.requests_per_second <= 0.0 || self.rate_limit.burst == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "rate_limit must allow at least one request".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for t in &self.tokens {
            if t.token.len() < 16 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("token for user '{}' is shorter than 16 characters", t.user),
                });
            }
            if !seen.insert(t.token.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("token for user '{}' is not unique", t.user),
                });
            }
            if t.capabilities.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("token for user '{}' grants no capabilities", t.user),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
