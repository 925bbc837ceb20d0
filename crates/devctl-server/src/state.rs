use std::path::Path;
use std::sync::Arc;

use devctl_core::config::Config;
use devctl_core::exec::CommandExecutor;
use devctl_core::gateway::Gateway;

use crate::ratelimit::RateLimiter;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// State backed by real `docker`/`mysql` processes.
    pub fn new(config: Config, root: &Path) -> Self {
        let limiter = RateLimiter::new(&config.rate_limit);
        Self {
            gateway: Arc::new(Gateway::system(config, root)),
            limiter: Arc::new(limiter),
        }
    }

    /// State with a caller-supplied executor.
    pub fn with_executor(config: Config, root: &Path, executor: Arc<dyn CommandExecutor>) -> Self {
        let limiter = RateLimiter::new(&config.rate_limit);
        Self {
            gateway: Arc::new(Gateway::new(config, root, executor)),
            limiter: Arc::new(limiter),
        }
    }
}
