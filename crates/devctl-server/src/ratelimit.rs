use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use devctl_core::config::RateLimitConfig;

struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn try_consume(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-user token buckets. A user's first request finds a full bucket.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    burst: f64,
    per_second: f64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            burst: f64::from(config.burst.max(1)),
            per_second: config.requests_per_second.max(0.0),
        }
    }

    /// Take one token for `user`. `false` means the request must be refused.
    pub fn check(&self, user: &str) -> bool {
        self.check_at(user, Instant::now())
    }

    fn check_at(&self, user: &str, now: Instant) -> bool {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        buckets
            .entry(user.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst, self.per_second))
            .try_consume(now)
    }
}
