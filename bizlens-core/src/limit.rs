//! Request rate limiting
//!
//! Fixed-window counter keyed by client identity. The analysis pipeline is
//! cheap; the text-generation call behind it is not, so embedders should
//! check the limiter before invoking [`crate::analyze::Analyzer`].

use crate::config::LimitsConfig;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Result of a rate-limit check.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitDecision {
    Allowed,
    /// Denied; retry after this duration
    Denied { retry_after: Duration },
}

impl LimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, LimitDecision::Allowed)
    }
}

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window rate limiter keyed by identity.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: &LimitsConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests.max(1),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request for `identity` and decide whether it is allowed.
    pub fn check(&self, identity: &str) -> LimitDecision {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();

        // Expired windows are pruned on access; there is no background task.
        windows.retain(|_, w| now.duration_since(w.started) < self.window);

        let window = windows.entry(identity.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if window.count >= self.max_requests {
            let elapsed = now.duration_since(window.started);
            let retry_after = self.window.saturating_sub(elapsed);
            tracing::warn!(identity, "Rate limit exceeded");
            return LimitDecision::Denied { retry_after };
        }

        window.count += 1;
        LimitDecision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32) -> RateLimiter {
        RateLimiter::new(&LimitsConfig {
            window_secs: 60,
            max_requests: max,
        })
    }

    #[test]
    fn test_allows_up_to_max() {
        let limiter = limiter(3);
        assert!(limiter.check("client-a").is_allowed());
        assert!(limiter.check("client-a").is_allowed());
        assert!(limiter.check("client-a").is_allowed());
        assert!(!limiter.check("client-a").is_allowed());
    }

    #[test]
    fn test_identities_are_independent() {
        let limiter = limiter(1);
        assert!(limiter.check("client-a").is_allowed());
        assert!(limiter.check("client-b").is_allowed());
        assert!(!limiter.check("client-a").is_allowed());
    }

    #[test]
    fn test_denied_reports_retry_after_within_window() {
        let limiter = limiter(1);
        limiter.check("client-a");
        match limiter.check("client-a") {
            LimitDecision::Denied { retry_after } => {
                assert!(retry_after <= Duration::from_secs(60));
            }
            LimitDecision::Allowed => panic!("second request should be denied"),
        }
    }
}
