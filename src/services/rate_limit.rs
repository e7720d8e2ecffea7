// src/services/rate_limit.rs
// DOCUMENTATION: Per-sender throttling for the SMS webhook
// PURPOSE: Stop a single phone from flooding villages with texts

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Keyed token bucket, one bucket per sender phone
pub struct SmsRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
}

impl SmsRateLimiter {
    /// Allow `per_minute` texts per phone per minute (at least one)
    pub fn new(per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
        }
    }

    /// Whether a text from `phone` may be processed now
    pub fn check(&self, phone: &str) -> bool {
        let allowed = self.limiter.check_key(&phone.to_string()).is_ok();
        if !allowed {
            log::warn!("Rate limit exceeded for SMS sender {}", phone);
        }
        allowed
    }

    /// Forget senders whose buckets have refilled
    pub fn cleanup(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        let after = self.limiter.len();

        if before > after {
            log::info!(
                "SMS rate limiter cleanup: removed {} senders ({} remaining)",
                before - after,
                after
            );
        }
    }
}

/// Start background cleanup task
pub fn start_cleanup_task(limiter: Arc<SmsRateLimiter>, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));

        loop {
            interval.tick().await;
            limiter.cleanup();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_each_phone_separately() {
        let limiter = SmsRateLimiter::new(2);

        assert!(limiter.check("+13216430987"));
        assert!(limiter.check("+13216430987"));
        assert!(!limiter.check("+13216430987"));

        assert!(limiter.check("+13216430988"));
    }

    #[test]
    fn test_zero_rate_still_allows_one() {
        let limiter = SmsRateLimiter::new(0);
        assert!(limiter.check("+13216430987"));
        assert!(!limiter.check("+13216430987"));
    }

    #[test]
    fn test_cleanup_keeps_limited_senders() {
        let limiter = SmsRateLimiter::new(1);
        assert!(limiter.check("+13216430987"));
        limiter.cleanup();
        assert!(!limiter.check("+13216430987"));
    }
}
