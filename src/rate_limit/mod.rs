// Rate limiting for event ingestion (ADR-006 Session 3)
//
// Per-namespace token bucket. Active only when auth_enabled=true.
// Limit is read from SharedRuntimeConfig on each check, so admin API changes
// take effect immediately for new refill calculations.

use dashmap::DashMap;
use std::time::Instant;

/// Token bucket for a single namespace.
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u64) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: Instant::now(),
        }
    }

    /// Try to consume one token. Refills based on elapsed time at rate = capacity/60 tokens/sec.
    fn try_consume(&mut self, capacity: u64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        let refill_rate = capacity as f64 / 60.0;
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-namespace token bucket rate limiter.
///
/// Buckets are created lazily on first event. State is in-memory only (resets on restart).
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Check and consume one token for `namespace` at `limit_per_minute`.
    ///
    /// Returns true if the request is allowed, false if rate limit exceeded.
    pub fn check_and_consume(&self, namespace: &str, limit_per_minute: u64) -> bool {
        let mut bucket = self
            .buckets
            .entry(namespace.to_string())
            .or_insert_with(|| TokenBucket::new(limit_per_minute));
        bucket.try_consume(limit_per_minute)
    }
}
