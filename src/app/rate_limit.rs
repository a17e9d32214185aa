//! Endpoint-wide rate limiting using the token bucket algorithm.
//!
//! - The bucket starts full with `capacity` tokens
//! - Tokens refill continuously at `capacity / interval`
//! - Each accepted request consumes one token

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    /// Tokens added per second
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared bucket bounding accepted requests per interval.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    /// Allow `capacity` requests per `interval`. A zero interval refills instantly.
    pub fn new(capacity: u64, interval: Duration) -> Self {
        Self::starting_at(capacity, interval, Instant::now())
    }

    fn starting_at(capacity: u64, interval: Duration, now: Instant) -> Self {
        let capacity = capacity as f64;
        let refill_rate = if interval.is_zero() {
            f64::INFINITY
        } else {
            capacity / interval.as_secs_f64()
        };

        Self {
            bucket: Mutex::new(TokenBucket {
                tokens: capacity,
                capacity,
                refill_rate,
                last_refill: now,
            }),
        }
    }

    /// Take one token. Returns false when the bucket is empty.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        let acquired = self
            .bucket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_consume(now);
        if !acquired {
            tracing::debug!("rate limit exceeded");
        }
        acquired
    }
}
