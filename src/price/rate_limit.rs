//! Token bucket used to space out requests to a throttled price provider.

use std::{
    sync::{Mutex, PoisonError},
    thread,
    time::{Duration, Instant},
};

use tracing::debug;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Blocking token bucket. `acquire` sleeps the calling thread until a token is free.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    /// Tokens per second.
    rate: f64,
    capacity: f64,
}

impl RateLimiter {
    pub fn per_minute(requests_per_minute: u32, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            rate: f64::from(requests_per_minute.max(1)) / 60.0,
            capacity,
        }
    }

    /// Takes a token if one is available, otherwise reports how long to wait.
    fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.capacity);
        bucket.last_refill = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate))
        }
    }

    pub fn acquire(&self) {
        while let Err(wait) = self.try_acquire_at(Instant::now()) {
            debug!(?wait, "rate limited, sleeping");
            thread::sleep(wait);
        }
    }
}
