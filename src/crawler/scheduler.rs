//! Shared request rate limiting
//!
//! Every search request, from every concurrent keyword task, passes through
//! one limiter. This bounds the aggregate request rate no matter how many
//! keywords are crawled at once.

use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;

/// Token-bucket limiter handing out a fixed number of permits per second
///
/// Not `Clone`; share it behind an `Arc` so that all clients draw from the
/// same bucket.
pub struct RateLimiter {
    inner: DefaultDirectRateLimiter,
    per_second: u32,
}

impl RateLimiter {
    /// Creates a limiter allowing `permits` requests per one-second window
    ///
    /// A value of zero is treated as one.
    pub fn per_second(permits: u32) -> Self {
        let permits = NonZeroU32::new(permits).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: governor::RateLimiter::direct(Quota::per_second(permits)),
            per_second: permits.get(),
        }
    }

    /// Waits until a permit is available and consumes it
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }

    /// Consumes a permit if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.inner.check().is_ok()
    }

    /// Configured permits per second
    pub fn permits_per_second(&self) -> u32 {
        self.per_second
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("per_second", &self.per_second)
            .finish()
    }
}
