//! Courtesy pacing between remote calls
//!
//! The resolver pauses between successive page fetches and between
//! articles so it never hammers the remote API. The policy is injectable
//! so tests run without real delays.

use crate::config::RateLimitConfig;
use async_trait::async_trait;
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Direct (unkeyed) token-bucket limiter
pub type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Pacing capability consulted between successive remote calls
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait until the next remote call is allowed
    async fn pace(&self);
}

/// Token-bucket pacer backed by the governor crate
pub struct CourtesyPacer {
    limiter: DirectLimiter,
}

impl CourtesyPacer {
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rps).allow_burst(burst);

        Self {
            limiter: RateLimiter::direct(quota),
        }
    }
}

#[async_trait]
impl Pacer for CourtesyPacer {
    async fn pace(&self) {
        self.limiter.until_ready().await;
    }
}

/// Pacer that never waits, for tests and trusted endpoints
pub struct NoopPacer;

#[async_trait]
impl Pacer for NoopPacer {
    async fn pace(&self) {}
}

/// Create a pacer from configuration
pub fn create_pacer(config: &RateLimitConfig) -> Arc<dyn Pacer> {
    if config.enabled {
        Arc::new(CourtesyPacer::new(
            config.requests_per_second,
            config.burst,
        ))
    } else {
        Arc::new(NoopPacer)
    }
}
