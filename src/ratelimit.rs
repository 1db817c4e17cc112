//! Inbound-call admission for the rate-limiting collaborator.
//!
//! The codec's consumer extracts the `(caller, service)` pair from each
//! inbound CallRequest (structured decode, or the lazy `service` and
//! `caller_name` accessors on the fast path) and reports it here. The
//! limiter holds one token bucket per observed pair and answers with an
//! [`Admission`] decision; the bucket policy itself is plain token-bucket
//! throughput and intentionally knows nothing about frames.
//!
//! Pair tracking is bounded: once `max_tracked_pairs` distinct pairs are
//! held, the oldest tracked pair is dropped to make room. A dropped pair
//! that shows up again simply starts a fresh bucket.

use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use leaky_bucket::RateLimiter;
use log::{debug, warn};

/// Throughput policy for [`CallRateLimiter`].
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Calls each `(caller, service)` pair may make per interval.
    pub max_calls_per_interval: usize,
    /// Token refill interval.
    pub interval: Duration,
    /// Upper bound on distinct pairs tracked at once.
    pub max_tracked_pairs: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls_per_interval: 1000,
            interval: Duration::from_secs(1),
            max_tracked_pairs: 1024,
        }
    }
}

/// Decision for one observed inbound call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Admission {
    /// The call is within the pair's budget.
    Admit,
    /// The pair exhausted its budget for the current interval.
    Throttle,
}

impl Admission {
    /// Whether the call was admitted.
    #[must_use]
    pub const fn is_admitted(self) -> bool { matches!(self, Self::Admit) }
}

/// Per-pair token-bucket admission over `(caller, service)` identifiers.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use callwire::ratelimit::{Admission, CallRateLimiter, RateLimitConfig};
///
/// let mut limiter = CallRateLimiter::new(RateLimitConfig {
///     max_calls_per_interval: 1,
///     interval: Duration::from_secs(3600),
///     max_tracked_pairs: 16,
/// });
///
/// assert_eq!(limiter.observe("gateway", "orders"), Admission::Admit);
/// assert_eq!(limiter.observe("gateway", "orders"), Admission::Throttle);
/// // Budgets are per pair.
/// assert_eq!(limiter.observe("gateway", "billing"), Admission::Admit);
/// ```
pub struct CallRateLimiter {
    config: RateLimitConfig,
    buckets: HashMap<Box<str>, HashMap<Box<str>, RateLimiter>>,
    order: VecDeque<(Box<str>, Box<str>)>,
}

impl CallRateLimiter {
    /// Create a limiter with the given policy.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Observe one inbound call from `caller` to `service`.
    ///
    /// The hot path allocates nothing for pairs already tracked; a new pair
    /// costs its bucket plus two key copies, evicting the oldest tracked
    /// pair when the bound is reached.
    pub fn observe(&mut self, caller: &str, service: &str) -> Admission {
        if let Some(bucket) = self.buckets.get(caller).and_then(|m| m.get(service)) {
            return Self::acquire(bucket, caller, service);
        }

        self.evict_to_fit();
        let bucket = self.new_bucket();
        let admission = Self::acquire(&bucket, caller, service);
        self.buckets
            .entry(Box::from(caller))
            .or_default()
            .insert(Box::from(service), bucket);
        self.order.push_back((Box::from(caller), Box::from(service)));
        admission
    }

    /// Distinct pairs currently tracked.
    #[must_use]
    pub fn tracked_pairs(&self) -> usize { self.order.len() }

    fn acquire(bucket: &RateLimiter, caller: &str, service: &str) -> Admission {
        if bucket.try_acquire(1) {
            Admission::Admit
        } else {
            warn!("throttling {caller} -> {service}: budget exhausted");
            Admission::Throttle
        }
    }

    fn evict_to_fit(&mut self) {
        while self.order.len() >= self.config.max_tracked_pairs {
            let Some((caller, service)) = self.order.pop_front() else {
                break;
            };
            if let Some(per_service) = self.buckets.get_mut(&*caller) {
                per_service.remove(&*service);
                if per_service.is_empty() {
                    self.buckets.remove(&*caller);
                }
            }
            debug!("dropped rate-limit bucket for {caller} -> {service}");
        }
    }

    fn new_bucket(&self) -> RateLimiter {
        RateLimiter::builder()
            .max(self.config.max_calls_per_interval)
            .initial(self.config.max_calls_per_interval)
            .refill(self.config.max_calls_per_interval)
            .interval(self.config.interval)
            .build()
    }
}

#[cfg(test)]
#[path = "ratelimit_tests.rs"]
mod tests;
