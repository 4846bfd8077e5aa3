//! Endpoint pool with per-endpoint health tracking and cooldowns.
//!
//! Selection is round-robin starting after the last endpoint tried,
//! skipping anything still cooling down. When every endpoint is cooling
//! down the pool returns the one whose cooldown expires soonest, so
//! callers always make forward progress instead of stalling.

use nonempty::NonEmpty;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Health state of a single endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointHealth {
    /// Endpoint is usable
    Healthy,
    /// Endpoint pushed back with a rate limit and is backing off
    RateLimited,
    /// Endpoint failed at the network or protocol level
    Failed,
}

/// Failure class reported for an attempt; drives the cooldown choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Push-back from the endpoint: escalating cooldown
    RateLimited,
    /// Network, protocol or response-shape failure: short fixed cooldown
    Other,
}

/// Cooldown policy applied when reporting failures.
#[derive(Debug, Clone)]
pub struct CooldownPolicy {
    /// Base cooldown for rate limits, doubled per consecutive failure
    pub rate_limit_backoff: Duration,
    /// Cap for the rate-limit cooldown
    pub rate_limit_backoff_cap: Duration,
    /// Fixed cooldown for network and protocol failures
    pub network_cooldown: Duration,
}

/// An endpoint handed out by [`EndpointPool::select`].
#[derive(Debug, Clone)]
pub struct SelectedEndpoint {
    pub index: usize,
    pub url: String,
}

/// Point-in-time health view of one endpoint, for diagnostics.
#[derive(Debug, Clone)]
pub struct EndpointStatus {
    pub url: String,
    pub health: EndpointHealth,
    pub consecutive_failures: u32,
    pub cooldown_remaining: Option<Duration>,
}

#[derive(Debug)]
struct EndpointSlot {
    url: String,
    health: EndpointHealth,
    consecutive_failures: u32,
    next_eligible: Option<Instant>,
}

struct PoolInner {
    slots: Vec<EndpointSlot>,
    cursor: usize,
}

/// Ordered set of candidate endpoints for one cluster.
///
/// Owned state: health transitions happen here and only here, in response
/// to outcomes reported by the query layer.
pub struct EndpointPool {
    inner: Mutex<PoolInner>,
    policy: CooldownPolicy,
}

impl EndpointPool {
    /// Create a pool over a non-empty endpoint list.
    pub fn new(urls: NonEmpty<String>, policy: CooldownPolicy) -> Self {
        let slots: Vec<EndpointSlot> = urls
            .into_iter()
            .map(|url| EndpointSlot {
                url,
                health: EndpointHealth::Healthy,
                consecutive_failures: 0,
                next_eligible: None,
            })
            .collect();

        // Cursor starts on the last slot so the first selection is slot 0.
        let cursor = slots.len() - 1;
        Self { inner: Mutex::new(PoolInner { slots, cursor }), policy }
    }

    /// Select the next endpoint to try.
    ///
    /// Never returns nothing for a non-empty pool: if every endpoint is
    /// cooling down, the one expiring soonest is returned and the caller
    /// simply observes its next failure immediately.
    pub async fn select(&self) -> SelectedEndpoint {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let len = inner.slots.len();

        for offset in 1..=len {
            let index = (inner.cursor + offset) % len;
            let eligible = match inner.slots[index].next_eligible {
                None => true,
                Some(at) => at <= now,
            };
            if eligible {
                inner.cursor = index;
                return SelectedEndpoint { index, url: inner.slots[index].url.clone() };
            }
        }

        // All cooling down: pick the soonest-expiring cooldown.
        let index = inner
            .slots
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.next_eligible.unwrap_or(now))
            .map(|(i, _)| i)
            .unwrap_or(0);

        debug!(url = %inner.slots[index].url, "all endpoints cooling down, using soonest-expiring");
        inner.cursor = index;
        SelectedEndpoint { index, url: inner.slots[index].url.clone() }
    }

    /// Report a successful call: health resets, cooldown clears.
    pub async fn report_success(&self, index: usize) {
        let mut inner = self.inner.lock().await;
        if let Some(slot) = inner.slots.get_mut(index) {
            slot.health = EndpointHealth::Healthy;
            slot.consecutive_failures = 0;
            slot.next_eligible = None;
        }
    }

    /// Report a failed call and start the appropriate cooldown.
    pub async fn report_failure(&self, index: usize, kind: FailureKind) {
        let mut inner = self.inner.lock().await;
        let Some(slot) = inner.slots.get_mut(index) else { return };

        slot.consecutive_failures += 1;
        let cooldown = match kind {
            FailureKind::RateLimited => {
                slot.health = EndpointHealth::RateLimited;
                let exponent = (slot.consecutive_failures - 1).min(10);
                let scaled = self.policy.rate_limit_backoff.saturating_mul(1u32 << exponent);
                scaled.min(self.policy.rate_limit_backoff_cap)
            }
            FailureKind::Other => {
                slot.health = EndpointHealth::Failed;
                self.policy.network_cooldown
            }
        };
        slot.next_eligible = Some(Instant::now() + cooldown);

        warn!(
            url = %slot.url,
            failures = slot.consecutive_failures,
            cooldown_secs = cooldown.as_secs_f64(),
            ?kind,
            "endpoint cooling down"
        );
    }

    /// Health snapshot for all endpoints.
    pub async fn status(&self) -> Vec<EndpointStatus> {
        let inner = self.inner.lock().await;
        let now = Instant::now();
        inner
            .slots
            .iter()
            .map(|slot| EndpointStatus {
                url: slot.url.clone(),
                health: slot.health,
                consecutive_failures: slot.consecutive_failures,
                cooldown_remaining: slot
                    .next_eligible
                    .and_then(|at| at.checked_duration_since(now)),
            })
            .collect()
    }
}
