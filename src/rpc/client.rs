//! Unified query API over cache, endpoint pool and transport.
//!
//! One call-site per logical query; retry, failover, pacing and caching
//! are invisible to callers. Nothing outside this module talks to the
//! transport or the pool directly.

use crate::config::{CacheTtls, ConfigError, TrackerConfig};
use crate::rpc::cache::{QueryCache, QueryKey};
use crate::rpc::endpoints::{CooldownPolicy, EndpointPool, EndpointStatus, FailureKind};
use crate::rpc::error::QueryError;
use crate::rpc::methods::{
    self, BlockProduction, EpochInfo, GetVoteAccountsResult, LeaderSchedule, Method,
};
use crate::rpc::transport::{HttpTransport, RpcTransport};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Composed query client for one cluster.
pub struct QueryClient {
    transport: Arc<dyn RpcTransport>,
    pool: EndpointPool,
    cache: QueryCache,
    limiter: DefaultDirectRateLimiter,
    ttl: CacheTtls,
    max_attempts: usize,
}

impl QueryClient {
    /// Build a client with the real HTTPS transport.
    pub fn new(config: &TrackerConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(config.rpc.timeout)
            .map_err(|e| ConfigError::Transport(e.to_string()))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a client over an arbitrary transport (tests script this).
    pub fn with_transport(config: &TrackerConfig, transport: Arc<dyn RpcTransport>) -> Self {
        let policy = CooldownPolicy {
            rate_limit_backoff: config.rpc.rate_limit_backoff,
            rate_limit_backoff_cap: config.rpc.rate_limit_backoff_cap,
            network_cooldown: config.rpc.network_cooldown,
        };
        let quota = Quota::per_second(
            NonZeroU32::new(config.rpc.requests_per_second)
                .unwrap_or(NonZeroU32::new(10).unwrap()),
        );

        Self {
            transport,
            pool: EndpointPool::new(config.endpoints.clone(), policy),
            cache: QueryCache::new(config.rpc.max_cache_entries),
            limiter: RateLimiter::direct(quota),
            ttl: config.ttl.clone(),
            max_attempts: config.rpc.max_attempts.max(1),
        }
    }

    /// All current (non-delinquent) vote accounts.
    pub async fn vote_accounts(&self) -> Result<GetVoteAccountsResult, QueryError> {
        let raw = self
            .call(Method::GetVoteAccounts, methods::vote_accounts_params(), self.ttl.vote_accounts)
            .await?;
        methods::parse_vote_accounts(&raw)
    }

    /// Current epoch number, slot index and epoch length.
    pub async fn epoch_info(&self) -> Result<EpochInfo, QueryError> {
        let raw = self
            .call(Method::GetEpochInfo, methods::epoch_info_params(), self.ttl.epoch_info)
            .await?;
        methods::parse_epoch_info(&raw)
    }

    /// Current absolute slot.
    pub async fn slot(&self) -> Result<u64, QueryError> {
        let raw = self.call(Method::GetSlot, methods::slot_params(), self.ttl.slot).await?;
        methods::parse_slot(&raw)
    }

    /// Leader schedule for the current epoch, optionally filtered to one identity.
    pub async fn leader_schedule(&self, identity: Option<&str>) -> Result<LeaderSchedule, QueryError> {
        let raw = self
            .call(
                Method::GetLeaderSchedule,
                methods::leader_schedule_params(identity),
                self.ttl.leader_schedule,
            )
            .await?;
        methods::parse_leader_schedule(&raw)
    }

    /// Block production counts for the current epoch.
    pub async fn block_production(&self, identity: Option<&str>) -> Result<BlockProduction, QueryError> {
        let raw = self
            .call(
                Method::GetBlockProduction,
                methods::block_production_params(identity),
                self.ttl.block_production,
            )
            .await?;
        methods::parse_block_production(&raw)
    }

    /// Endpoint health, for diagnostics.
    pub async fn endpoint_status(&self) -> Vec<EndpointStatus> {
        self.pool.status().await
    }

    async fn call(
        &self,
        method: Method,
        params: Value,
        ttl: Duration,
    ) -> Result<Arc<Value>, QueryError> {
        let key = QueryKey::new(method, &params);
        self.cache.get_or_fetch(key, ttl, self.fetch(method, params)).await
    }

    /// One uncached query: rotate endpoints until one answers with a
    /// well-shaped payload or the attempt cap is reached.
    ///
    /// A payload that decodes as a JSON-RPC success but fails the shape
    /// check counts as an endpoint failure too: it is never cached, and a
    /// different endpoint gets the next attempt.
    #[instrument(skip(self, params), fields(method = method.rpc_name()))]
    async fn fetch(&self, method: Method, params: Value) -> Result<Value, QueryError> {
        let mut last_error: Option<String> = None;

        for attempt in 1..=self.max_attempts {
            let selected = self.pool.select().await;
            self.limiter.until_ready().await;

            debug!(attempt, url = %selected.url, "issuing rpc request");
            match self.transport.send(&selected.url, method.rpc_name(), &params).await {
                Ok(value) => match methods::validate(method, &value) {
                    Ok(()) => {
                        self.pool.report_success(selected.index).await;
                        return Ok(value);
                    }
                    Err(error) => {
                        warn!(attempt, url = %selected.url, %error, "rejected response");
                        self.pool.report_failure(selected.index, FailureKind::Other).await;
                        last_error = Some(error.to_string());
                    }
                },
                Err(error) => {
                    warn!(attempt, url = %selected.url, %error, "rpc attempt failed");
                    let kind = if error.is_rate_limit() {
                        FailureKind::RateLimited
                    } else {
                        FailureKind::Other
                    };
                    self.pool.report_failure(selected.index, kind).await;
                    last_error = Some(error.to_string());
                }
            }
        }

        Err(QueryError::Unavailable {
            attempts: self.max_attempts,
            last: last_error.unwrap_or_else(|| "no attempt made".into()),
        })
    }
}
