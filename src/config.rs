//! Tracker configuration with sensible defaults and a builder.

use crate::types::Cluster;
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors. All of these are fatal and reported once at
/// startup; the polling loop never raises them.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("no RPC endpoints configured for cluster {0}")]
    NoEndpoints(String),
    #[error("validator identity must not be empty")]
    MissingIdentity,
    #[error("validator identity {0} not found in the active vote account set")]
    UnknownIdentity(String),
    #[error("startup initialization failed: {0}")]
    Startup(String),
    #[error("failed to build http transport: {0}")]
    Transport(String),
}

/// RPC transport and failover settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Attempts across distinct endpoints before a query is unavailable
    pub max_attempts: usize,
    /// Outbound request pacing
    pub requests_per_second: u32,
    /// Base cooldown after a rate-limit response (doubles per consecutive failure)
    pub rate_limit_backoff: Duration,
    /// Upper bound for the rate-limit cooldown
    pub rate_limit_backoff_cap: Duration,
    /// Fixed cooldown after a network or protocol error
    pub network_cooldown: Duration,
    /// Maximum entries held by the response cache
    pub max_cache_entries: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            requests_per_second: 20,
            rate_limit_backoff: Duration::from_secs(5),
            rate_limit_backoff_cap: Duration::from_secs(60),
            network_cooldown: Duration::from_secs(2),
            max_cache_entries: 1000,
        }
    }
}

/// Per-method cache TTLs, chosen by call frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTtls {
    /// Vote accounts refresh within a fraction of the poll interval
    pub vote_accounts: Duration,
    /// Epoch info is stable for most of a slot
    pub epoch_info: Duration,
    /// Current slot moves fastest
    pub slot: Duration,
    /// The schedule is fixed for the epoch; epoch change forces a refetch
    pub leader_schedule: Duration,
    /// Block production advances slowly enough for a few seconds of reuse
    pub block_production: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            vote_accounts: Duration::from_millis(400),
            epoch_info: Duration::from_millis(400),
            slot: Duration::from_millis(200),
            leader_schedule: Duration::from_secs(3600),
            block_production: Duration::from_secs(5),
        }
    }
}

/// Complete configuration for one tracker instance.
///
/// Endpoint and cache state is scoped to the instance built from this, so
/// mainnet and testnet trackers can run side by side without shared state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Cluster being tracked
    pub cluster: Cluster,
    /// Candidate RPC endpoints, tried in round-robin order
    pub endpoints: NonEmpty<String>,
    /// Target validator identity pubkey
    pub identity: String,
    /// Interval between ticks
    pub poll_interval: Duration,
    /// Assumed average slot duration for time estimates
    pub slot_duration: Duration,
    /// Transport and failover settings
    pub rpc: RpcConfig,
    /// Per-method cache TTLs
    pub ttl: CacheTtls,
}

impl TrackerConfig {
    /// Create a configuration for a cluster with its default endpoints.
    pub fn for_cluster(cluster: Cluster, identity: impl Into<String>) -> Self {
        Self {
            cluster,
            endpoints: cluster.default_endpoints(),
            identity: identity.into(),
            poll_interval: Duration::from_secs(1),
            slot_duration: Duration::from_millis(400),
            rpc: RpcConfig::default(),
            ttl: CacheTtls::default(),
        }
    }

    /// Validate fields the type system cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.trim().is_empty() {
            return Err(ConfigError::MissingIdentity);
        }
        Ok(())
    }
}

/// Builder for convenient construction with sensible defaults.
pub struct TrackerConfigBuilder {
    cluster: Cluster,
    endpoints: Vec<String>,
    identity: Option<String>,
    poll_interval: Duration,
    slot_duration: Duration,
    rpc: RpcConfig,
    ttl: CacheTtls,
}

impl TrackerConfigBuilder {
    /// Create a new builder for the given cluster.
    pub fn new(cluster: Cluster) -> Self {
        Self {
            cluster,
            endpoints: Vec::new(),
            identity: None,
            poll_interval: Duration::from_secs(1),
            slot_duration: Duration::from_millis(400),
            rpc: RpcConfig::default(),
            ttl: CacheTtls::default(),
        }
    }

    /// Set the candidate endpoint URLs.
    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the target validator identity.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Set the tick interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the assumed average slot duration.
    pub fn with_slot_duration(mut self, duration: Duration) -> Self {
        self.slot_duration = duration;
        self
    }

    /// Override the RPC settings.
    pub fn with_rpc(mut self, rpc: RpcConfig) -> Self {
        self.rpc = rpc;
        self
    }

    /// Override the cache TTLs.
    pub fn with_ttls(mut self, ttl: CacheTtls) -> Self {
        self.ttl = ttl;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<TrackerConfig, ConfigError> {
        let endpoints = if self.endpoints.is_empty() {
            self.cluster.default_endpoints()
        } else {
            NonEmpty::from_vec(self.endpoints)
                .ok_or_else(|| ConfigError::NoEndpoints(self.cluster.to_string()))?
        };

        let config = TrackerConfig {
            cluster: self.cluster,
            endpoints,
            identity: self.identity.ok_or(ConfigError::MissingIdentity)?,
            poll_interval: self.poll_interval,
            slot_duration: self.slot_duration,
            rpc: self.rpc,
            ttl: self.ttl,
        };
        config.validate()?;
        Ok(config)
    }
}
