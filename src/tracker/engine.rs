//! The tracking engine: a polling loop that ranks the active vote set and
//! tracks the target validator's credit performance against its peers.
//!
//! The loop never dies on transient failure. Unavailable upstreams degrade
//! the engine, which re-emits its last snapshot marked stale and keeps
//! ticking; only unresolvable configuration is fatal, and only at startup.

use crate::calc::{epoch_progress, leader_metrics, leader_slots, LeaderSlots};
use crate::config::{ConfigError, TrackerConfig};
use crate::rpc::error::QueryError;
use crate::rpc::QueryClient;
use crate::tracker::ranking::{rank_validators, VoteAccountInfo};
use crate::tracker::snapshot::{NetworkStats, TargetStanding, TickDeltas, TrackerSnapshot};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;
use tracing::{debug, info, instrument, warn};

/// Engine states. Degraded means the last tick could not produce fresh
/// data; the loop keeps running either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Polling,
    Degraded,
}

/// Why a single tick produced no fresh snapshot.
#[derive(Debug, Clone, Error)]
pub enum TickError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("validator {identity} missing from the current vote set")]
    TargetMissing { identity: String },
}

/// Vote-credit tracker for one validator on one cluster.
pub struct TvcTracker {
    client: Arc<QueryClient>,
    config: TrackerConfig,
    snapshot_tx: mpsc::Sender<TrackerSnapshot>,
    shutdown: watch::Receiver<bool>,
    state: TrackerState,
    last_fresh: Option<TrackerSnapshot>,
    leader_slots: Option<LeaderSlots>,
}

impl TvcTracker {
    /// Create a tracker with the real HTTPS transport.
    pub fn new(
        config: TrackerConfig,
        snapshot_tx: mpsc::Sender<TrackerSnapshot>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = Arc::new(QueryClient::new(&config)?);
        Ok(Self::assemble(config, client, snapshot_tx, shutdown))
    }

    /// Create a tracker over an existing query client (tests script this).
    pub fn with_client(
        config: TrackerConfig,
        client: Arc<QueryClient>,
        snapshot_tx: mpsc::Sender<TrackerSnapshot>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(config, client, snapshot_tx, shutdown))
    }

    fn assemble(
        config: TrackerConfig,
        client: Arc<QueryClient>,
        snapshot_tx: mpsc::Sender<TrackerSnapshot>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client,
            config,
            snapshot_tx,
            shutdown,
            state: TrackerState::Idle,
            last_fresh: None,
            leader_slots: None,
        }
    }

    /// Current engine state.
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Validate the configured identity against the live vote set, with
    /// bounded retries. Failures here are fatal and reported once.
    pub async fn initialize(&mut self) -> Result<(), ConfigError> {
        let strategy = ExponentialBackoff::from_millis(500)
            .max_delay(Duration::from_secs(2))
            .take(3);

        let client = self.client.clone();
        let vote_accounts = Retry::spawn(strategy, || client.vote_accounts())
            .await
            .map_err(|e| ConfigError::Startup(e.to_string()))?;

        let identity = &self.config.identity;
        let resolvable = vote_accounts
            .current
            .iter()
            .any(|v| v.node_pubkey == *identity || v.vote_pubkey == *identity);
        if !resolvable {
            return Err(ConfigError::UnknownIdentity(identity.clone()));
        }

        info!(
            cluster = %self.config.cluster,
            validators = vote_accounts.current.len(),
            "resolved target identity against live vote set"
        );
        Ok(())
    }

    /// Run the polling loop until stopped.
    ///
    /// Ticks never overlap: a tick that outlasts the interval defers the
    /// next one. Stop requests are honored between ticks so a tick in
    /// flight finishes and endpoint health stays consistent.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.initialize().await?;
        info!(identity = %self.config.identity, "tracker started");

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    info!("stop requested, shutting down");
                    break;
                }
                _ = interval.tick() => {}
            }

            match self.tick().await {
                Ok(snapshot) => {
                    if self.state != TrackerState::Polling {
                        info!("tracker polling");
                    }
                    self.state = TrackerState::Polling;
                    if self.snapshot_tx.send(snapshot).await.is_err() {
                        info!("snapshot receiver dropped, shutting down");
                        break;
                    }
                }
                Err(error) => {
                    warn!(%error, "tick failed, running degraded");
                    self.state = TrackerState::Degraded;
                    if let Some(last) = self.last_fresh.clone() {
                        if self.snapshot_tx.send(last.into_stale()).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Compute one snapshot: rank the vote set, locate the target, derive
    /// epoch and leader metrics. Pure of scheduling concerns so tests can
    /// drive it without a clock.
    #[instrument(skip(self), fields(identity = %self.config.identity))]
    pub async fn tick(&mut self) -> Result<TrackerSnapshot, TickError> {
        // Disjoint cache keys, so issue both queries concurrently.
        let (vote_accounts, epoch_info) =
            tokio::try_join!(self.client.vote_accounts(), self.client.epoch_info())?;

        let accounts: Vec<VoteAccountInfo> = vote_accounts
            .current
            .iter()
            .filter_map(|account| VoteAccountInfo::from_wire(account, epoch_info.epoch))
            .collect();
        let validators = rank_validators(accounts);

        let target = validators
            .iter()
            .find(|v| {
                v.info.identity == self.config.identity
                    || v.info.vote_pubkey == self.config.identity
            })
            .cloned()
            .ok_or_else(|| TickError::TargetMissing { identity: self.config.identity.clone() })?;

        let rank1_credits = validators.first().map(|v| v.info.credits).unwrap_or(0);
        let missed_credits = rank1_credits.saturating_sub(target.info.credits);

        self.refresh_leader_slots(&target.info.identity, epoch_info.epoch).await;
        let leader = match &self.leader_slots {
            Some(slots) => {
                let production =
                    match self.client.block_production(Some(&target.info.identity)).await {
                        Ok(production) => production.by_identity.get(&target.info.identity).copied(),
                        Err(error) => {
                            debug!(%error, "block production unavailable");
                            None
                        }
                    };
                Some(leader_metrics(
                    slots,
                    epoch_info.slot_index,
                    production,
                    self.config.slot_duration,
                ))
            }
            None => None,
        };

        let deltas = self.last_fresh.as_ref().map(|prev| TickDeltas {
            credits: target.info.credits as i64 - prev.target.credits as i64,
            missed_credits: missed_credits as i64 - prev.missed_credits as i64,
            last_vote_slots: target.info.last_vote as i64 - prev.target.last_vote as i64,
            root_slots: target.info.root_slot as i64 - prev.target.root_slot as i64,
        });

        let network = NetworkStats::from_ranked(&validators, target.info.credits);

        let snapshot = TrackerSnapshot {
            taken_at: Utc::now(),
            fresh: true,
            epoch: epoch_info.epoch,
            target: TargetStanding {
                rank: target.rank,
                identity: target.info.identity.clone(),
                vote_pubkey: target.info.vote_pubkey.clone(),
                activated_stake: target.info.activated_stake,
                credits: target.info.credits,
                last_vote: target.info.last_vote,
                root_slot: target.info.root_slot,
            },
            rank1_credits,
            missed_credits,
            deltas,
            epoch_progress: epoch_progress(&epoch_info, self.config.slot_duration),
            leader,
            network,
            validators,
        };

        self.last_fresh = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Produce a single fresh snapshot for one-shot callers.
    pub async fn snapshot_once(&mut self) -> anyhow::Result<TrackerSnapshot> {
        self.initialize().await?;
        let snapshot = self.tick().await?;
        Ok(snapshot)
    }

    /// The schedule is fixed per epoch; refetch only when the epoch moves.
    /// Schedule failures keep the previous epoch's slots rather than
    /// failing the tick.
    async fn refresh_leader_slots(&mut self, identity: &str, epoch: u64) {
        if self.leader_slots.as_ref().map(|l| l.epoch) == Some(epoch) {
            return;
        }

        match self.client.leader_schedule(Some(identity)).await {
            Ok(schedule) => {
                let slots = leader_slots(&schedule, identity, epoch);
                debug!(epoch, slots = slots.slots.len(), "refreshed leader schedule");
                self.leader_slots = Some(slots);
            }
            Err(error) => {
                warn!(%error, "leader schedule unavailable, keeping previous");
            }
        }
    }
}
