//! End-to-end tracking engine behavior over a scripted cluster.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tvc_watch::config::{CacheTtls, RpcConfig, TrackerConfig, TrackerConfigBuilder};
use tvc_watch::rpc::{QueryClient, RpcTransport, TransportError};
use tvc_watch::tracker::{TrackerSnapshot, TvcTracker};
use tvc_watch::Cluster;

/// Serves a fixed five-validator cluster; flips to failing on demand.
struct ScriptedCluster {
    failing: AtomicBool,
}

impl ScriptedCluster {
    fn new() -> Self {
        Self { failing: AtomicBool::new(false) }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl RpcTransport for ScriptedCluster {
    async fn send(&self, url: &str, method: &str, _params: &Value) -> Result<Value, TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Network("connection reset".into()));
        }
        if url.contains("limited") {
            return Err(TransportError::RateLimited);
        }

        match method {
            "getVoteAccounts" => Ok(vote_accounts_payload()),
            "getEpochInfo" => Ok(json!({
                "epoch": 701,
                "absoluteSlot": 303_048_000u64,
                "slotIndex": 216_000,
                "slotsInEpoch": 432_000,
                "blockHeight": 281_000_000u64
            })),
            "getLeaderSchedule" => Ok(json!({ "node-3": [10, 20, 300_000] })),
            "getBlockProduction" => Ok(json!({
                "context": { "slot": 303_048_000u64 },
                "value": {
                    "byIdentity": { "node-3": [2, 1] },
                    "range": { "firstSlot": 302_832_000u64, "lastSlot": 303_048_000u64 }
                }
            })),
            other => Err(TransportError::Network(format!("unexpected method {other}"))),
        }
    }
}

fn vote_accounts_payload() -> Value {
    let current: Vec<Value> = [(1u64, 500u64), (2, 400), (3, 300), (4, 200), (5, 100)]
        .iter()
        .map(|(n, credits)| {
            json!({
                "votePubkey": format!("vote-{n}"),
                "nodePubkey": format!("node-{n}"),
                "activatedStake": 1_000_000u64,
                "commission": 5,
                "epochCredits": [[700u64, 9000u64, 8000u64], [701u64, *credits, 0u64]],
                "lastVote": 303_048_000u64,
                "rootSlot": 303_047_968u64
            })
        })
        .collect();
    json!({ "current": current, "delinquent": [] })
}

fn fast_config(identity: &str) -> TrackerConfig {
    fast_config_over(identity, vec!["https://scripted.example".into()])
}

fn fast_config_over(identity: &str, endpoints: Vec<String>) -> TrackerConfig {
    TrackerConfigBuilder::new(Cluster::Mainnet)
        .with_identity(identity)
        .with_endpoints(endpoints)
        .with_poll_interval(Duration::from_millis(20))
        .with_rpc(RpcConfig {
            requests_per_second: 1000,
            network_cooldown: Duration::from_millis(1),
            ..RpcConfig::default()
        })
        .with_ttls(CacheTtls {
            vote_accounts: Duration::from_millis(1),
            epoch_info: Duration::from_millis(1),
            slot: Duration::from_millis(1),
            leader_schedule: Duration::from_secs(3600),
            block_production: Duration::from_millis(1),
        })
        .build()
        .expect("test config must build")
}

fn tracker_over(
    config: TrackerConfig,
    transport: Arc<dyn RpcTransport>,
) -> (TvcTracker, mpsc::Receiver<TrackerSnapshot>, watch::Sender<bool>) {
    let client = Arc::new(QueryClient::with_transport(&config, transport));
    let (snapshot_tx, snapshot_rx) = mpsc::channel(16);
    let (stop_tx, stop_rx) = watch::channel(false);
    let tracker = TvcTracker::with_client(config, client, snapshot_tx, stop_rx).unwrap();
    (tracker, snapshot_rx, stop_tx)
}

#[tokio::test]
async fn test_snapshot_ranks_target_third_of_five() {
    let (mut tracker, _rx, _stop) = tracker_over(fast_config("node-3"), Arc::new(ScriptedCluster::new()));

    let snapshot = tracker.snapshot_once().await.expect("scripted cluster answers");

    assert!(snapshot.fresh);
    assert_eq!(snapshot.epoch, 701);
    assert_eq!(snapshot.target.rank, 3);
    assert_eq!(snapshot.target.credits, 300);
    assert_eq!(snapshot.rank1_credits, 500);
    assert_eq!(snapshot.missed_credits, 200);
    assert_eq!(snapshot.network.active_validators, 5);
    assert_eq!(snapshot.epoch_progress.percent_complete, 50.0);

    // Leader schedule: slots 10 and 20 are behind slot index 216000, one
    // upcoming slot remains; production reports 1 of 2 produced.
    let leader = snapshot.leader.expect("leader metrics present");
    assert_eq!(leader.slots_total, 3);
    assert_eq!(leader.slots_completed, 2);
    assert_eq!(leader.next_slot, Some(300_000));
    assert_eq!(leader.slots_skipped, 1);

    // Rank 1 never misses credits against itself.
    let best = &snapshot.validators[0];
    assert_eq!(best.rank, 1);
    assert_eq!(snapshot.rank1_credits - best.info.credits, 0);
}

#[tokio::test]
async fn test_snapshot_survives_two_rate_limited_endpoints() {
    // First two endpoints always push back; the third answers. The
    // snapshot still comes out fresh with the target ranked third.
    let config = fast_config_over(
        "node-3",
        vec![
            "https://limited-1.example".into(),
            "https://limited-2.example".into(),
            "https://good.example".into(),
        ],
    );
    let (mut tracker, _rx, _stop) = tracker_over(config, Arc::new(ScriptedCluster::new()));

    let snapshot = tracker.snapshot_once().await.expect("third endpoint answers");

    assert!(snapshot.fresh);
    assert_eq!(snapshot.target.rank, 3);
    assert_eq!(snapshot.missed_credits, 500 - 300);
}

#[tokio::test]
async fn test_target_resolvable_by_vote_pubkey() {
    let (mut tracker, _rx, _stop) = tracker_over(fast_config("vote-2"), Arc::new(ScriptedCluster::new()));

    let snapshot = tracker.snapshot_once().await.unwrap();
    assert_eq!(snapshot.target.rank, 2);
    assert_eq!(snapshot.target.identity, "node-2");
}

#[tokio::test]
async fn test_unknown_identity_is_fatal_at_startup() {
    let (mut tracker, _rx, _stop) = tracker_over(fast_config("node-99"), Arc::new(ScriptedCluster::new()));

    let error = tracker.snapshot_once().await.unwrap_err();
    assert!(error.to_string().contains("not found in the active vote account set"));
}

#[tokio::test]
async fn test_degraded_engine_reemits_stale_then_recovers() {
    let cluster = Arc::new(ScriptedCluster::new());
    let (tracker, mut snapshot_rx, stop_tx) = tracker_over(fast_config("node-3"), cluster.clone());

    let tracker_handle = tokio::spawn(tracker.run());

    // First tick is fresh.
    let first = timeout(Duration::from_secs(10), snapshot_rx.recv())
        .await
        .expect("tracker emits within deadline")
        .expect("channel open");
    assert!(first.fresh);
    assert_eq!(first.target.rank, 3);

    // Upstream goes away: the loop keeps emitting the old data marked stale.
    cluster.set_failing(true);
    let stale = loop {
        let snapshot = timeout(Duration::from_secs(10), snapshot_rx.recv())
            .await
            .expect("tracker emits within deadline")
            .expect("channel open");
        if !snapshot.fresh {
            break snapshot;
        }
    };
    assert_eq!(stale.target.credits, first.target.credits);
    assert_eq!(stale.missed_credits, first.missed_credits);

    // Upstream returns: the loop recovers to fresh snapshots by itself.
    cluster.set_failing(false);
    let recovered = loop {
        let snapshot = timeout(Duration::from_secs(10), snapshot_rx.recv())
            .await
            .expect("tracker emits within deadline")
            .expect("channel open");
        if snapshot.fresh {
            break snapshot;
        }
    };
    assert_eq!(recovered.target.rank, 3);

    stop_tx.send(true).unwrap();
    timeout(Duration::from_secs(10), tracker_handle)
        .await
        .expect("tracker stops within deadline")
        .expect("tracker task not cancelled")
        .expect("tracker exits cleanly");
}

#[tokio::test]
async fn test_snapshot_reports_deltas_between_ticks() {
    let (mut tracker, _rx, _stop) = tracker_over(fast_config("node-3"), Arc::new(ScriptedCluster::new()));

    // Drive two ticks by hand; the scripted cluster is static, so deltas
    // exist on the second snapshot and are all zero.
    let first = tracker.tick().await.unwrap();
    assert!(first.deltas.is_none());

    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = tracker.tick().await.unwrap();
    let deltas = second.deltas.expect("second tick carries deltas");
    assert_eq!(deltas.credits, 0);
    assert_eq!(deltas.missed_credits, 0);
}
