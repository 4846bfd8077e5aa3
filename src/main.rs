//! Command-line entry point for the vote-credit tracker.

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, Level};
use tvc_watch::tracker::TrackerSnapshot;
use tvc_watch::{Cluster, TrackerConfigBuilder, TvcTracker};

#[derive(Parser, Debug)]
#[command(name = "tvc-watch", version, about = "Track a validator's vote credits against its peers")]
struct Args {
    /// Cluster to track
    #[arg(value_enum)]
    cluster: Cluster,

    /// Validator identity pubkey (falls back to TVC_WATCH_IDENTITY)
    identity: Option<String>,

    /// Poll interval in seconds
    #[arg(long, short, default_value_t = 1.0)]
    interval: f64,

    /// RPC endpoint URL, repeatable; cluster defaults apply when omitted
    #[arg(long = "endpoint", short = 'e')]
    endpoints: Vec<String>,

    /// Fetch one snapshot, print it as JSON and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();

    let identity = args
        .identity
        .or_else(|| std::env::var("TVC_WATCH_IDENTITY").ok())
        .context("no validator identity given and TVC_WATCH_IDENTITY is unset")?;

    let config = TrackerConfigBuilder::new(args.cluster)
        .with_identity(identity)
        .with_endpoints(args.endpoints)
        .with_poll_interval(Duration::from_secs_f64(args.interval.max(0.1)))
        .build()?;

    info!(cluster = %args.cluster, "starting tvc-watch");

    let (snapshot_tx, mut snapshot_rx) = mpsc::channel::<TrackerSnapshot>(16);
    let (stop_tx, stop_rx) = watch::channel(false);

    let mut tracker = TvcTracker::new(config, snapshot_tx, stop_rx)?;

    if args.once {
        let snapshot = tracker.snapshot_once().await?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let tracker_handle = tokio::spawn(tracker.run());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, stopping tracker");
                let _ = stop_tx.send(true);
                break;
            }
            snapshot = snapshot_rx.recv() => match snapshot {
                Some(snapshot) => log_snapshot(&snapshot),
                None => break,
            }
        }
    }

    tracker_handle.await??;
    Ok(())
}

fn log_snapshot(snapshot: &TrackerSnapshot) {
    let freshness = if snapshot.fresh { "fresh" } else { "stale" };
    info!(
        "epoch {} [{:.2}%] rank {}/{} | credits {} | missed {} | {}",
        snapshot.epoch,
        snapshot.epoch_progress.percent_complete,
        snapshot.target.rank,
        snapshot.network.active_validators,
        snapshot.target.credits,
        snapshot.missed_credits,
        freshness,
    );
}
