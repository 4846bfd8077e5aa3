//! tvc-watch - operator toolkit for tracking validator vote credits.
//!
//! The core is a caching, multi-endpoint JSON-RPC client layered with
//! epoch and leader-slot calculators and a continuously refreshing engine
//! that ranks a target validator's vote-credit performance against its
//! peers in real time.

pub mod calc;
pub mod config;
pub mod rpc;
pub mod tracker;
pub mod types;

// Re-export the main surface for convenience
pub use config::{TrackerConfig, TrackerConfigBuilder};
pub use tracker::{TrackerSnapshot, TvcTracker};
pub use types::Cluster;
