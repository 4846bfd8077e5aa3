//! Shared types for the tvc-watch tracking system.

use clap::ValueEnum;
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A base58-encoded public key (kept as a string, matching the wire format).
pub type Pubkey = String;

/// Cluster selector for the tracked network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    Mainnet,
    Testnet,
}

impl Cluster {
    /// Returns the lowercase string form used in logs and config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::Mainnet => "mainnet",
            Cluster::Testnet => "testnet",
        }
    }

    /// Default public RPC endpoints for the cluster.
    ///
    /// Operators are expected to override these with their own endpoint
    /// lists; the public ones are heavily rate limited.
    pub fn default_endpoints(&self) -> NonEmpty<String> {
        match self {
            Cluster::Mainnet => NonEmpty::new("https://api.mainnet-beta.solana.com".to_string()),
            Cluster::Testnet => NonEmpty::new("https://api.testnet.solana.com".to_string()),
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Cluster::Mainnet),
            "testnet" => Ok(Cluster::Testnet),
            other => Err(format!("unknown cluster '{other}'")),
        }
    }
}
