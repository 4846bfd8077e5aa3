//! RPC acquisition layer: transport, endpoint pool, cache, method catalog
//! and the unified query client that composes them.

pub mod cache;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod methods;
pub mod transport;

// Re-export the surface the rest of the crate uses.
pub use client::QueryClient;
pub use endpoints::{EndpointHealth, EndpointPool, EndpointStatus, FailureKind};
pub use error::{QueryError, TransportError};
pub use methods::{
    BlockProduction, EpochInfo, GetVoteAccountsResult, LeaderSchedule, Method, VoteAccount,
};
pub use transport::{HttpTransport, RpcTransport};
