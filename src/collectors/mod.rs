//! # Collectors Module
//!
//! The concurrent collection/aggregation engine:
//!
//! - **`EndpointSelector`**: resolves a working connection from the ordered
//!   endpoint list, with a rotating start offset for load spreading
//! - **`users`**: enumerates the full set of known users via one connection
//! - **`BucketStatsCollector`**: one task per user, each with its own
//!   connection, fetching that user's buckets with usage stats
//! - **`Aggregator`**: drains all per-user results after the completion
//!   barrier, applies threshold gating and accumulates per-user summaries
//! - **`Orchestrator`**: wires the above into one pass and serializes passes

pub mod aggregator;
pub mod buckets;
pub mod endpoint;
pub mod orchestrator;
pub mod users;

pub use aggregator::Aggregator;
pub use buckets::BucketStatsCollector;
pub use endpoint::EndpointSelector;
pub use orchestrator::Orchestrator;

use crate::client::ClientError;

/// Failures that end a pass. Per-user bucket listing failures are not in
/// here: they degrade to an empty result set and the pass continues.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("unable to connect to any of the {attempted} configured endpoints")]
    AllEndpointsUnreachable { attempted: usize },
    #[error("unable to list gateway users: {0}")]
    UserEnumeration(#[source] ClientError),
}
