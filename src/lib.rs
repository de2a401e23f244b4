//! # rgw-exporter
//!
//! A Prometheus exporter for bucket and user level usage statistics from
//! Ceph RadosGW clusters.
//!
//! ## Architecture
//!
//! Each scrape triggers one collection pass against the gateway's admin API:
//!
//! - **`config`**: validated runtime settings, capacity parsing, endpoint validation
//! - **`client`**: admin API client (connection traits + reqwest implementation)
//! - **`collectors`**: the concurrent collection/aggregation engine
//!   - **`EndpointSelector`**: endpoint failover with rotating start offsets
//!   - **`BucketStatsCollector`**: one parallel worker per user
//!   - **`Aggregator`**: threshold-gated emission and per-user summaries
//!   - **`Orchestrator`**: runs and serializes whole passes
//! - **`metrics`**: data shapes and the metrics sink
//! - **`server`**: axum scrape endpoint rendering the text exposition format

pub mod client;
pub mod collectors;
pub mod config;
pub mod metrics;
pub mod server;

pub use client::{AdminGateway, ClientError, Credentials, Gateway, GatewayConnection};
pub use collectors::{
    Aggregator, BucketStatsCollector, CollectError, EndpointSelector, Orchestrator,
};
pub use config::{Config, ConfigError};
pub use metrics::{BucketRecord, MetricName, MetricsSink, Observation, SnapshotSink, UserSummary};
