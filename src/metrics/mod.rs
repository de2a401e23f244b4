//! # Metrics Module
//!
//! Data shapes shared between the collectors and the metrics sink:
//!
//! - **`BucketRecord`**: one bucket's usage statistics as reported by the gateway
//! - **`UserSummary`**: per-user aggregate, recomputed fresh every pass
//! - **`MetricName`** / **`Observation`**: finished observations handed to a sink

pub mod sink;

pub use sink::{MetricsSink, SnapshotSink};

/// Usage statistics for a single bucket as reported by the admin API.
///
/// The numeric fields are `Option` because the gateway may omit them; `None`
/// means "not reported", which is distinct from an empty bucket reporting `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRecord {
    pub owner: String,
    pub bucket: String,
    pub size_bytes: Option<u64>,
    pub object_count: Option<u64>,
    pub shard_count: Option<u64>,
}

/// Per-user aggregate of bucket count and stored bytes.
///
/// Zero-initialized for every enumerated user at pass start, mutated only by
/// the aggregator after the collection barrier, discarded at pass end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserSummary {
    pub bucket_count: u64,
    pub total_bytes: u64,
}

/// Names of the metrics this exporter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricName {
    UserPresence,
    BucketUsageBytes,
    BucketObjectCount,
    BucketShardCount,
    UserTotalBucketCount,
    UserTotalUsageBytes,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::UserPresence => "ceph_rgw_user",
            MetricName::BucketUsageBytes => "ceph_rgw_bucket_usage_bytes",
            MetricName::BucketObjectCount => "ceph_rgw_bucket_object_count",
            MetricName::BucketShardCount => "ceph_rgw_bucket_shard_count",
            MetricName::UserTotalBucketCount => "ceph_rgw_user_total_bucket_count",
            MetricName::UserTotalUsageBytes => "ceph_rgw_user_total_usage_bytes",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            MetricName::UserPresence => "RGW user",
            MetricName::BucketUsageBytes => "Total data stored in a bucket",
            MetricName::BucketObjectCount => "Count of objects stored in a bucket",
            MetricName::BucketShardCount => {
                "The number of RADOS objects(shards) a bucket index is using"
            }
            MetricName::UserTotalBucketCount => "Total number of buckets owned by the user",
            MetricName::UserTotalUsageBytes => "Total of stored data for a given user",
        }
    }

    /// Label keys in the order the corresponding observation carries them.
    pub fn label_keys(&self) -> &'static [&'static str] {
        match self {
            MetricName::UserPresence
            | MetricName::UserTotalBucketCount
            | MetricName::UserTotalUsageBytes => &["uid"],
            MetricName::BucketUsageBytes
            | MetricName::BucketObjectCount
            | MetricName::BucketShardCount => &["uid", "bucket"],
        }
    }
}

/// A single finished observation: `(name, label set, value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub name: MetricName,
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl Observation {
    pub fn per_user(name: MetricName, uid: &str, value: f64) -> Self {
        Self {
            name,
            labels: vec![("uid", uid.to_string())],
            value,
        }
    }

    pub fn per_bucket(name: MetricName, uid: &str, bucket: &str, value: f64) -> Self {
        Self {
            name,
            labels: vec![("uid", uid.to_string()), ("bucket", bucket.to_string())],
            value,
        }
    }
}
