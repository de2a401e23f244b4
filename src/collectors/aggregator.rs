use crate::metrics::{BucketRecord, MetricName, MetricsSink, Observation, UserSummary};
use std::collections::HashMap;
use tracing::debug;

/// Turns the drained per-user results into metric observations.
///
/// Runs strictly after the collection barrier, so the whole aggregation is a
/// single-threaded section and the summary map needs no synchronization.
pub struct Aggregator {
    size_threshold: u64,
    object_threshold: u64,
}

impl Aggregator {
    pub fn new(size_threshold: u64, object_threshold: u64) -> Self {
        Self {
            size_threshold,
            object_threshold,
        }
    }

    /// Emits threshold-gated per-bucket metrics and per-user summaries.
    ///
    /// Per bucket: a size or object-count metric when the value is reported
    /// and meets its threshold, plus the shard-count metric once either
    /// threshold is crossed (shard counts are only operationally interesting
    /// for buckets already flagged as large). Every reported size feeds the
    /// owner's running total regardless of gating, and every record counts
    /// toward the owner's bucket count.
    ///
    /// Summaries are zero-initialized for every enumerated user, so users
    /// with zero observed buckets still emit a `(0, 0)` summary pair. An
    /// owner that shows up in the records without having been enumerated
    /// still gets its summary pair, so the sum of emitted bucket counts
    /// always equals the number of records observed.
    pub fn aggregate(
        &self,
        users: &[String],
        results: Vec<Vec<BucketRecord>>,
        sink: &mut dyn MetricsSink,
    ) {
        let mut summaries: HashMap<&str, UserSummary> = users
            .iter()
            .map(|uid| (uid.as_str(), UserSummary::default()))
            .collect();

        for records in &results {
            for record in records {
                debug!(uid = %record.owner, bucket = %record.bucket, "processing bucket");
                let entry = summaries.entry(record.owner.as_str()).or_default();

                let mut size_flag = false;
                let mut object_flag = false;

                if let Some(size) = record.size_bytes {
                    if size >= self.size_threshold {
                        sink.record(Observation::per_bucket(
                            MetricName::BucketUsageBytes,
                            &record.owner,
                            &record.bucket,
                            size as f64,
                        ));
                        size_flag = true;
                    }
                    entry.total_bytes += size;
                }

                if let Some(count) = record.object_count {
                    if count >= self.object_threshold {
                        sink.record(Observation::per_bucket(
                            MetricName::BucketObjectCount,
                            &record.owner,
                            &record.bucket,
                            count as f64,
                        ));
                        object_flag = true;
                    }
                }

                if size_flag || object_flag {
                    if let Some(shards) = record.shard_count {
                        sink.record(Observation::per_bucket(
                            MetricName::BucketShardCount,
                            &record.owner,
                            &record.bucket,
                            shards as f64,
                        ));
                    }
                }

                entry.bucket_count += 1;
            }
        }

        for uid in users {
            let summary = summaries.remove(uid.as_str()).unwrap_or_default();
            Self::emit_summary(sink, uid, summary);
        }

        // Leftover entries belong to record owners that were never
        // enumerated; emit them too (sorted, to keep passes deterministic).
        let mut unenumerated: Vec<(&str, UserSummary)> = summaries.into_iter().collect();
        unenumerated.sort_by_key(|(uid, _)| *uid);
        for (uid, summary) in unenumerated {
            Self::emit_summary(sink, uid, summary);
        }
    }

    fn emit_summary(sink: &mut dyn MetricsSink, uid: &str, summary: UserSummary) {
        sink.record(Observation::per_user(
            MetricName::UserTotalBucketCount,
            uid,
            summary.bucket_count as f64,
        ));
        sink.record(Observation::per_user(
            MetricName::UserTotalUsageBytes,
            uid,
            summary.total_bytes as f64,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SnapshotSink;
    use pretty_assertions::assert_eq;

    fn record(
        owner: &str,
        bucket: &str,
        size: Option<u64>,
        objects: Option<u64>,
        shards: Option<u64>,
    ) -> BucketRecord {
        BucketRecord {
            owner: owner.to_string(),
            bucket: bucket.to_string(),
            size_bytes: size,
            object_count: objects,
            shard_count: shards,
        }
    }

    fn users(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn value_of(sink: &SnapshotSink, name: MetricName, uid: &str) -> Option<f64> {
        sink.observations()
            .iter()
            .find(|o| o.name == name && o.labels.first().map(|(_, v)| v.as_str()) == Some(uid))
            .map(|o| o.value)
    }

    fn count_of(sink: &SnapshotSink, name: MetricName) -> usize {
        sink.observations().iter().filter(|o| o.name == name).count()
    }

    #[test]
    fn size_below_threshold_still_counts_toward_total() {
        let aggregator = Aggregator::new(1000, u64::MAX);
        let mut sink = SnapshotSink::new();

        aggregator.aggregate(
            &users(&["alice"]),
            vec![vec![record("alice", "small", Some(500), None, Some(3))]],
            &mut sink,
        );

        assert_eq!(count_of(&sink, MetricName::BucketUsageBytes), 0);
        assert_eq!(count_of(&sink, MetricName::BucketShardCount), 0);
        assert_eq!(
            value_of(&sink, MetricName::UserTotalUsageBytes, "alice"),
            Some(500.0)
        );
        assert_eq!(
            value_of(&sink, MetricName::UserTotalBucketCount, "alice"),
            Some(1.0)
        );
    }

    #[test]
    fn shard_count_emitted_iff_threshold_crossed() {
        let aggregator = Aggregator::new(1000, 100);
        let mut sink = SnapshotSink::new();

        aggregator.aggregate(
            &users(&["alice"]),
            vec![vec![
                // size crosses, objects don't
                record("alice", "big", Some(4096), Some(2), Some(7)),
                // objects cross, size doesn't
                record("alice", "many", Some(10), Some(500), Some(13)),
                // neither crosses
                record("alice", "small", Some(10), Some(2), Some(1)),
            ]],
            &mut sink,
        );

        assert_eq!(count_of(&sink, MetricName::BucketUsageBytes), 1);
        assert_eq!(count_of(&sink, MetricName::BucketObjectCount), 1);
        assert_eq!(count_of(&sink, MetricName::BucketShardCount), 2);
        let shard_buckets: Vec<&str> = sink
            .observations()
            .iter()
            .filter(|o| o.name == MetricName::BucketShardCount)
            .map(|o| o.labels[1].1.as_str())
            .collect();
        assert_eq!(shard_buckets, vec!["big", "many"]);
    }

    #[test]
    fn unreported_shard_count_is_not_emitted_as_zero() {
        let aggregator = Aggregator::new(0, 0);
        let mut sink = SnapshotSink::new();

        aggregator.aggregate(
            &users(&["alice"]),
            vec![vec![record("alice", "big", Some(4096), Some(9), None)]],
            &mut sink,
        );

        assert_eq!(count_of(&sink, MetricName::BucketUsageBytes), 1);
        assert_eq!(count_of(&sink, MetricName::BucketShardCount), 0);
    }

    #[test]
    fn zero_bucket_users_still_get_summaries() {
        let aggregator = Aggregator::new(1000, 1000);
        let mut sink = SnapshotSink::new();

        aggregator.aggregate(
            &users(&["user1", "user2"]),
            vec![
                vec![
                    record("user1", "a", Some(10), None, None),
                    record("user1", "b", Some(20), None, None),
                    record("user1", "c", Some(30), None, None),
                ],
                vec![],
            ],
            &mut sink,
        );

        assert_eq!(
            value_of(&sink, MetricName::UserTotalBucketCount, "user1"),
            Some(3.0)
        );
        assert_eq!(
            value_of(&sink, MetricName::UserTotalUsageBytes, "user1"),
            Some(60.0)
        );
        assert_eq!(
            value_of(&sink, MetricName::UserTotalBucketCount, "user2"),
            Some(0.0)
        );
        assert_eq!(
            value_of(&sink, MetricName::UserTotalUsageBytes, "user2"),
            Some(0.0)
        );
    }

    #[test]
    fn bucket_counts_sum_to_observed_records() {
        let aggregator = Aggregator::new(u64::MAX, u64::MAX);
        let mut sink = SnapshotSink::new();
        let results = vec![
            vec![
                record("alice", "a", Some(1), None, None),
                record("alice", "b", None, Some(2), None),
            ],
            vec![record("bob", "c", None, None, None)],
            vec![],
        ];
        let total_records: usize = results.iter().map(Vec::len).sum();

        aggregator.aggregate(&users(&["alice", "bob", "carol"]), results, &mut sink);

        let summed: f64 = sink
            .observations()
            .iter()
            .filter(|o| o.name == MetricName::UserTotalBucketCount)
            .map(|o| o.value)
            .sum();
        assert_eq!(summed, total_records as f64);
    }

    #[test]
    fn unenumerated_owner_still_gets_a_summary() {
        let aggregator = Aggregator::new(u64::MAX, u64::MAX);
        let mut sink = SnapshotSink::new();

        aggregator.aggregate(
            &users(&["alice"]),
            vec![vec![record("stranger", "orphan", Some(42), None, None)]],
            &mut sink,
        );

        assert_eq!(
            value_of(&sink, MetricName::UserTotalBucketCount, "stranger"),
            Some(1.0)
        );
        assert_eq!(
            value_of(&sink, MetricName::UserTotalUsageBytes, "stranger"),
            Some(42.0)
        );
        // the record is not lost: counts still sum to the records observed
        let summed: f64 = sink
            .observations()
            .iter()
            .filter(|o| o.name == MetricName::UserTotalBucketCount)
            .map(|o| o.value)
            .sum();
        assert_eq!(summed, 1.0);
    }

    #[test]
    fn aggregation_is_idempotent_across_passes() {
        let aggregator = Aggregator::new(100, 10);
        let results = || {
            vec![vec![
                record("alice", "a", Some(150), Some(20), Some(5)),
                record("alice", "b", Some(50), None, None),
            ]]
        };

        let mut first = SnapshotSink::new();
        aggregator.aggregate(&users(&["alice"]), results(), &mut first);
        let mut second = SnapshotSink::new();
        aggregator.aggregate(&users(&["alice"]), results(), &mut second);

        assert_eq!(first.observations(), second.observations());
    }
}
