use super::EndpointSelector;
use crate::metrics::BucketRecord;
use tokio::{sync::mpsc, task::JoinSet};
use tracing::{debug, warn};

/// Fetches bucket usage statistics for every user in parallel.
///
/// Bucket listing dominates pass latency, so one task is spawned per user,
/// collapsing total duration toward the slowest single round-trip. There is
/// deliberately no concurrency cap: a cluster with many users opens equally
/// many concurrent connections, a known resource-exhaustion risk that is
/// flagged here rather than silently fixed.
pub struct BucketStatsCollector {
    selector: EndpointSelector,
}

impl BucketStatsCollector {
    pub fn new(selector: EndpointSelector) -> Self {
        Self { selector }
    }

    /// Spawns one worker per user and waits for all of them to report.
    ///
    /// Each worker establishes its own connection, with rotation offsets
    /// assigned round-robin across workers to balance load over the
    /// endpoints. A worker failure degrades to an empty result set for that
    /// user and never fails the pass. The result channel is sized exactly to
    /// the worker count so no sender ever blocks; the `JoinSet` drain is the
    /// completion barrier before aggregation starts.
    pub async fn collect(&self, users: &[String]) -> Vec<Vec<BucketRecord>> {
        if users.is_empty() {
            return Vec::new();
        }

        let (tx, mut rx) = mpsc::channel(users.len());
        let mut workers = JoinSet::new();
        let endpoint_count = self.selector.endpoint_count();

        for (index, uid) in users.iter().enumerate() {
            let selector = self.selector.clone();
            let offset = if endpoint_count == 0 {
                0
            } else {
                index % endpoint_count
            };
            let uid = uid.clone();
            let tx = tx.clone();
            workers.spawn(async move {
                let records = fetch_user_buckets(&selector, offset, &uid).await;
                let _ = tx.send(records).await;
            });
        }
        drop(tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(error) = joined {
                warn!(%error, "bucket worker panicked");
            }
        }

        let mut results = Vec::with_capacity(users.len());
        while let Ok(records) = rx.try_recv() {
            results.push(records);
        }
        results
    }
}

async fn fetch_user_buckets(
    selector: &EndpointSelector,
    offset: usize,
    uid: &str,
) -> Vec<BucketRecord> {
    let connection = match selector.connect(offset).await {
        Ok(connection) => connection,
        Err(error) => {
            warn!(uid, %error, "no endpoint reachable for bucket listing");
            return Vec::new();
        }
    };

    debug!(uid, endpoint = %connection.endpoint(), "listing buckets");
    match connection.list_user_buckets_with_stats(uid).await {
        Ok(records) => {
            debug!(uid, buckets = records.len(), "bucket listing complete");
            records
        }
        Err(error) => {
            warn!(uid, %error, "unable to list buckets");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, Credentials, Gateway, GatewayConnection};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::{collections::HashMap, sync::Arc};
    use url::Url;

    struct MapGateway {
        buckets: HashMap<String, Vec<BucketRecord>>,
        failing_uid: Option<String>,
    }

    struct MapConnection {
        endpoint: Url,
        buckets: HashMap<String, Vec<BucketRecord>>,
        failing_uid: Option<String>,
    }

    #[async_trait]
    impl Gateway for MapGateway {
        async fn connect(
            &self,
            endpoint: &Url,
            _credentials: &Credentials,
        ) -> Result<Box<dyn GatewayConnection>, ClientError> {
            Ok(Box::new(MapConnection {
                endpoint: endpoint.clone(),
                buckets: self.buckets.clone(),
                failing_uid: self.failing_uid.clone(),
            }))
        }
    }

    #[async_trait]
    impl GatewayConnection for MapConnection {
        fn endpoint(&self) -> &Url {
            &self.endpoint
        }

        async fn list_users(&self) -> Result<Vec<String>, ClientError> {
            Ok(self.buckets.keys().cloned().collect())
        }

        async fn list_user_buckets_with_stats(
            &self,
            uid: &str,
        ) -> Result<Vec<BucketRecord>, ClientError> {
            if self.failing_uid.as_deref() == Some(uid) {
                return Err(ClientError::Unreachable(self.endpoint.clone()));
            }
            Ok(self.buckets.get(uid).cloned().unwrap_or_default())
        }
    }

    fn record(owner: &str, bucket: &str, size: u64) -> BucketRecord {
        BucketRecord {
            owner: owner.to_string(),
            bucket: bucket.to_string(),
            size_bytes: Some(size),
            object_count: None,
            shard_count: None,
        }
    }

    fn collector(gateway: MapGateway) -> BucketStatsCollector {
        let selector = EndpointSelector::new(
            Arc::new(gateway),
            vec![
                Url::parse("http://a:8000").unwrap(),
                Url::parse("http://b:8000").unwrap(),
            ],
            Credentials::new("ak", "sk"),
        );
        BucketStatsCollector::new(selector)
    }

    #[tokio::test]
    async fn every_worker_reports_even_on_failure() {
        let mut buckets = HashMap::new();
        buckets.insert("alice".to_string(), vec![record("alice", "photos", 10)]);
        buckets.insert("bob".to_string(), vec![record("bob", "logs", 20)]);
        let collector = collector(MapGateway {
            buckets,
            failing_uid: Some("bob".to_string()),
        });

        let users = vec!["alice".to_string(), "bob".to_string()];
        let mut results = collector.collect(&users).await;

        // one (possibly empty) result per worker
        assert_eq!(results.len(), 2);
        results.sort_by_key(|records| records.len());
        assert_eq!(results[0], Vec::new());
        assert_eq!(results[1], vec![record("alice", "photos", 10)]);
    }

    #[tokio::test]
    async fn no_users_means_no_results() {
        let collector = collector(MapGateway {
            buckets: HashMap::new(),
            failing_uid: None,
        });
        assert!(collector.collect(&[]).await.is_empty());
    }
}
