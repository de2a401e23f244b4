use super::{users, Aggregator, BucketStatsCollector, CollectError, EndpointSelector};
use crate::{
    client::Gateway,
    config::Config,
    metrics::{MetricName, MetricsSink, Observation},
};
use std::{sync::Arc, time::Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Runs collection passes against the gateway.
///
/// A pass moves through connecting, user enumeration, parallel bucket
/// collection, aggregation and emission; a failure while connecting or
/// enumerating ends the pass with an error, a failure inside one bucket
/// worker only empties that worker's contribution. A pass cannot be
/// cancelled once started.
pub struct Orchestrator {
    selector: EndpointSelector,
    collector: BucketStatsCollector,
    aggregator: Aggregator,
    // Overlapping scrapes queue here instead of interleaving passes.
    pass_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn Gateway>, config: &Config) -> Self {
        let selector = EndpointSelector::new(
            gateway,
            config.endpoints.clone(),
            config.credentials.clone(),
        );
        Self {
            collector: BucketStatsCollector::new(selector.clone()),
            aggregator: Aggregator::new(config.threshold_size, config.threshold_objects),
            selector,
            pass_lock: Mutex::new(()),
        }
    }

    /// One full collection → aggregation → emission cycle.
    ///
    /// Every enumerated user yields a presence metric and a summary pair;
    /// nothing carries over between passes.
    pub async fn run_pass(&self, sink: &mut dyn MetricsSink) -> Result<(), CollectError> {
        let _pass = self.pass_lock.lock().await;

        let connection = self.selector.connect(0).await?;
        let users = users::enumerate(connection.as_ref()).await?;
        info!(users = users.len(), "enumerated gateway users");

        for uid in &users {
            sink.record(Observation::per_user(MetricName::UserPresence, uid, 1.0));
        }

        let started = Instant::now();
        let results = self.collector.collect(&users).await;
        debug!(elapsed = ?started.elapsed(), "bucket workers completed");

        info!("processing the bucket stats data");
        self.aggregator.aggregate(&users, results, sink);
        info!("processing complete");
        Ok(())
    }
}
