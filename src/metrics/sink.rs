use super::Observation;

/// Receives finished metric observations from a collection pass.
///
/// The sink is passed explicitly into the components that emit; there is no
/// process-wide registry the collectors write into.
pub trait MetricsSink: Send {
    fn record(&mut self, observation: Observation);
}

/// Collects observations into a flat snapshot.
///
/// Used by the scrape handler (which renders the snapshot into the text
/// exposition format) and by tests.
#[derive(Debug, Default)]
pub struct SnapshotSink {
    observations: Vec<Observation>,
}

impl SnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn into_observations(self) -> Vec<Observation> {
        self.observations
    }
}

impl MetricsSink for SnapshotSink {
    fn record(&mut self, observation: Observation) {
        self.observations.push(observation);
    }
}
