use super::CollectError;
use crate::client::{Credentials, Gateway, GatewayConnection};
use std::sync::Arc;
use tracing::{debug, error, warn};
use url::Url;

/// Resolves a working connection from an ordered list of gateway endpoints.
///
/// Callers pass a start offset; assigning a different offset per caller
/// spreads initial load across equivalent gateway instances instead of
/// concentrating every first attempt on one.
#[derive(Clone)]
pub struct EndpointSelector {
    gateway: Arc<dyn Gateway>,
    endpoints: Arc<[Url]>,
    credentials: Credentials,
}

impl EndpointSelector {
    pub fn new(gateway: Arc<dyn Gateway>, endpoints: Vec<Url>, credentials: Credentials) -> Self {
        Self {
            gateway,
            endpoints: endpoints.into(),
            credentials,
        }
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Starting at `start_offset % len`, try each endpoint exactly once in
    /// rotation order and return the first connection that succeeds.
    ///
    /// There is no retry or backoff: a full rotation of failures is
    /// immediately diagnostic and ends the attempt.
    pub async fn connect(
        &self,
        start_offset: usize,
    ) -> Result<Box<dyn GatewayConnection>, CollectError> {
        let count = self.endpoints.len();
        for step in 0..count {
            let endpoint = &self.endpoints[(start_offset + step) % count];
            match self.gateway.connect(endpoint, &self.credentials).await {
                Ok(connection) => {
                    debug!(%endpoint, "connected");
                    return Ok(connection);
                }
                Err(error) => warn!(%endpoint, %error, "unable to connect"),
            }
        }
        error!("all {count} endpoints have been tried and are not reachable");
        Err(CollectError::AllEndpointsUnreachable { attempted: count })
    }
}
