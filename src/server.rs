//! # Scrape Server
//!
//! Exposes the collection engine to Prometheus. Every `GET /metrics`
//! triggers one full pass and renders the resulting snapshot in the text
//! exposition format; a failed pass is reported to the scraper as an HTTP
//! error instead of terminating the process.

use crate::{
    collectors::{CollectError, Orchestrator},
    metrics::{MetricName, Observation, SnapshotSink},
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use eyre::Result;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::{
    collections::{hash_map::Entry, HashMap},
    net::SocketAddr,
    sync::Arc,
};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
}

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(AppState { orchestrator })
}

pub async fn serve(addr: SocketAddr, orchestrator: Arc<Orchestrator>) -> Result<()> {
    let app = create_router(orchestrator);
    info!("listening on {addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, thiserror::Error)]
enum ScrapeError {
    #[error("scrape failed: {0}")]
    Collect(#[from] CollectError),
    #[error("metric encoding failed: {0}")]
    Encode(#[from] prometheus::Error),
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "scrape failed");
        let status = match self {
            ScrapeError::Collect(_) => StatusCode::SERVICE_UNAVAILABLE,
            ScrapeError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

async fn metrics(State(state): State<AppState>) -> Result<Response, ScrapeError> {
    let mut sink = SnapshotSink::new();
    state.orchestrator.run_pass(&mut sink).await?;
    let encoder = TextEncoder::new();
    let body = render(sink.observations())?;
    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        body,
    )
        .into_response())
}

/// Renders a flat snapshot into the Prometheus text exposition format.
///
/// Gauges are rebuilt from scratch for every scrape; the registry holds no
/// state between passes.
fn render(observations: &[Observation]) -> Result<String, prometheus::Error> {
    let registry = Registry::new();
    let mut gauges: HashMap<MetricName, GaugeVec> = HashMap::new();

    for observation in observations {
        let gauge = match gauges.entry(observation.name) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let gauge = GaugeVec::new(
                    Opts::new(observation.name.as_str(), observation.name.help()),
                    observation.name.label_keys(),
                )?;
                registry.register(Box::new(gauge.clone()))?;
                entry.insert(gauge)
            }
        };
        let values: Vec<&str> = observation
            .labels
            .iter()
            .map(|(_, value)| value.as_str())
            .collect();
        gauge.with_label_values(&values).set(observation.value);
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|error| prometheus::Error::Msg(error.to_string()))
}
