//! rgw-exporter is a metrics exporter for Prometheus environments. It
//! provides bucket and user level information to help with monitoring and
//! alerting in Ceph RadosGW clusters.

use clap::Parser;
use color_eyre::Result;
use rgw_exporter::{
    client::{AdminGateway, Credentials},
    collectors::Orchestrator,
    config::{self, Config},
    server,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rgw-exporter")]
#[command(about = "Prometheus exporter for Ceph RadosGW bucket and user usage")]
#[command(version)]
struct Cli {
    /// Port for the exporter to bind to
    #[arg(long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Run in debug mode
    #[arg(long)]
    debug: bool,

    /// Minimum bucket size for per bucket reporting (e.g. "1Mb", "10GiB")
    #[arg(long = "threshold.size", default_value = config::DEFAULT_MIN_BUCKET_SIZE)]
    threshold_size: String,

    /// Minimum object count for per bucket reporting
    #[arg(long = "threshold.objects", default_value_t = config::DEFAULT_MIN_OBJECT_COUNT)]
    threshold_objects: u64,

    /// Comma separated list of gateway endpoint URLs
    #[arg(long, env = "RGW_HOST", value_delimiter = ',')]
    rgw_host: Vec<String>,

    /// Admin API access key
    #[arg(long, env = "ACCESS_KEY", hide_env_values = true)]
    access_key: String,

    /// Admin API secret key
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    secret_key: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("rgw_exporter={log_level}"))
        .init();
    color_eyre::install()?;

    info!("starting rgw-exporter");

    let threshold_size = config::parse_capacity(&cli.threshold_size)?;
    let endpoints = config::validate_endpoints(&cli.rgw_host)?;

    info!("parameters:");
    info!("- RGW endpoints    : {}", endpoints.len());
    info!("- min object count : {}", cli.threshold_objects);
    info!(
        "- min bucket size  : {} bytes ({})",
        threshold_size, cli.threshold_size
    );

    let config = Config {
        endpoints,
        credentials: Credentials::new(cli.access_key, cli.secret_key),
        threshold_size,
        threshold_objects: cli.threshold_objects,
    };

    let gateway = Arc::new(AdminGateway::new()?);
    let orchestrator = Arc::new(Orchestrator::new(gateway, &config));

    info!("binding to port {}", cli.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    server::serve(addr, orchestrator).await
}
