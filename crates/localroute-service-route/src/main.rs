//! localroute HTTP service binary.
//!
//! # Configuration
//!
//! - `LOCALROUTE_GAZETTEER_PATH` - gazetteer CSV (default `/data/gazetteer.csv`)
//! - `LOCALROUTE_NETWORK_PATH` - road network SQLite database (default `/data/network.db`)
//! - `SERVICE_PORT` - HTTP port (default: 8080)
//! - `RUST_LOG` - log level (default: info)
//! - `LOG_FORMAT` - `json` (default) or `text`
//! - `METRICS_ENABLED` - set to `false` to skip the Prometheus recorder

use std::net::SocketAddr;

use tracing::{error, info};

use localroute_service_route::app;
use localroute_service_shared::{
    init_logging, init_metrics, AppState, LoggingConfig, MetricsConfig, ServiceSettings,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_config = LoggingConfig::from_env().with_service("route");
    init_logging(&logging_config);

    if let Err(e) = init_metrics(&MetricsConfig::from_env()) {
        tracing::warn!(error = %e, "continuing without metrics");
    }

    let settings = ServiceSettings::from_env().map_err(|e| {
        error!(error = %e, "invalid configuration");
        e
    })?;
    info!(
        gazetteer = %settings.gazetteer_path.display(),
        network = %settings.network_path.display(),
        port = settings.port,
        "starting route service"
    );

    let state = AppState::load(&settings).map_err(|e| {
        error!(error = %e, "failed to load application state");
        e
    })?;

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
