//! Prometheus metrics.
//!
//! - [`MetricsConfig`] and [`init_metrics`] install the recorder
//! - [`metrics_handler`] renders `/metrics`
//! - `record_*` helpers emit the business metrics
//!
//! ```no_run
//! use localroute_service_shared::metrics::{init_metrics, metrics_handler, MetricsConfig};
//! use axum::{routing::get, Router};
//!
//! init_metrics(&MetricsConfig::default()).expect("failed to initialize metrics");
//! let app: Router = Router::new().route("/metrics", get(metrics_handler));
//! ```

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// `METRICS_ENABLED` ("false" disables) and `METRICS_PATH`.
    pub fn from_env() -> Self {
        let enabled = std::env::var("METRICS_ENABLED")
            .map(|v| !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        let path = std::env::var("METRICS_PATH").unwrap_or_else(|_| "/metrics".to_string());
        Self { enabled, path }
    }
}

#[derive(Debug, Clone, Error)]
pub enum MetricsError {
    #[error("metrics are disabled")]
    Disabled,
    #[error("metrics recorder already initialized")]
    AlreadyInitialized,
    #[error("failed to install metrics recorder: {0}")]
    InstallFailed(String),
}

/// Install the Prometheus recorder. Only the first call succeeds.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }
    if PROMETHEUS_HANDLE.get().is_some() {
        return Err(MetricsError::AlreadyInitialized);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)
}

pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Prometheus exposition text.
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# Metrics not initialized\n".to_string())
}

/// `localroute_routes_planned_total{algorithm}`
pub fn record_route_planned(algorithm: &str) {
    metrics::counter!(
        "localroute_routes_planned_total",
        "algorithm" => algorithm.to_string()
    )
    .increment(1);
}

/// `localroute_routes_failed_total{reason}`, where `reason` is an error kind
/// such as `geocoding_failed` or `unreachable`.
pub fn record_route_failed(reason: &str) {
    metrics::counter!(
        "localroute_routes_failed_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// `localroute_route_distance_meters{algorithm}`
pub fn record_route_distance(meters: f64, algorithm: &str) {
    metrics::histogram!(
        "localroute_route_distance_meters",
        "algorithm" => algorithm.to_string()
    )
    .record(meters);
}

/// `localroute_geocode_ambiguous_total`, incremented once per ambiguous address.
pub fn record_ambiguous_addresses(count: usize) {
    if count > 0 {
        metrics::counter!("localroute_geocode_ambiguous_total").increment(count as u64);
    }
}

/// `localroute_geocode_queries_total{outcome}`
pub fn record_geocode_query(matched: bool) {
    let outcome = if matched { "matched" } else { "unmatched" };
    metrics::counter!("localroute_geocode_queries_total", "outcome" => outcome).increment(1);
}

/// `localroute_trips_planned_total` and `localroute_trip_days`.
pub fn record_trip_planned(days: u32) {
    metrics::counter!("localroute_trips_planned_total").increment(1);
    metrics::histogram!("localroute_trip_days").record(f64::from(days));
}
