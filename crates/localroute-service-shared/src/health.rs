//! `/health/live` and `/health/ready` handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Body returned by both probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// "ok" or "not_ready: <reason>".
    pub status: String,
    pub service: String,
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub places_loaded: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes_loaded: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges_loaded: Option<usize>,
}

impl HealthStatus {
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            places_loaded: None,
            nodes_loaded: None,
            edges_loaded: None,
        }
    }

    pub fn ready(service: &str, version: &str, places: usize, nodes: usize, edges: usize) -> Self {
        Self {
            places_loaded: Some(places),
            nodes_loaded: Some(nodes),
            edges_loaded: Some(edges),
            ..Self::alive(service, version)
        }
    }

    pub fn not_ready(service: &str, version: &str, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {reason}"),
            ..Self::alive(service, version)
        }
    }
}

/// Liveness probe: 200 whenever the process is serving.
pub async fn health_live() -> impl IntoResponse {
    let status = HealthStatus::alive(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    (StatusCode::OK, Json(status))
}

/// Readiness probe: 200 once places and road nodes are loaded, 503 otherwise.
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let service = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    let places = state.places_loaded();
    let nodes = state.nodes_loaded();
    if places == 0 || nodes == 0 {
        let reason = if places == 0 {
            "no places loaded"
        } else {
            "no road nodes loaded"
        };
        let status = HealthStatus::not_ready(service, version, reason);
        return (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response();
    }

    let status = HealthStatus::ready(service, version, places, nodes, state.edges_loaded());
    (StatusCode::OK, Json(status)).into_response()
}
