//! Shared infrastructure for localroute HTTP services.
//!
//! - [`AppState`]: the loaded gazetteer and road network behind one
//!   [`RouteService`](localroute_lib::RouteService)
//! - [`ServiceSettings`]: environment-driven configuration
//! - [`health`]: liveness and readiness handlers
//! - [`ProblemDetails`]: RFC 9457 error bodies
//! - [`ServiceResponse`]: wrapper for successful responses
//! - [`metrics`]: Prometheus recorder and business metric helpers
//! - [`logging`]: JSON or text tracing setup
//! - [`middleware`]: request ids and per-request metrics
//! - Request types with validation for each endpoint
//!
//! Handlers stay thin: parse, validate, call `localroute-lib`, format.
//!
//! Enable the `test-utils` feature to use [`test_utils`] from dependent crates.

#![deny(warnings)]

mod config;
mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod problem;
mod request;
mod response;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ConfigError, ServiceSettings};
pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_ambiguous_addresses, record_geocode_query,
    record_route_distance, record_route_failed, record_route_planned, record_trip_planned,
    MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, track_requests, RequestId};
pub use problem::{
    from_lib_error, ProblemDetails, PROBLEM_GEOCODING_FAILED, PROBLEM_INTERNAL_ERROR,
    PROBLEM_INVALID_REQUEST, PROBLEM_NO_REACHABLE_POINT, PROBLEM_ROUTE_NOT_FOUND,
    PROBLEM_SERVICE_UNAVAILABLE,
};
pub use request::{GeocodeRequest, RouteRequest, TripRequest, Validate};
pub use response::ServiceResponse;
pub use state::{AppState, AppStateError};
