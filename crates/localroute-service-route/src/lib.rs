//! localroute HTTP service.
//!
//! # Endpoints
//!
//! - `POST /api/v1/route` - resolve addresses and plan a route through them
//! - `POST /api/v1/geocode` - ranked gazetteer matches for one query
//! - `POST /api/v1/trip` - route plus hours-of-service schedule
//! - `GET /metrics` - Prometheus metrics
//! - `GET /health/live`, `GET /health/ready` - probes

#![deny(warnings)]

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use localroute_lib::{
    AlternativeMatch, Coordinate, DailySchedule, EdgeId, Error as LibError, GeocodeCandidate,
    NodeId, PlaceKind, PlannedRoute, RouteLeg, RouteStep, TripLabels, TripStop,
};
use localroute_service_shared::{
    from_lib_error, health_live, health_ready, metrics_handler, record_ambiguous_addresses,
    record_geocode_query, record_route_distance, record_route_failed, record_route_planned,
    record_trip_planned, track_requests, AppState, GeocodeRequest, ProblemDetails, RequestId,
    RouteRequest, ServiceResponse, TripRequest, Validate,
};

type ApiResult<T> = Result<ServiceResponse<T>, ProblemDetails>;

/// Build the service router over `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/route", post(route_handler))
        .route("/api/v1/geocode", post(geocode_handler))
        .route("/api/v1/trip", post(trip_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_requests))
        .with_state(state)
}

/// How one address was resolved.
#[derive(Debug, Serialize)]
pub struct ResolvedDto {
    pub query: String,
    pub place_id: String,
    pub name: String,
    pub coordinate: Coordinate,
    pub score: f64,
    pub ambiguous: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<AlternativeMatch>,
    pub snapped_node: NodeId,
    pub snap_distance_meters: f64,
}

#[derive(Debug, Serialize)]
pub struct SegmentDto {
    pub edge_id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub road_class: String,
    pub leg: usize,
    pub length_meters: f64,
    pub estimated_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub algorithm: String,
    pub total_distance_meters: f64,
    pub total_estimated_seconds: f64,
    pub ambiguous: bool,
    pub waypoints: Vec<ResolvedDto>,
    pub nodes: Vec<NodeId>,
    pub segments: Vec<SegmentDto>,
    pub legs: Vec<RouteLeg>,
    pub steps: Vec<RouteStep>,
}

impl From<&PlannedRoute<'_>> for RouteResponse {
    fn from(planned: &PlannedRoute<'_>) -> Self {
        let route = &planned.route;
        let waypoints = planned
            .resolved
            .iter()
            .zip(&route.snapped)
            .map(|(address, snapped)| ResolvedDto {
                query: address.query.clone(),
                place_id: address.place.id.clone(),
                name: address.place.raw_name.clone(),
                coordinate: address.place.coordinate,
                score: address.score,
                ambiguous: address.ambiguous,
                alternatives: address.alternatives.clone(),
                snapped_node: snapped.node,
                snap_distance_meters: snapped.snap_distance_meters,
            })
            .collect();
        let segments = route
            .segments
            .iter()
            .map(|segment| SegmentDto {
                edge_id: segment.edge.id,
                from: segment.from,
                to: segment.to,
                name: segment.edge.name.clone(),
                road_class: segment.edge.road_class.to_string(),
                leg: segment.leg,
                length_meters: segment.edge.length_meters,
                estimated_seconds: segment.estimated_seconds,
            })
            .collect();

        Self {
            algorithm: route.algorithm.to_string(),
            total_distance_meters: route.total_distance_meters,
            total_estimated_seconds: route.total_estimated_seconds,
            ambiguous: planned.is_ambiguous(),
            waypoints,
            nodes: route.nodes.clone(),
            segments,
            legs: route.legs.clone(),
            steps: planned.steps.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CandidateDto {
    pub place_id: String,
    pub name: String,
    pub kind: PlaceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub coordinate: Coordinate,
    pub score: f64,
    pub matched_tokens: Vec<String>,
}

impl From<GeocodeCandidate<'_>> for CandidateDto {
    fn from(candidate: GeocodeCandidate<'_>) -> Self {
        Self {
            place_id: candidate.place.id.clone(),
            name: candidate.place.raw_name.clone(),
            kind: candidate.place.kind,
            region: candidate.place.region.clone(),
            coordinate: candidate.place.coordinate,
            score: candidate.score,
            matched_tokens: candidate.matched_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GeocodeResponse {
    pub query: String,
    pub candidates: Vec<CandidateDto>,
}

#[derive(Debug, Serialize)]
pub struct TripResponse {
    pub current_location: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub current_cycle_hours: f64,
    pub total_distance_meters: f64,
    pub total_distance_miles: f64,
    pub total_drive_hours: f64,
    pub estimated_days: u32,
    pub ambiguous: bool,
    pub stops: Vec<TripStop>,
    pub daily_schedules: Vec<DailySchedule>,
    pub steps: Vec<RouteStep>,
}

fn rejected(rejection: JsonRejection, request_id: &RequestId) -> ProblemDetails {
    ProblemDetails::bad_request(rejection.body_text(), request_id.as_str())
}

fn failed(error: &LibError, request_id: &RequestId) -> ProblemDetails {
    if error.is_client_error() {
        info!(request_id = %request_id, error = %error, "request rejected");
    } else {
        warn!(request_id = %request_id, error = %error, "request failed");
    }
    from_lib_error(error, request_id.as_str())
}

/// `POST /api/v1/route`
async fn route_handler(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> ApiResult<RouteResponse> {
    let Json(request) = payload.map_err(|e| {
        record_route_failed("invalid_request");
        rejected(e, &request_id)
    })?;
    if let Err(problem) = request.validate(request_id.as_str()) {
        record_route_failed("invalid_request");
        return Err(*problem);
    }

    let service = state.service();
    let algorithm = request
        .algorithm
        .unwrap_or(service.config().planner.algorithm);
    info!(
        request_id = %request_id,
        addresses = request.addresses.len(),
        algorithm = %algorithm,
        "handling route request"
    );

    let planned = service
        .plan_route_with(&request.addresses, algorithm)
        .map_err(|e| {
            record_route_failed(e.kind());
            failed(&e, &request_id)
        })?;

    let response = RouteResponse::from(&planned);
    record_route_planned(&response.algorithm);
    record_route_distance(response.total_distance_meters, &response.algorithm);
    record_ambiguous_addresses(response.waypoints.iter().filter(|w| w.ambiguous).count());
    Ok(ServiceResponse::new(response))
}

/// `POST /api/v1/geocode`
async fn geocode_handler(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<GeocodeRequest>, JsonRejection>,
) -> ApiResult<GeocodeResponse> {
    let Json(request) = payload.map_err(|e| rejected(e, &request_id))?;
    request
        .validate(request_id.as_str())
        .map_err(|problem| *problem)?;

    let candidates = state
        .service()
        .geocode(&request.query, request.limit)
        .map_err(|e| failed(&e, &request_id))?;
    record_geocode_query(!candidates.is_empty());

    Ok(ServiceResponse::new(GeocodeResponse {
        query: request.query,
        candidates: candidates.into_iter().map(CandidateDto::from).collect(),
    }))
}

/// `POST /api/v1/trip`
async fn trip_handler(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<TripRequest>, JsonRejection>,
) -> ApiResult<TripResponse> {
    let Json(request) = payload.map_err(|e| rejected(e, &request_id))?;
    request
        .validate(request_id.as_str())
        .map_err(|problem| *problem)?;

    info!(request_id = %request_id, "handling trip request");
    let labels = TripLabels {
        current_location: request.current_location,
        pickup_location: request.pickup_location,
        dropoff_location: request.dropoff_location,
    };
    let planned = state
        .service()
        .plan_trip(labels, request.current_cycle_hours)
        .map_err(|e| {
            record_route_failed(e.kind());
            failed(&e, &request_id)
        })?;

    let trip = planned.trip;
    record_trip_planned(trip.estimated_days);
    Ok(ServiceResponse::new(TripResponse {
        current_location: trip.labels.current_location,
        pickup_location: trip.labels.pickup_location,
        dropoff_location: trip.labels.dropoff_location,
        current_cycle_hours: trip.current_cycle_hours,
        total_distance_meters: planned.planned.route.total_distance_meters,
        total_distance_miles: trip.total_distance_miles,
        total_drive_hours: trip.total_drive_hours,
        estimated_days: trip.estimated_days,
        ambiguous: planned.planned.is_ambiguous(),
        stops: trip.stops,
        daily_schedules: trip.daily_schedules,
        steps: planned.planned.steps,
    }))
}
