//! localroute library entry points.
//!
//! This crate loads a place gazetteer and a road network into memory,
//! resolves free-text addresses against the gazetteer and plans routes over
//! the network. [`RouteService`] ties the pieces together; the CLI and the
//! HTTP service should only depend on what is exported here instead of
//! reimplementing behavior.
//!
//! All loaded data is immutable after construction and can be shared across
//! threads behind an `Arc`.

#![deny(warnings)]

pub mod error;
pub mod gazetteer;
pub mod geo;
pub mod geocode;
pub mod guidance;
pub mod network;
pub mod path;
pub mod routing;
pub mod service;
pub mod spatial;
pub mod text;
pub mod trip;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{Error, Result};
pub use gazetteer::{GazetteerStore, PlaceId, PlaceInput, PlaceKind, PlaceRecord};
pub use geo::Coordinate;
pub use geocode::{GeocodeCandidate, GeocodingResolver, ScoringConfig};
pub use guidance::{build_steps, Maneuver, RouteStep};
pub use network::{
    EdgeId, NetworkData, NetworkEdge, NetworkNode, NodeId, RoadClass, RoadNetworkGraph,
};
pub use path::{find_path, Heuristic, PathResult, PathStep};
pub use routing::{
    PlannerConfig, Route, RouteAlgorithm, RouteLeg, RoutePlanner, RouteSegment, SnappedWaypoint,
    SpeedProfile,
};
pub use service::{
    AlternativeMatch, PlannedRoute, PlannedTrip, ResolvedAddress, RouteService, ServiceConfig,
    TripStops,
};
pub use spatial::{spatial_index_path, try_load_spatial_index, SpatialIndex};
pub use text::normalize;
pub use trip::{
    plan_trip, DailySchedule, DutyStatus, LogEntry, StopKind, TripLabels, TripPlan, TripRules,
    TripStop,
};
