//! Route planning over a loaded road network.
//!
//! This module provides:
//! - [`RouteAlgorithm`] - supported search algorithms (Dijkstra, A*)
//! - [`PlannerConfig`] and [`SpeedProfile`] - planner tunables
//! - [`RoutePlanner`] - snaps waypoints, searches each leg and assembles a [`Route`]
//!
//! Searches are delegated to a [`PathStrategy`] picked from the configured
//! algorithm. Routes borrow edges from the graph, so a route never outlives
//! the network it was planned on.

mod strategy;

pub use strategy::{select_strategy, AStarStrategy, DijkstraStrategy, PathStrategy};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::Coordinate;
use crate::network::{EdgeId, NetworkEdge, NodeId, RoadClass, RoadNetworkGraph};

/// Supported routing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteAlgorithm {
    /// Dijkstra's algorithm.
    Dijkstra,
    /// A* search guided by straight-line distance.
    #[default]
    #[serde(rename = "a-star", alias = "astar", alias = "a_star")]
    AStar,
}

impl fmt::Display for RouteAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RouteAlgorithm::Dijkstra => "dijkstra",
            RouteAlgorithm::AStar => "a-star",
        };
        f.write_str(value)
    }
}

impl FromStr for RouteAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(RouteAlgorithm::Dijkstra),
            "a-star" | "astar" | "a_star" | "a*" => Ok(RouteAlgorithm::AStar),
            other => Err(format!("unknown routing algorithm '{other}'")),
        }
    }
}

/// Default travel speeds per road class, in km/h. An edge's own
/// `max_speed_kmh` takes precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedProfile {
    pub motorway: f64,
    pub trunk: f64,
    pub primary: f64,
    pub secondary: f64,
    pub tertiary: f64,
    pub residential: f64,
    pub service: f64,
    pub unclassified: f64,
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self {
            motorway: 100.0,
            trunk: 80.0,
            primary: 65.0,
            secondary: 55.0,
            tertiary: 45.0,
            residential: 30.0,
            service: 20.0,
            unclassified: 40.0,
        }
    }
}

impl SpeedProfile {
    /// Lowest speed used for travel time, in km/h.
    const MIN_SPEED_KMH: f64 = 1.0;

    pub fn class_speed_kmh(&self, road_class: RoadClass) -> f64 {
        match road_class {
            RoadClass::Motorway => self.motorway,
            RoadClass::Trunk => self.trunk,
            RoadClass::Primary => self.primary,
            RoadClass::Secondary => self.secondary,
            RoadClass::Tertiary => self.tertiary,
            RoadClass::Residential => self.residential,
            RoadClass::Service => self.service,
            RoadClass::Unclassified => self.unclassified,
        }
    }

    /// Speed used for an edge.
    pub fn edge_speed_kmh(&self, edge: &NetworkEdge) -> f64 {
        let speed = edge
            .max_speed_kmh
            .unwrap_or_else(|| self.class_speed_kmh(edge.road_class));
        if speed.is_finite() {
            speed.max(Self::MIN_SPEED_KMH)
        } else {
            Self::MIN_SPEED_KMH
        }
    }

    /// Estimated seconds to traverse an edge.
    pub fn traversal_seconds(&self, edge: &NetworkEdge) -> f64 {
        edge.length_meters / (self.edge_speed_kmh(edge) / 3.6)
    }
}

/// Planner tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub algorithm: RouteAlgorithm,
    /// Waypoints farther than this from every node cannot be routed.
    pub max_snap_distance_meters: Option<f64>,
    pub speed_profile: SpeedProfile,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            algorithm: RouteAlgorithm::default(),
            max_snap_distance_meters: None,
            speed_profile: SpeedProfile::default(),
        }
    }
}

/// A waypoint and the network node it was snapped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnappedWaypoint {
    pub input: Coordinate,
    pub node: NodeId,
    pub node_coordinate: Coordinate,
    pub snap_distance_meters: f64,
}

/// One traversed edge of a route, with running totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteSegment<'g> {
    pub edge: &'g NetworkEdge,
    /// Node the edge is entered from.
    pub from: NodeId,
    /// Node the edge is left at.
    pub to: NodeId,
    pub start: Coordinate,
    pub end: Coordinate,
    /// Index of the leg the segment belongs to.
    pub leg: usize,
    pub estimated_seconds: f64,
    pub cumulative_distance: f64,
    pub cumulative_seconds: f64,
}

/// The part of a route between two consecutive waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteLeg {
    pub index: usize,
    pub from: NodeId,
    pub to: NodeId,
    /// Index of the first segment of this leg in [`Route::segments`].
    pub first_segment: usize,
    pub segment_count: usize,
    pub distance_meters: f64,
    pub estimated_seconds: f64,
}

/// A planned route through every waypoint, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route<'g> {
    pub algorithm: RouteAlgorithm,
    pub waypoints: Vec<Coordinate>,
    pub snapped: Vec<SnappedWaypoint>,
    /// Nodes visited, starting at the first snapped node.
    pub nodes: Vec<NodeId>,
    pub segments: Vec<RouteSegment<'g>>,
    pub legs: Vec<RouteLeg>,
    pub total_distance_meters: f64,
    pub total_estimated_seconds: f64,
}

impl Route<'_> {
    /// Edge ids in traversal order.
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.segments.iter().map(|segment| segment.edge.id).collect()
    }

    /// Segments of one leg.
    pub fn leg_segments(&self, leg: &RouteLeg) -> &[RouteSegment<'_>] {
        &self.segments[leg.first_segment..leg.first_segment + leg.segment_count]
    }
}

/// Plans routes over a borrowed network.
pub struct RoutePlanner<'g> {
    graph: &'g RoadNetworkGraph,
    config: PlannerConfig,
    strategy: Box<dyn PathStrategy>,
}

impl<'g> RoutePlanner<'g> {
    pub fn new(graph: &'g RoadNetworkGraph, config: PlannerConfig) -> Self {
        let strategy = select_strategy(config.algorithm);
        Self {
            graph,
            config,
            strategy,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan a route through `waypoints` in order.
    ///
    /// Each waypoint snaps to its nearest node and each consecutive pair is
    /// searched independently; legs are concatenated into one route.
    pub fn plan(&self, waypoints: &[Coordinate]) -> Result<Route<'g>> {
        if waypoints.len() < 2 {
            return Err(Error::InvalidWaypoints {
                count: waypoints.len(),
            });
        }

        let snapped = waypoints
            .iter()
            .map(|waypoint| self.snap(waypoint))
            .collect::<Result<Vec<_>>>()?;

        let mut nodes = vec![snapped[0].node];
        let mut segments: Vec<RouteSegment<'g>> = Vec::new();
        let mut legs = Vec::with_capacity(snapped.len() - 1);
        let mut total_distance = 0.0;
        let mut total_seconds = 0.0;

        for (index, pair) in snapped.windows(2).enumerate() {
            let (from, to) = (pair[0].node, pair[1].node);
            let path = self
                .strategy
                .find_path(self.graph, from, to)
                .ok_or(Error::Unreachable {
                    leg: index,
                    from,
                    to,
                })?;

            let first_segment = segments.len();
            let mut leg_distance = 0.0;
            let mut leg_seconds = 0.0;
            for step in &path.steps {
                let seconds = self.config.speed_profile.traversal_seconds(step.edge);
                leg_distance += step.edge.length_meters;
                leg_seconds += seconds;
                total_distance += step.edge.length_meters;
                total_seconds += seconds;
                segments.push(RouteSegment {
                    edge: step.edge,
                    from: step.from,
                    to: step.to,
                    start: step.start,
                    end: step.end,
                    leg: index,
                    estimated_seconds: seconds,
                    cumulative_distance: total_distance,
                    cumulative_seconds: total_seconds,
                });
                nodes.push(step.to);
            }

            debug!(
                leg = index,
                from,
                to,
                edges = path.steps.len(),
                expanded = path.expanded,
                distance_m = leg_distance,
                "planned leg"
            );

            legs.push(RouteLeg {
                index,
                from,
                to,
                first_segment,
                segment_count: path.steps.len(),
                distance_meters: leg_distance,
                estimated_seconds: leg_seconds,
            });
        }

        debug!(
            algorithm = %self.strategy.algorithm(),
            waypoints = waypoints.len(),
            segments = segments.len(),
            distance_m = total_distance,
            "route planned"
        );

        Ok(Route {
            algorithm: self.strategy.algorithm(),
            waypoints: waypoints.to_vec(),
            snapped,
            nodes,
            segments,
            legs,
            total_distance_meters: total_distance,
            total_estimated_seconds: total_seconds,
        })
    }

    fn snap(&self, waypoint: &Coordinate) -> Result<SnappedWaypoint> {
        if !waypoint.is_valid() {
            return Err(Error::InvalidCoordinate {
                latitude: waypoint.latitude,
                longitude: waypoint.longitude,
            });
        }

        let (node, distance) = self.graph.nearest_node_with_distance(waypoint)?;
        if let Some(limit) = self.config.max_snap_distance_meters {
            if distance > limit {
                debug!(
                    %waypoint,
                    nearest = node.id,
                    distance_m = distance,
                    limit_m = limit,
                    "waypoint beyond snap distance"
                );
                return Err(Error::NoReachablePoint {
                    latitude: waypoint.latitude,
                    longitude: waypoint.longitude,
                });
            }
        }

        Ok(SnappedWaypoint {
            input: *waypoint,
            node: node.id,
            node_coordinate: node.coordinate,
            snap_distance_meters: distance,
        })
    }
}

impl fmt::Debug for RoutePlanner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutePlanner")
            .field("algorithm", &self.strategy.algorithm())
            .field("config", &self.config)
            .finish()
    }
}
