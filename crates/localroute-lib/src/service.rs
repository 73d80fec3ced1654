//! Orchestration: free-text addresses in, planned route out.
//!
//! [`RouteService`] owns shared handles to the gazetteer and the road network
//! and wires the resolver, the planner, step guidance and trip scheduling
//! together. It holds no mutable state, so one instance serves every caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::gazetteer::{GazetteerStore, PlaceRecord};
use crate::geo::Coordinate;
use crate::geocode::{GeocodeCandidate, GeocodingResolver, ScoringConfig};
use crate::guidance::{build_steps, RouteStep};
use crate::network::RoadNetworkGraph;
use crate::routing::{PlannerConfig, Route, RouteAlgorithm, RoutePlanner};
use crate::text::normalize;
use crate::trip::{plan_trip, TripLabels, TripPlan, TripRules};

/// Settings for [`RouteService`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub scoring: ScoringConfig,
    pub planner: PlannerConfig,
    pub trip_rules: TripRules,
    /// A runner-up within this score of the best candidate makes an address ambiguous.
    pub ambiguity_margin: f64,
    /// Candidates considered per address.
    pub max_candidates: usize,
    /// Suggestions attached to a failed address.
    pub suggestion_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            planner: PlannerConfig::default(),
            trip_rules: TripRules::default(),
            ambiguity_margin: 0.05,
            max_candidates: 5,
            suggestion_limit: 3,
        }
    }
}

/// A close runner-up for an ambiguous address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternativeMatch {
    pub place_id: String,
    pub name: String,
    pub coordinate: Coordinate,
    pub score: f64,
}

/// How one input address was resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAddress<'a> {
    pub query: String,
    pub place: &'a PlaceRecord,
    pub score: f64,
    pub matched_tokens: Vec<String>,
    pub ambiguous: bool,
    pub alternatives: Vec<AlternativeMatch>,
}

/// A planned route together with how its addresses were resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRoute<'a> {
    pub route: Route<'a>,
    pub resolved: Vec<ResolvedAddress<'a>>,
    pub steps: Vec<RouteStep>,
}

impl PlannedRoute<'_> {
    /// True when any address had a close runner-up.
    pub fn is_ambiguous(&self) -> bool {
        self.resolved.iter().any(|address| address.ambiguous)
    }
}

/// Ordered stops of a named trip. Missing optional stops are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TripStops {
    pub origin: String,
    #[serde(default)]
    pub pickup: Option<String>,
    #[serde(default)]
    pub dropoff: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
}

impl TripStops {
    /// Addresses in travel order.
    pub fn addresses(&self) -> Vec<&str> {
        std::iter::once(self.origin.as_str())
            .chain(self.pickup.as_deref())
            .chain(self.dropoff.as_deref())
            .chain(self.destination.as_deref())
            .collect()
    }
}

/// A route plus its hours-of-service schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedTrip<'a> {
    pub planned: PlannedRoute<'a>,
    pub trip: TripPlan,
}

/// Address-to-route orchestrator.
#[derive(Debug, Clone)]
pub struct RouteService {
    gazetteer: Arc<GazetteerStore>,
    network: Arc<RoadNetworkGraph>,
    config: ServiceConfig,
}

impl RouteService {
    pub fn new(
        gazetteer: Arc<GazetteerStore>,
        network: Arc<RoadNetworkGraph>,
        config: ServiceConfig,
    ) -> Self {
        info!(
            places = gazetteer.len(),
            nodes = network.node_count(),
            edges = network.edge_count(),
            algorithm = %config.planner.algorithm,
            "route service ready"
        );
        Self {
            gazetteer,
            network,
            config,
        }
    }

    pub fn gazetteer(&self) -> &GazetteerStore {
        &self.gazetteer
    }

    pub fn network(&self) -> &RoadNetworkGraph {
        &self.network
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn resolver(&self) -> GeocodingResolver<'_> {
        GeocodingResolver::new(&self.gazetteer, self.config.scoring.clone())
    }

    /// Ranked candidates for one query.
    pub fn geocode(&self, query: &str, limit: usize) -> Result<Vec<GeocodeCandidate<'_>>> {
        self.resolver().resolve(query, limit)
    }

    /// Resolve every address in order and plan a route through them with
    /// the configured algorithm.
    pub fn plan_route<S: AsRef<str>>(&self, addresses: &[S]) -> Result<PlannedRoute<'_>> {
        self.plan_route_with(addresses, self.config.planner.algorithm)
    }

    /// Like [`plan_route`](Self::plan_route) with an explicit algorithm.
    pub fn plan_route_with<S: AsRef<str>>(
        &self,
        addresses: &[S],
        algorithm: RouteAlgorithm,
    ) -> Result<PlannedRoute<'_>> {
        let resolver = self.resolver();
        let mut resolved = Vec::with_capacity(addresses.len());
        for address in addresses {
            resolved.push(self.resolve_address(&resolver, address.as_ref())?);
        }

        let waypoints: Vec<Coordinate> = resolved
            .iter()
            .map(|address| address.place.coordinate)
            .collect();
        let planner = RoutePlanner::new(
            &self.network,
            PlannerConfig {
                algorithm,
                ..self.config.planner.clone()
            },
        );
        let route = planner.plan(&waypoints)?;
        let steps = build_steps(&route);

        debug!(
            addresses = addresses.len(),
            ambiguous = resolved.iter().filter(|a| a.ambiguous).count(),
            distance_m = route.total_distance_meters,
            "planned route from addresses"
        );

        Ok(PlannedRoute {
            route,
            resolved,
            steps,
        })
    }

    /// Plan through origin, optional pickup, optional dropoff and optional destination.
    pub fn plan_named(&self, stops: &TripStops) -> Result<PlannedRoute<'_>> {
        self.plan_route(&stops.addresses())
    }

    /// Plan current location -> pickup -> dropoff and schedule the drive.
    pub fn plan_trip(
        &self,
        labels: TripLabels,
        current_cycle_hours: f64,
    ) -> Result<PlannedTrip<'_>> {
        // Validate before doing any geocoding or routing work.
        self.config.trip_rules.validate()?;
        if !current_cycle_hours.is_finite() || current_cycle_hours < 0.0 {
            return Err(Error::InvalidTripParameters {
                message: format!(
                    "current_cycle_hours must be a non-negative number, got {current_cycle_hours}"
                ),
            });
        }

        let planned = self.plan_route(&[
            labels.current_location.as_str(),
            labels.pickup_location.as_str(),
            labels.dropoff_location.as_str(),
        ])?;
        let trip = plan_trip(
            &planned.route,
            labels,
            current_cycle_hours,
            &self.config.trip_rules,
        )?;
        Ok(PlannedTrip { planned, trip })
    }

    fn resolve_address<'a>(
        &'a self,
        resolver: &GeocodingResolver<'a>,
        address: &str,
    ) -> Result<ResolvedAddress<'a>> {
        let mut candidates = resolver
            .resolve(address, self.config.max_candidates.max(1))?
            .into_iter();
        let Some(best) = candidates.next() else {
            return Err(Error::GeocodingFailed {
                address: address.to_string(),
                suggestions: resolver.suggest(address, self.config.suggestion_limit),
            });
        };

        // An exact name match is only ambiguous against other exact matches.
        let exact = normalize(address) == best.place.normalized_name;
        let alternatives: Vec<AlternativeMatch> = candidates
            .take_while(|candidate| best.score - candidate.score <= self.config.ambiguity_margin)
            .filter(|candidate| {
                !exact || candidate.place.normalized_name == best.place.normalized_name
            })
            .map(|candidate| AlternativeMatch {
                place_id: candidate.place.id.clone(),
                name: candidate.place.raw_name.clone(),
                coordinate: candidate.place.coordinate,
                score: candidate.score,
            })
            .collect();
        let ambiguous = !alternatives.is_empty();
        if ambiguous {
            debug!(
                address,
                chosen = %best.place.id,
                alternatives = alternatives.len(),
                "ambiguous address"
            );
        }

        Ok(ResolvedAddress {
            query: address.to_string(),
            place: best.place,
            score: best.score,
            matched_tokens: best.matched_tokens,
            ambiguous,
            alternatives,
        })
    }
}
