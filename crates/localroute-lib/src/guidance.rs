//! Turn-by-turn steps derived from a planned [`Route`].
//!
//! Consecutive segments on the same road are merged into one step as long as
//! the road keeps roughly the same heading. A new step starts whenever the
//! road name changes or the heading bends by at least the slight-turn angle.

use serde::Serialize;

use crate::geo::{compass_direction, turn_angle, Coordinate};
use crate::routing::{Route, RouteSegment};

/// Turns below this angle (degrees) count as going straight.
const SLIGHT_TURN_DEGREES: f64 = 20.0;
const TURN_DEGREES: f64 = 60.0;
const SHARP_TURN_DEGREES: f64 = 120.0;
const U_TURN_DEGREES: f64 = 170.0;

/// Kind of manoeuvre that starts a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Maneuver {
    Depart,
    Continue,
    SlightLeft,
    SlightRight,
    Left,
    Right,
    SharpLeft,
    SharpRight,
    UTurn,
    Waypoint,
    Arrive,
}

impl Maneuver {
    /// Classify a signed turn angle (positive turns right).
    pub fn from_turn_angle(angle: f64) -> Self {
        let magnitude = angle.abs();
        let right = angle > 0.0;
        if magnitude < SLIGHT_TURN_DEGREES {
            Maneuver::Continue
        } else if magnitude < TURN_DEGREES {
            if right {
                Maneuver::SlightRight
            } else {
                Maneuver::SlightLeft
            }
        } else if magnitude < SHARP_TURN_DEGREES {
            if right {
                Maneuver::Right
            } else {
                Maneuver::Left
            }
        } else if magnitude < U_TURN_DEGREES {
            if right {
                Maneuver::SharpRight
            } else {
                Maneuver::SharpLeft
            }
        } else {
            Maneuver::UTurn
        }
    }
}

/// One instruction of a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStep {
    pub maneuver: Maneuver,
    pub instruction: String,
    pub road_name: Option<String>,
    /// Where the manoeuvre happens.
    pub location: Coordinate,
    /// Leg the step belongs to.
    pub leg: usize,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// Build turn-by-turn steps for a route.
///
/// The first step is always `Depart` and the last is always `Arrive`; each
/// intermediate waypoint produces a `Waypoint` step.
pub fn build_steps(route: &Route<'_>) -> Vec<RouteStep> {
    let origin = route
        .snapped
        .first()
        .map(|s| s.node_coordinate)
        .or_else(|| route.waypoints.first().copied())
        .unwrap_or(Coordinate {
            latitude: 0.0,
            longitude: 0.0,
        });
    let mut builder = StepBuilder::new(origin);

    for leg in &route.legs {
        if leg.index > 0 {
            let location = route
                .snapped
                .get(leg.index)
                .map(|s| s.node_coordinate)
                .unwrap_or(builder.location);
            builder.waypoint(leg.index, location);
        }
        for segment in route.leg_segments(leg) {
            builder.segment(segment);
        }
    }

    let destination = route
        .snapped
        .last()
        .map(|s| s.node_coordinate)
        .unwrap_or(builder.location);
    builder.finish(route.legs.len().saturating_sub(1), destination)
}

struct StepBuilder {
    steps: Vec<RouteStep>,
    current: Option<RouteStep>,
    bearing: Option<f64>,
    departed: bool,
    location: Coordinate,
}

impl StepBuilder {
    fn new(origin: Coordinate) -> Self {
        Self {
            steps: Vec::new(),
            current: None,
            bearing: None,
            departed: false,
            location: origin,
        }
    }

    fn segment(&mut self, segment: &RouteSegment<'_>) {
        let bearing = if segment.start == segment.end {
            self.bearing.unwrap_or(0.0)
        } else {
            segment.start.bearing_to(&segment.end)
        };
        let name = segment.edge.name.clone();
        let length = segment.edge.length_meters;

        if let Some(current) = self.current.as_mut() {
            let angle = self.bearing.map_or(0.0, |previous| turn_angle(previous, bearing));
            if current.road_name == name && angle.abs() < SLIGHT_TURN_DEGREES {
                current.distance_meters += length;
                current.duration_seconds += segment.estimated_seconds;
                self.bearing = Some(bearing);
                self.location = segment.end;
                return;
            }
        }

        let maneuver = if !self.departed {
            Maneuver::Depart
        } else {
            self.bearing
                .map_or(Maneuver::Continue, |previous| {
                    Maneuver::from_turn_angle(turn_angle(previous, bearing))
                })
        };
        self.flush();
        self.departed = true;
        self.current = Some(RouteStep {
            maneuver,
            instruction: instruction(maneuver, name.as_deref(), bearing),
            road_name: name,
            location: segment.start,
            leg: segment.leg,
            distance_meters: length,
            duration_seconds: segment.estimated_seconds,
        });
        self.bearing = Some(bearing);
        self.location = segment.end;
    }

    fn waypoint(&mut self, leg: usize, location: Coordinate) {
        self.ensure_departed(location);
        self.flush();
        self.steps.push(RouteStep {
            maneuver: Maneuver::Waypoint,
            instruction: format!("Arrive at waypoint {leg}"),
            road_name: None,
            location,
            leg: leg - 1,
            distance_meters: 0.0,
            duration_seconds: 0.0,
        });
        self.location = location;
    }

    fn finish(mut self, leg: usize, destination: Coordinate) -> Vec<RouteStep> {
        self.ensure_departed(destination);
        self.flush();
        self.steps.push(RouteStep {
            maneuver: Maneuver::Arrive,
            instruction: "Arrive at destination".to_string(),
            road_name: None,
            location: destination,
            leg,
            distance_meters: 0.0,
            duration_seconds: 0.0,
        });
        self.steps
    }

    /// Routes whose first leg has no segments still start with a depart step.
    fn ensure_departed(&mut self, location: Coordinate) {
        if !self.departed {
            self.departed = true;
            self.steps.push(RouteStep {
                maneuver: Maneuver::Depart,
                instruction: "Depart".to_string(),
                road_name: None,
                location: self.location,
                leg: 0,
                distance_meters: 0.0,
                duration_seconds: 0.0,
            });
            self.location = location;
        }
    }

    fn flush(&mut self) {
        if let Some(step) = self.current.take() {
            self.steps.push(step);
        }
    }
}

fn instruction(maneuver: Maneuver, road: Option<&str>, bearing: f64) -> String {
    let onto = |verb: &str| match road {
        Some(name) => format!("{verb} onto {name}"),
        None => verb.to_string(),
    };
    match maneuver {
        Maneuver::Depart => match road {
            Some(name) => format!("Head {} on {name}", compass_direction(bearing)),
            None => format!("Head {}", compass_direction(bearing)),
        },
        Maneuver::Continue => match road {
            Some(name) => format!("Continue onto {name}"),
            None => "Continue straight".to_string(),
        },
        Maneuver::SlightLeft => onto("Bear left"),
        Maneuver::SlightRight => onto("Bear right"),
        Maneuver::Left => onto("Turn left"),
        Maneuver::Right => onto("Turn right"),
        Maneuver::SharpLeft => onto("Make a sharp left"),
        Maneuver::SharpRight => onto("Make a sharp right"),
        Maneuver::UTurn => onto("Make a U-turn"),
        Maneuver::Waypoint => "Arrive at waypoint".to_string(),
        Maneuver::Arrive => "Arrive at destination".to_string(),
    }
}
