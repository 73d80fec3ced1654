//! Text and JSON rendering for CLI results.

use std::fmt::Write as _;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use localroute_lib::{GeocodeCandidate, Maneuver, PlannedRoute, PlannedTrip};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Pretty-printed JSON for any serializable result.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{meters:.0} m")
    }
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}

/// Human-readable route summary with resolved addresses and steps.
pub fn render_route_text(planned: &PlannedRoute<'_>) -> String {
    let route = &planned.route;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Route through {} addresses ({} segments; algorithm: {}):",
        planned.resolved.len(),
        route.segments.len(),
        route.algorithm
    );

    for (index, address) in planned.resolved.iter().enumerate() {
        let _ = write!(
            out,
            "  {}. {} -> {} [{}] (score {:.2})",
            index + 1,
            address.query,
            address.place.raw_name,
            address.place.coordinate,
            address.score
        );
        if address.ambiguous {
            let others: Vec<&str> = address
                .alternatives
                .iter()
                .map(|alt| alt.name.as_str())
                .collect();
            let _ = write!(out, " ambiguous, also: {}", others.join(", "));
        }
        out.push('\n');
    }

    out.push_str("\nDirections:\n");
    for step in &planned.steps {
        match step.maneuver {
            Maneuver::Waypoint | Maneuver::Arrive => {
                let _ = writeln!(out, "  * {}", step.instruction);
            }
            _ => {
                let _ = writeln!(
                    out,
                    "  - {} ({}, {})",
                    step.instruction,
                    format_distance(step.distance_meters),
                    format_duration(step.duration_seconds)
                );
            }
        }
    }

    let _ = writeln!(
        out,
        "\nTotal distance: {}",
        format_distance(route.total_distance_meters)
    );
    let _ = writeln!(
        out,
        "Estimated time: {}",
        format_duration(route.total_estimated_seconds)
    );
    out
}

/// One line per candidate, best first.
pub fn render_candidates_text(query: &str, candidates: &[GeocodeCandidate<'_>]) -> String {
    let mut out = String::new();
    if candidates.is_empty() {
        let _ = writeln!(out, "No matches for '{query}'");
        return out;
    }
    let _ = writeln!(out, "Matches for '{query}':");
    for (rank, candidate) in candidates.iter().enumerate() {
        let place = candidate.place;
        let region = place
            .region
            .as_deref()
            .map(|r| format!(", {r}"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {}. {}{} ({}) [{}] score {:.3} id {}",
            rank + 1,
            place.raw_name,
            region,
            place.kind,
            place.coordinate,
            candidate.score,
            place.id
        );
    }
    out
}

/// Trip summary: totals, stops and the daily duty schedule.
pub fn render_trip_text(planned: &PlannedTrip<'_>) -> String {
    let trip = &planned.trip;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Trip {} -> {} -> {}",
        trip.labels.current_location, trip.labels.pickup_location, trip.labels.dropoff_location
    );
    let _ = writeln!(
        out,
        "  {:.1} miles, {:.1} driving hours, {} day(s); cycle hours used: {:.1}",
        trip.total_distance_miles,
        trip.total_drive_hours,
        trip.estimated_days,
        trip.current_cycle_hours
    );

    out.push_str("\nStops:\n");
    for stop in &trip.stops {
        let _ = writeln!(
            out,
            "  - {:?} at {} (mile {:.1}, {:.2}h)",
            stop.kind, stop.location, stop.mile_marker, stop.duration_hours
        );
    }

    out.push_str("\nSchedule:\n");
    for day in &trip.daily_schedules {
        let _ = writeln!(
            out,
            "  Day {}: driving {:.2}h, on duty {:.2}h, off duty {:.2}h. {}",
            day.day_number, day.driving_hours, day.on_duty_hours, day.off_duty_hours, day.notes
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use localroute_lib::test_helpers::sample_service;
    use localroute_lib::TripLabels;

    #[test]
    fn formats_distances_and_durations() {
        assert_eq!(format_distance(500.0), "500 m");
        assert_eq!(format_distance(1500.0), "1.50 km");
        assert_eq!(format_duration(42.0), "42s");
        assert_eq!(format_duration(125.0), "2m 05s");
        assert_eq!(format_duration(3720.0), "1h 02m");
    }

    #[test]
    fn route_text_lists_addresses_and_total() {
        let service = sample_service();
        let planned = service
            .plan_route(&["123 Main St", "456 Oak Ave"])
            .expect("route");
        let text = render_route_text(&planned);
        assert!(text.contains("1. 123 Main St -> 123 Main St"));
        assert!(text.contains("Total distance: 1.50 km"));
        assert!(text.contains("Arrive at destination"));
    }

    #[test]
    fn route_text_marks_ambiguity() {
        let service = sample_service();
        let planned = service.plan_route(&["Main St", "456 Oak Ave"]).expect("route");
        assert!(render_route_text(&planned).contains("ambiguous, also:"));
    }

    #[test]
    fn empty_candidate_list_says_so() {
        assert_eq!(render_candidates_text("zzz", &[]), "No matches for 'zzz'\n");
    }

    #[test]
    fn candidates_are_ranked() {
        let service = sample_service();
        let candidates = service.geocode("main st", 2).expect("geocode");
        let text = render_candidates_text("main st", &candidates);
        assert!(text.contains("  1. "));
        assert!(text.contains("  2. "));
        assert!(text.contains("Springfield"));
    }

    #[test]
    fn trip_text_has_schedule() {
        let service = sample_service();
        let labels = TripLabels {
            current_location: "123 Main St".into(),
            pickup_location: "789 Pine Rd".into(),
            dropoff_location: "456 Oak Ave".into(),
        };
        let planned = service.plan_trip(labels, 0.0).expect("trip");
        let text = render_trip_text(&planned);
        assert!(text.contains("Day 1:"));
        assert!(text.contains("Pickup at 789 Pine Rd"));
    }

    #[test]
    fn json_is_pretty() {
        let json = render_json(&serde_json::json!({"a": 1})).expect("json");
        assert_eq!(json, "{\n  \"a\": 1\n}");
    }
}
