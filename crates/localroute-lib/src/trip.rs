//! Hours-of-service trip scheduling on top of a planned route.
//!
//! Given a route's distance and driving time, lays out pickup, fuel, rest and
//! dropoff stops and a per-day driving schedule with duty-status log entries.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::routing::Route;

/// Miles per metre.
pub const MILES_PER_METER: f64 = 0.000621371;

/// Driving and duty rules applied when scheduling a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripRules {
    /// Maximum driving hours per day and between rest stops.
    pub driving_hours_limit: f64,
    /// Length of a rest stop, in hours.
    pub off_duty_hours: f64,
    /// Distance between fuel stops, in miles.
    pub fuel_stop_miles: f64,
    /// Length of a fuel stop, in hours.
    pub fuel_stop_hours: f64,
    /// Speed used to place rest stops along the route, in mph.
    pub average_speed_mph: f64,
    /// On-duty, not-driving time added to each day, in hours.
    pub daily_on_duty_break_hours: f64,
    /// Off-duty hours recorded for each scheduled day.
    pub daily_off_duty_hours: f64,
    /// Length of the break logged after driving, in hours.
    pub log_break_hours: f64,
    /// Upper bound on scheduled days.
    pub max_days: u32,
    /// Hour of day (0-24) at which driving starts.
    pub day_start_hour: f64,
}

impl Default for TripRules {
    fn default() -> Self {
        Self {
            driving_hours_limit: 11.0,
            off_duty_hours: 10.0,
            fuel_stop_miles: 1000.0,
            fuel_stop_hours: 0.5,
            average_speed_mph: 50.0,
            daily_on_duty_break_hours: 1.0,
            daily_off_duty_hours: 13.0,
            log_break_hours: 0.5,
            max_days: 30,
            day_start_hour: 8.0,
        }
    }
}

impl TripRules {
    /// Reject rules that would produce a meaningless schedule.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("driving_hours_limit", self.driving_hours_limit),
            ("fuel_stop_miles", self.fuel_stop_miles),
            ("average_speed_mph", self.average_speed_mph),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{name} must be positive, got {value}")));
            }
        }

        let non_negative = [
            ("off_duty_hours", self.off_duty_hours),
            ("fuel_stop_hours", self.fuel_stop_hours),
            ("daily_on_duty_break_hours", self.daily_on_duty_break_hours),
            ("daily_off_duty_hours", self.daily_off_duty_hours),
            ("log_break_hours", self.log_break_hours),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must not be negative, got {value}")));
            }
        }

        if self.max_days == 0 {
            return Err(invalid("max_days must be at least 1".to_string()));
        }
        if !(0.0..24.0).contains(&self.day_start_hour) {
            return Err(invalid(format!(
                "day_start_hour must be within [0, 24), got {}",
                self.day_start_hour
            )));
        }
        Ok(())
    }
}

/// Human-readable names of the trip's stops.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TripLabels {
    pub current_location: String,
    pub pickup_location: String,
    pub dropoff_location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    Pickup,
    Fuel,
    Rest,
    Dropoff,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripStop {
    pub kind: StopKind,
    pub location: String,
    pub mile_marker: f64,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyStatus {
    OffDuty,
    Driving,
    OnDuty,
    Break,
}

/// A span of one day's duty log, in fractional hours since midnight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub start_hour: f64,
    pub end_hour: f64,
    pub status: DutyStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySchedule {
    pub day_number: u32,
    pub driving_hours: f64,
    pub on_duty_hours: f64,
    pub off_duty_hours: f64,
    pub notes: String,
    pub log_entries: Vec<LogEntry>,
}

/// Full trip schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripPlan {
    #[serde(flatten)]
    pub labels: TripLabels,
    pub current_cycle_hours: f64,
    pub total_distance_miles: f64,
    pub total_drive_hours: f64,
    pub estimated_days: u32,
    pub stops: Vec<TripStop>,
    pub daily_schedules: Vec<DailySchedule>,
}

/// Schedule a trip along `route`.
pub fn plan_trip(
    route: &Route<'_>,
    labels: TripLabels,
    current_cycle_hours: f64,
    rules: &TripRules,
) -> Result<TripPlan> {
    rules.validate()?;
    if !current_cycle_hours.is_finite() || current_cycle_hours < 0.0 {
        return Err(invalid(format!(
            "current_cycle_hours must be a non-negative number, got {current_cycle_hours}"
        )));
    }

    let miles = route.total_distance_meters * MILES_PER_METER;
    let hours = route.total_estimated_seconds / 3600.0;
    let estimated_days = ((hours / rules.driving_hours_limit).floor() as u32).max(1);

    let mut stops = vec![TripStop {
        kind: StopKind::Pickup,
        location: labels.pickup_location.clone(),
        mile_marker: 0.0,
        duration_hours: 0.0,
    }];

    let fuel_stops = (miles / rules.fuel_stop_miles).floor() as u32;
    for i in 1..=fuel_stops {
        stops.push(TripStop {
            kind: StopKind::Fuel,
            location: format!("Fuel Stop {i}"),
            mile_marker: round2((f64::from(i) * rules.fuel_stop_miles).min(miles)),
            duration_hours: rules.fuel_stop_hours,
        });
    }

    let rest_stops = (hours / rules.driving_hours_limit).floor() as u32;
    for i in 1..=rest_stops {
        let marker = f64::from(i) * rules.driving_hours_limit * rules.average_speed_mph;
        stops.push(TripStop {
            kind: StopKind::Rest,
            location: format!("Rest Stop {i}"),
            mile_marker: round2(marker.min(miles)),
            duration_hours: rules.off_duty_hours,
        });
    }

    stops.push(TripStop {
        kind: StopKind::Dropoff,
        location: labels.dropoff_location.clone(),
        mile_marker: round2(miles),
        duration_hours: 0.0,
    });

    let daily_schedules = daily_schedules(hours, rules);

    debug!(
        miles,
        hours,
        stops = stops.len(),
        days = daily_schedules.len(),
        "trip scheduled"
    );

    Ok(TripPlan {
        labels,
        current_cycle_hours,
        total_distance_miles: round2(miles),
        total_drive_hours: round2(hours),
        estimated_days,
        stops,
        daily_schedules,
    })
}

fn daily_schedules(total_hours: f64, rules: &TripRules) -> Vec<DailySchedule> {
    let mut schedules = Vec::new();
    let mut remaining = total_hours;
    let mut day = 1u32;

    while remaining > 1e-9 && day <= rules.max_days {
        let driving = remaining.min(rules.driving_hours_limit);
        let on_duty = driving + rules.daily_on_duty_break_hours;
        schedules.push(DailySchedule {
            day_number: day,
            driving_hours: round2(driving),
            on_duty_hours: round2(on_duty),
            off_duty_hours: rules.daily_off_duty_hours,
            notes: format!("Day {day} schedule"),
            log_entries: log_entries(driving, on_duty, rules),
        });
        remaining -= driving;
        day += 1;
    }

    schedules
}

fn log_entries(driving: f64, on_duty: f64, rules: &TripRules) -> Vec<LogEntry> {
    let mut entries = Vec::new();
    let mut hour = rules.day_start_hour;

    if driving > 0.0 {
        entries.push(LogEntry {
            start_hour: round2(hour),
            end_hour: round2(hour + driving),
            status: DutyStatus::Driving,
        });
        hour += driving;
    }
    if on_duty > driving && rules.log_break_hours > 0.0 {
        entries.push(LogEntry {
            start_hour: round2(hour),
            end_hour: round2(hour + rules.log_break_hours),
            status: DutyStatus::Break,
        });
        hour += rules.log_break_hours;
    }
    if hour < 24.0 {
        entries.push(LogEntry {
            start_hour: round2(hour),
            end_hour: 24.0,
            status: DutyStatus::OffDuty,
        });
    }
    entries
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn invalid(message: String) -> Error {
    Error::InvalidTripParameters { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteAlgorithm;

    fn route(meters: f64, seconds: f64) -> Route<'static> {
        Route {
            algorithm: RouteAlgorithm::AStar,
            waypoints: Vec::new(),
            snapped: Vec::new(),
            nodes: Vec::new(),
            segments: Vec::new(),
            legs: Vec::new(),
            total_distance_meters: meters,
            total_estimated_seconds: seconds,
        }
    }

    fn labels() -> TripLabels {
        TripLabels {
            current_location: "Depot".into(),
            pickup_location: "Warehouse".into(),
            dropoff_location: "Store".into(),
        }
    }

    #[test]
    fn long_trip_gets_fuel_and_rest_stops() {
        // About 1243 miles over 25 hours.
        let plan = plan_trip(
            &route(2_000_000.0, 25.0 * 3600.0),
            labels(),
            10.0,
            &TripRules::default(),
        )
        .expect("valid trip");

        assert_eq!(plan.total_distance_miles, 1242.74);
        assert_eq!(plan.total_drive_hours, 25.0);
        assert_eq!(plan.estimated_days, 2);

        let kinds: Vec<StopKind> = plan.stops.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StopKind::Pickup,
                StopKind::Fuel,
                StopKind::Rest,
                StopKind::Rest,
                StopKind::Dropoff
            ]
        );
        assert_eq!(plan.stops[0].location, "Warehouse");
        assert_eq!(plan.stops[1].mile_marker, 1000.0);
        assert_eq!(plan.stops[2].mile_marker, 550.0);
        assert_eq!(plan.stops[3].mile_marker, 1100.0);
        assert_eq!(plan.stops[4].mile_marker, 1242.74);

        let driving: Vec<f64> = plan.daily_schedules.iter().map(|d| d.driving_hours).collect();
        assert_eq!(driving, vec![11.0, 11.0, 3.0]);
        assert_eq!(plan.daily_schedules[2].on_duty_hours, 4.0);
    }

    #[test]
    fn short_trip_is_one_day_with_full_log() {
        let plan = plan_trip(&route(16_093.4, 1800.0), labels(), 0.0, &TripRules::default())
            .expect("valid trip");
        assert_eq!(plan.estimated_days, 1);
        assert_eq!(plan.stops.len(), 2);

        let day = &plan.daily_schedules[0];
        assert_eq!(day.driving_hours, 0.5);
        let statuses: Vec<DutyStatus> = day.log_entries.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![DutyStatus::Driving, DutyStatus::Break, DutyStatus::OffDuty]
        );
        assert_eq!(day.log_entries[0].start_hour, 8.0);
        assert_eq!(day.log_entries[1].start_hour, 8.5);
        assert_eq!(day.log_entries[2].start_hour, 9.0);
        assert_eq!(day.log_entries[2].end_hour, 24.0);
    }

    #[test]
    fn zero_length_trip_has_no_driving_days() {
        let plan = plan_trip(&route(0.0, 0.0), labels(), 0.0, &TripRules::default()).unwrap();
        assert_eq!(plan.estimated_days, 1);
        assert!(plan.daily_schedules.is_empty());
        assert_eq!(plan.stops.len(), 2);
    }

    #[test]
    fn schedule_is_capped_at_max_days() {
        let rules = TripRules {
            max_days: 3,
            ..TripRules::default()
        };
        let plan = plan_trip(&route(10_000_000.0, 100.0 * 3600.0), labels(), 0.0, &rules).unwrap();
        assert_eq!(plan.daily_schedules.len(), 3);
    }

    #[test]
    fn rejects_bad_parameters() {
        let r = route(1000.0, 60.0);
        assert!(matches!(
            plan_trip(&r, labels(), -1.0, &TripRules::default()),
            Err(Error::InvalidTripParameters { .. })
        ));
        assert!(plan_trip(&r, labels(), f64::NAN, &TripRules::default()).is_err());

        let rules = TripRules {
            fuel_stop_miles: 0.0,
            ..TripRules::default()
        };
        let err = plan_trip(&r, labels(), 0.0, &rules).unwrap_err();
        assert!(err.to_string().contains("fuel_stop_miles"));
    }
}
