//! Service configuration read from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `LOCALROUTE_GAZETTEER_PATH` | `/data/gazetteer.csv` |
//! | `LOCALROUTE_NETWORK_PATH` | `/data/network.db` |
//! | `SERVICE_PORT` | `8080` |
//! | `LOCALROUTE_MIN_SCORE` | library default |
//! | `LOCALROUTE_MAX_SNAP_METERS` | unlimited |
//! | `DRIVING_HOURS_LIMIT` | 11 |
//! | `OFF_DUTY_HOURS` | 10 |
//! | `FUEL_STOP_MILES` | 1000 |

use std::path::PathBuf;
use std::str::FromStr;

use localroute_lib::ServiceConfig;
use thiserror::Error;

pub const DEFAULT_GAZETTEER_PATH: &str = "/data/gazetteer.csv";
pub const DEFAULT_NETWORK_PATH: &str = "/data/network.db";
pub const DEFAULT_PORT: u16 = 8080;

/// An environment variable held a value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value '{value}' for {variable}: {reason}")]
pub struct ConfigError {
    pub variable: &'static str,
    pub value: String,
    pub reason: String,
}

/// Everything a service needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub gazetteer_path: PathBuf,
    pub network_path: PathBuf,
    pub port: u16,
    pub service: ServiceConfig,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            gazetteer_path: PathBuf::from(DEFAULT_GAZETTEER_PATH),
            network_path: PathBuf::from(DEFAULT_NETWORK_PATH),
            port: DEFAULT_PORT,
            service: ServiceConfig::default(),
        }
    }
}

impl ServiceSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the value of a variable
    /// if it is set. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(path) = get("LOCALROUTE_GAZETTEER_PATH") {
            settings.gazetteer_path = PathBuf::from(path);
        }
        if let Some(path) = get("LOCALROUTE_NETWORK_PATH") {
            settings.network_path = PathBuf::from(path);
        }
        if let Some(port) = parse(get("SERVICE_PORT"), "SERVICE_PORT")? {
            settings.port = port;
        }

        let service = &mut settings.service;
        if let Some(score) = parse::<f64>(get("LOCALROUTE_MIN_SCORE"), "LOCALROUTE_MIN_SCORE")? {
            if !(0.0..=1.0).contains(&score) {
                return Err(out_of_range("LOCALROUTE_MIN_SCORE", score, "must be between 0 and 1"));
            }
            service.scoring.min_score = score;
        }
        if let Some(meters) =
            parse::<f64>(get("LOCALROUTE_MAX_SNAP_METERS"), "LOCALROUTE_MAX_SNAP_METERS")?
        {
            if meters <= 0.0 {
                return Err(out_of_range("LOCALROUTE_MAX_SNAP_METERS", meters, "must be positive"));
            }
            service.planner.max_snap_distance_meters = Some(meters);
        }
        if let Some(hours) = parse(get("DRIVING_HOURS_LIMIT"), "DRIVING_HOURS_LIMIT")? {
            service.trip_rules.driving_hours_limit = hours;
        }
        if let Some(hours) = parse(get("OFF_DUTY_HOURS"), "OFF_DUTY_HOURS")? {
            service.trip_rules.off_duty_hours = hours;
        }
        if let Some(miles) = parse(get("FUEL_STOP_MILES"), "FUEL_STOP_MILES")? {
            service.trip_rules.fuel_stop_miles = miles;
        }

        settings
            .service
            .trip_rules
            .validate()
            .map_err(|e| ConfigError {
                variable: "DRIVING_HOURS_LIMIT/OFF_DUTY_HOURS/FUEL_STOP_MILES",
                value: String::new(),
                reason: e.to_string(),
            })?;

        Ok(settings)
    }
}

fn parse<T>(value: Option<String>, variable: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError {
                variable,
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn out_of_range(variable: &'static str, value: f64, reason: &str) -> ConfigError {
    ConfigError {
        variable,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<ServiceSettings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceSettings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let s = settings(&[]).unwrap();
        assert_eq!(s, ServiceSettings::default());
        assert_eq!(s.port, 8080);
    }

    #[test]
    fn reads_paths_port_and_tunables() {
        let s = settings(&[
            ("LOCALROUTE_GAZETTEER_PATH", "/tmp/places.csv"),
            ("LOCALROUTE_NETWORK_PATH", "/tmp/roads.db"),
            ("SERVICE_PORT", "9090"),
            ("LOCALROUTE_MIN_SCORE", "0.7"),
            ("LOCALROUTE_MAX_SNAP_METERS", "250"),
            ("DRIVING_HOURS_LIMIT", "10"),
            ("FUEL_STOP_MILES", "800"),
        ])
        .unwrap();
        assert_eq!(s.gazetteer_path, PathBuf::from("/tmp/places.csv"));
        assert_eq!(s.network_path, PathBuf::from("/tmp/roads.db"));
        assert_eq!(s.port, 9090);
        assert_eq!(s.service.scoring.min_score, 0.7);
        assert_eq!(s.service.planner.max_snap_distance_meters, Some(250.0));
        assert_eq!(s.service.trip_rules.driving_hours_limit, 10.0);
        assert_eq!(s.service.trip_rules.fuel_stop_miles, 800.0);
    }

    #[test]
    fn empty_values_are_ignored() {
        let s = settings(&[("SERVICE_PORT", "  ")]).unwrap();
        assert_eq!(s.port, 8080);
    }

    #[test]
    fn rejects_unparseable_and_out_of_range_values() {
        let err = settings(&[("SERVICE_PORT", "eighty")]).unwrap_err();
        assert_eq!(err.variable, "SERVICE_PORT");
        assert!(settings(&[("LOCALROUTE_MIN_SCORE", "1.5")]).is_err());
        assert!(settings(&[("LOCALROUTE_MAX_SNAP_METERS", "-1")]).is_err());
        assert!(settings(&[("DRIVING_HOURS_LIMIT", "0")]).is_err());
    }
}
