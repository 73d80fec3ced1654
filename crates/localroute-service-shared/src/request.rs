//! Request bodies and validation for HTTP endpoints.

use localroute_lib::RouteAlgorithm;
use serde::{Deserialize, Serialize};

use crate::ProblemDetails;

/// Upper bound on addresses in one route request.
pub const MAX_ADDRESSES: usize = 25;

/// Upper bound on geocoding results per request.
pub const MAX_GEOCODE_LIMIT: usize = 50;

/// Validation trait for request types.
///
/// Returns a boxed `ProblemDetails` to avoid large `Result::Err` variants.
pub trait Validate {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>>;
}

/// `POST /api/v1/route`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Free-text addresses in travel order.
    pub addresses: Vec<String>,

    /// Overrides the configured algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<RouteAlgorithm>,
}

impl Validate for RouteRequest {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        if self.addresses.len() < 2 {
            return Err(Box::new(ProblemDetails::bad_request(
                format!(
                    "The 'addresses' field needs at least two entries, got {}",
                    self.addresses.len()
                ),
                request_id,
            )));
        }
        if self.addresses.len() > MAX_ADDRESSES {
            return Err(Box::new(ProblemDetails::bad_request(
                format!("The 'addresses' field cannot exceed {MAX_ADDRESSES} entries"),
                request_id,
            )));
        }
        if let Some(index) = self.addresses.iter().position(|a| a.trim().is_empty()) {
            return Err(Box::new(ProblemDetails::bad_request(
                format!("Address {} is empty", index + 1),
                request_id,
            )));
        }
        Ok(())
    }
}

/// `POST /api/v1/geocode`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeRequest {
    pub query: String,

    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    5
}

impl Validate for GeocodeRequest {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        if self.query.trim().is_empty() {
            return Err(Box::new(ProblemDetails::bad_request(
                "The 'query' field is required and cannot be empty",
                request_id,
            )));
        }
        if self.limit == 0 {
            return Err(Box::new(ProblemDetails::bad_request(
                "The 'limit' field must be at least 1",
                request_id,
            )));
        }
        if self.limit > MAX_GEOCODE_LIMIT {
            return Err(Box::new(ProblemDetails::bad_request(
                format!("The 'limit' field cannot exceed {MAX_GEOCODE_LIMIT}"),
                request_id,
            )));
        }
        Ok(())
    }
}

/// `POST /api/v1/trip`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRequest {
    pub current_location: String,
    pub pickup_location: String,
    pub dropoff_location: String,

    /// Hours already used in the current duty cycle.
    #[serde(default)]
    pub current_cycle_hours: f64,
}

impl Validate for TripRequest {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        for (field, value) in [
            ("current_location", &self.current_location),
            ("pickup_location", &self.pickup_location),
            ("dropoff_location", &self.dropoff_location),
        ] {
            if value.trim().is_empty() {
                return Err(Box::new(ProblemDetails::bad_request(
                    format!("The '{field}' field is required and cannot be empty"),
                    request_id,
                )));
            }
        }
        if !self.current_cycle_hours.is_finite() || self.current_cycle_hours < 0.0 {
            return Err(Box::new(ProblemDetails::bad_request(
                "The 'current_cycle_hours' field must be a non-negative number",
                request_id,
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(addresses: &[&str]) -> RouteRequest {
        RouteRequest {
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
            algorithm: None,
        }
    }

    #[test]
    fn route_request_needs_two_non_empty_addresses() {
        assert!(route(&["123 Main St", "456 Oak Ave"]).validate("req").is_ok());
        assert!(route(&["123 Main St"]).validate("req").is_err());

        let problem = route(&["123 Main St", "  "]).validate("req").unwrap_err();
        assert_eq!(problem.status, 400);
        assert_eq!(problem.detail.as_deref(), Some("Address 2 is empty"));
    }

    #[test]
    fn route_request_caps_address_count() {
        let many = vec!["123 Main St"; MAX_ADDRESSES + 1];
        assert!(route(&many).validate("req").is_err());
    }

    #[test]
    fn route_request_parses_algorithm_names() {
        let request: RouteRequest =
            serde_json::from_str(r#"{"addresses":["a","b"],"algorithm":"dijkstra"}"#).unwrap();
        assert_eq!(request.algorithm, Some(RouteAlgorithm::Dijkstra));

        let request: RouteRequest =
            serde_json::from_str(r#"{"addresses":["a","b"],"algorithm":"a-star"}"#).unwrap();
        assert_eq!(request.algorithm, Some(RouteAlgorithm::AStar));

        let request: RouteRequest = serde_json::from_str(r#"{"addresses":["a","b"]}"#).unwrap();
        assert_eq!(request.algorithm, None);
    }

    #[test]
    fn geocode_request_defaults_and_bounds() {
        let request: GeocodeRequest = serde_json::from_str(r#"{"query":"main"}"#).unwrap();
        assert_eq!(request.limit, 5);
        assert!(request.validate("req").is_ok());

        let zero = GeocodeRequest {
            query: "main".into(),
            limit: 0,
        };
        assert!(zero.validate("req").is_err());

        let blank = GeocodeRequest {
            query: " ".into(),
            limit: 3,
        };
        assert!(blank.validate("req").is_err());
    }

    #[test]
    fn trip_request_rejects_negative_hours() {
        let request = TripRequest {
            current_location: "a".into(),
            pickup_location: "b".into(),
            dropoff_location: "c".into(),
            current_cycle_hours: -1.0,
        };
        let problem = request.validate("req-9").unwrap_err();
        assert_eq!(problem.instance.as_deref(), Some("req-9"));
    }
}
