//! RFC 9457 Problem Details for HTTP APIs.
//!
//! See: <https://www.rfc-editor.org/rfc/rfc9457.html>

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use localroute_lib::Error as LibError;

/// Problem type URI for addresses the gazetteer could not resolve.
pub const PROBLEM_GEOCODING_FAILED: &str = "/problems/geocoding-failed";

/// Problem type URI for waypoints in disconnected parts of the network.
pub const PROBLEM_ROUTE_NOT_FOUND: &str = "/problems/route-not-found";

/// Problem type URI for waypoints too far from any road.
pub const PROBLEM_NO_REACHABLE_POINT: &str = "/problems/no-reachable-point";

/// Problem type URI for invalid request parameters.
pub const PROBLEM_INVALID_REQUEST: &str = "/problems/invalid-request";

/// Problem type URI for internal server errors.
pub const PROBLEM_INTERNAL_ERROR: &str = "/problems/internal-error";

/// Problem type URI for unusable reference data.
pub const PROBLEM_SERVICE_UNAVAILABLE: &str = "/problems/service-unavailable";

/// RFC 9457 Problem Details response structure.
///
/// ```
/// use localroute_service_shared::{ProblemDetails, PROBLEM_GEOCODING_FAILED};
/// use axum::http::StatusCode;
///
/// let problem = ProblemDetails::new(
///     PROBLEM_GEOCODING_FAILED,
///     "Geocoding Failed",
///     StatusCode::NOT_FOUND,
/// )
/// .with_detail("Could not resolve '123 Mian St'")
/// .with_request_id("req-12345");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// URI reference identifying the problem type (relative).
    #[serde(rename = "type")]
    pub type_uri: String,

    /// Short, human-readable summary of the problem.
    pub title: String,

    /// HTTP status code for this problem.
    pub status: u16,

    /// Human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Identifies the specific occurrence (the request ID).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Close gazetteer names for an address that failed to resolve.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,

    /// Always "application/problem+json".
    pub content_type: String,
}

impl ProblemDetails {
    pub fn new(type_uri: impl Into<String>, title: impl Into<String>, status: StatusCode) -> Self {
        Self {
            type_uri: type_uri.into(),
            title: title.into(),
            status: status.as_u16(),
            detail: None,
            instance: None,
            suggestions: Vec::new(),
            content_type: "application/problem+json".to_string(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.instance = Some(request_id.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// 400 Bad Request for invalid input.
    pub fn bad_request(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_INVALID_REQUEST,
            "Invalid Request",
            StatusCode::BAD_REQUEST,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }

    /// 404 Not Found for an address with no acceptable gazetteer match.
    pub fn geocoding_failed(
        address: &str,
        suggestions: &[String],
        request_id: impl Into<String>,
    ) -> Self {
        let detail = if suggestions.is_empty() {
            format!("Could not resolve address '{address}'")
        } else {
            format!(
                "Could not resolve address '{address}'. Did you mean: {}?",
                suggestions.join(", ")
            )
        };

        Self::new(
            PROBLEM_GEOCODING_FAILED,
            "Geocoding Failed",
            StatusCode::NOT_FOUND,
        )
        .with_detail(detail)
        .with_suggestions(suggestions.to_vec())
        .with_request_id(request_id)
    }

    /// 404 Not Found for a leg with no path.
    pub fn route_not_found(leg: usize, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_ROUTE_NOT_FOUND,
            "Route Not Found",
            StatusCode::NOT_FOUND,
        )
        .with_detail(format!(
            "No road connects waypoint {} to waypoint {}",
            leg + 1,
            leg + 2
        ))
        .with_request_id(request_id)
    }

    /// 422 Unprocessable Entity for a location too far from the network.
    pub fn no_reachable_point(
        latitude: f64,
        longitude: f64,
        request_id: impl Into<String>,
    ) -> Self {
        Self::new(
            PROBLEM_NO_REACHABLE_POINT,
            "No Reachable Point",
            StatusCode::UNPROCESSABLE_ENTITY,
        )
        .with_detail(format!(
            "No road network node near ({latitude:.6}, {longitude:.6})"
        ))
        .with_request_id(request_id)
    }

    /// 500 Internal Server Error.
    pub fn internal_error(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_INTERNAL_ERROR,
            "Internal Error",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }

    /// 503 Service Unavailable.
    pub fn service_unavailable(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_SERVICE_UNAVAILABLE,
            "Service Unavailable",
            StatusCode::SERVICE_UNAVAILABLE,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }
}

impl std::fmt::Display for ProblemDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.detail.as_deref().unwrap_or(""))
    }
}

impl std::error::Error for ProblemDetails {}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = Json(&self).into_response();
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/problem+json"),
        );
        *response.status_mut() = status;
        response
    }
}

/// Convert a library error to a problem document.
pub fn from_lib_error(error: &LibError, request_id: &str) -> ProblemDetails {
    match error {
        LibError::InvalidQuery { .. }
        | LibError::InvalidWaypoints { .. }
        | LibError::InvalidCoordinate { .. }
        | LibError::InvalidTripParameters { .. } => {
            ProblemDetails::bad_request(error.to_string(), request_id)
        }
        LibError::GeocodingFailed {
            address,
            suggestions,
        } => ProblemDetails::geocoding_failed(address, suggestions, request_id),
        LibError::Unreachable { leg, .. } => ProblemDetails::route_not_found(*leg, request_id),
        LibError::NoReachablePoint {
            latitude,
            longitude,
        } => ProblemDetails::no_reachable_point(*latitude, *longitude, request_id),
        LibError::DataLoad { .. } => {
            ProblemDetails::service_unavailable(error.to_string(), request_id)
        }
        _ => ProblemDetails::internal_error(error.to_string(), request_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_problem_content_type() {
        let problem = ProblemDetails::new(
            PROBLEM_GEOCODING_FAILED,
            "Geocoding Failed",
            StatusCode::NOT_FOUND,
        );
        assert_eq!(problem.type_uri, PROBLEM_GEOCODING_FAILED);
        assert_eq!(problem.status, 404);
        assert_eq!(problem.content_type, "application/problem+json");
    }

    #[test]
    fn serializes_type_field_and_skips_empty_suggestions() {
        let problem = ProblemDetails::bad_request("Test error", "req-test");
        let json = serde_json::to_string(&problem).unwrap();

        assert!(json.contains("\"type\":\"/problems/invalid-request\""));
        assert!(json.contains("\"status\":400"));
        assert!(json.contains("\"instance\":\"req-test\""));
        assert!(!json.contains("suggestions"));
    }

    #[test]
    fn geocoding_failure_carries_suggestions() {
        let error = LibError::GeocodingFailed {
            address: "123 Mian St".to_string(),
            suggestions: vec!["123 Main St".to_string()],
        };
        let problem = from_lib_error(&error, "req-1");
        assert_eq!(problem.type_uri, PROBLEM_GEOCODING_FAILED);
        assert_eq!(problem.status, 404);
        assert_eq!(problem.suggestions, vec!["123 Main St"]);
        assert!(problem.detail.unwrap().contains("Did you mean: 123 Main St?"));
    }

    #[test]
    fn maps_each_error_family_to_its_status() {
        let cases = [
            (
                LibError::InvalidQuery {
                    reason: "query is empty".into(),
                },
                400,
                PROBLEM_INVALID_REQUEST,
            ),
            (LibError::InvalidWaypoints { count: 1 }, 400, PROBLEM_INVALID_REQUEST),
            (
                LibError::InvalidTripParameters {
                    message: "bad".into(),
                },
                400,
                PROBLEM_INVALID_REQUEST,
            ),
            (
                LibError::Unreachable {
                    leg: 0,
                    from: 1,
                    to: 2,
                },
                404,
                PROBLEM_ROUTE_NOT_FOUND,
            ),
            (
                LibError::NoReachablePoint {
                    latitude: 1.0,
                    longitude: 2.0,
                },
                422,
                PROBLEM_NO_REACHABLE_POINT,
            ),
            (
                LibError::data_load("network.db", "file not found"),
                503,
                PROBLEM_SERVICE_UNAVAILABLE,
            ),
            (
                LibError::SpatialIndexSerialize {
                    message: "boom".into(),
                },
                500,
                PROBLEM_INTERNAL_ERROR,
            ),
        ];
        for (error, status, type_uri) in cases {
            let problem = from_lib_error(&error, "req");
            assert_eq!(problem.status, status, "{error}");
            assert_eq!(problem.type_uri, type_uri, "{error}");
        }
    }

    #[test]
    fn route_not_found_names_waypoints() {
        let problem = ProblemDetails::route_not_found(1, "req");
        assert_eq!(
            problem.detail.as_deref(),
            Some("No road connects waypoint 2 to waypoint 3")
        );
    }
}
