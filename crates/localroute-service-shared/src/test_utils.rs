//! Fixtures for handler tests, backed by the sample data in `docs/fixtures`.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::config::ServiceSettings;
use crate::state::AppState;

pub const GAZETTEER_FIXTURE_PATH: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../docs/fixtures/gazetteer.csv");

pub const NETWORK_FIXTURE_PATH: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../docs/fixtures/network.db");

static TEST_STATE: OnceLock<AppState> = OnceLock::new();

/// Default settings pointed at the fixture files.
pub fn fixture_settings() -> ServiceSettings {
    ServiceSettings {
        gazetteer_path: PathBuf::from(GAZETTEER_FIXTURE_PATH),
        network_path: PathBuf::from(NETWORK_FIXTURE_PATH),
        ..ServiceSettings::default()
    }
}

/// Shared state loaded once from the fixtures.
///
/// # Panics
///
/// Panics if the fixtures cannot be loaded.
pub fn test_state() -> AppState {
    TEST_STATE
        .get_or_init(|| {
            AppState::load(&fixture_settings())
                .unwrap_or_else(|e| panic!("failed to load test fixtures: {e}"))
        })
        .clone()
}

/// Addresses known to exist in the fixture gazetteer.
pub mod fixture_places {
    pub const MAIN_123: &str = "123 Main St";
    pub const OAK_456: &str = "456 Oak Ave";
    pub const PINE_789: &str = "789 Pine Rd";
    pub const STATION: &str = "Central Station";
}

pub fn test_request_id() -> String {
    format!("test-{}", uuid::Uuid::now_v7())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_files_exist() {
        assert!(PathBuf::from(GAZETTEER_FIXTURE_PATH).exists());
        assert!(PathBuf::from(NETWORK_FIXTURE_PATH).exists());
    }

    #[test]
    fn fixture_places_resolve() {
        let state = test_state();
        for address in [
            fixture_places::MAIN_123,
            fixture_places::OAK_456,
            fixture_places::PINE_789,
            fixture_places::STATION,
        ] {
            let candidates = state.service().geocode(address, 1).expect("geocode");
            assert_eq!(candidates.len(), 1, "{address} should resolve");
        }
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(test_request_id(), test_request_id());
    }
}
