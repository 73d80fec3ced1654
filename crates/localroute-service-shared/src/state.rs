//! Application state shared by axum handlers.

use std::path::Path;
use std::sync::Arc;

use localroute_lib::{Error as LibError, GazetteerStore, RoadNetworkGraph, RouteService};
use thiserror::Error;

use crate::config::ServiceSettings;

/// Error during application state initialization.
#[derive(Debug, Error)]
pub enum AppStateError {
    #[error("gazetteer not found: {0}")]
    GazetteerNotFound(String),

    #[error("road network not found: {0}")]
    NetworkNotFound(String),

    #[error("failed to load gazetteer: {0}")]
    GazetteerLoad(#[source] LibError),

    #[error("failed to load road network: {0}")]
    NetworkLoad(#[source] LibError),
}

/// Shared application state for all axum handlers.
///
/// Cheap to clone; the loaded data lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    service: RouteService,
}

impl AppState {
    /// Load the gazetteer and the road network named in `settings`.
    pub fn load(settings: &ServiceSettings) -> Result<Self, AppStateError> {
        let gazetteer = load_gazetteer(&settings.gazetteer_path)?;
        let network = load_network(&settings.network_path)?;

        tracing::info!(
            places = gazetteer.len(),
            nodes = network.node_count(),
            edges = network.edge_count(),
            "reference data loaded"
        );

        Ok(Self::from_service(RouteService::new(
            Arc::new(gazetteer),
            Arc::new(network),
            settings.service.clone(),
        )))
    }

    /// Wrap an already-built service. Useful for tests.
    pub fn from_service(service: RouteService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { service }),
        }
    }

    pub fn service(&self) -> &RouteService {
        &self.inner.service
    }

    pub fn places_loaded(&self) -> usize {
        self.inner.service.gazetteer().len()
    }

    pub fn nodes_loaded(&self) -> usize {
        self.inner.service.network().node_count()
    }

    pub fn edges_loaded(&self) -> usize {
        self.inner.service.network().edge_count()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("places", &self.places_loaded())
            .field("nodes", &self.nodes_loaded())
            .field("edges", &self.edges_loaded())
            .finish()
    }
}

fn load_gazetteer(path: &Path) -> Result<GazetteerStore, AppStateError> {
    if !path.exists() {
        return Err(AppStateError::GazetteerNotFound(path.display().to_string()));
    }
    tracing::info!(path = %path.display(), "loading gazetteer");
    GazetteerStore::load(path).map_err(AppStateError::GazetteerLoad)
}

fn load_network(path: &Path) -> Result<RoadNetworkGraph, AppStateError> {
    if !path.exists() {
        return Err(AppStateError::NetworkNotFound(path.display().to_string()));
    }
    tracing::info!(path = %path.display(), "loading road network");
    RoadNetworkGraph::load(path).map_err(AppStateError::NetworkLoad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fixture_settings, test_state};

    #[test]
    fn loads_fixture_data() {
        let state = AppState::load(&fixture_settings()).expect("fixtures load");
        assert_eq!(state.places_loaded(), 6);
        assert_eq!(state.nodes_loaded(), 6);
        assert_eq!(state.edges_loaded(), 5);
    }

    #[test]
    fn clones_share_the_same_service() {
        let a = test_state();
        let b = a.clone();
        assert!(std::ptr::eq(a.service(), b.service()));
    }

    #[test]
    fn debug_lists_counts() {
        let debug = format!("{:?}", test_state());
        assert!(debug.contains("AppState"));
        assert!(debug.contains("places"));
    }

    #[test]
    fn missing_files_are_reported_by_kind() {
        let mut settings = fixture_settings();
        settings.gazetteer_path = "/nonexistent/places.csv".into();
        match AppState::load(&settings).unwrap_err() {
            AppStateError::GazetteerNotFound(path) => assert!(path.contains("nonexistent")),
            other => panic!("unexpected error: {other:?}"),
        }

        let mut settings = fixture_settings();
        settings.network_path = "/nonexistent/roads.db".into();
        assert!(matches!(
            AppState::load(&settings),
            Err(AppStateError::NetworkNotFound(_))
        ));
    }
}
