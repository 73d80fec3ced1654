// One module per subcommand; main.rs only parses and dispatches.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use localroute_lib::{GazetteerStore, RoadNetworkGraph, RouteService, ServiceConfig};

pub mod geocode;
pub mod index;
pub mod route;
pub mod trip;

/// Input data locations.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub gazetteer: PathBuf,
    pub network: PathBuf,
}

impl DataPaths {
    pub fn load_gazetteer(&self) -> Result<GazetteerStore> {
        GazetteerStore::load(&self.gazetteer)
            .with_context(|| format!("failed to load gazetteer from {}", self.gazetteer.display()))
    }

    pub fn load_network(&self) -> Result<RoadNetworkGraph> {
        RoadNetworkGraph::load(&self.network)
            .with_context(|| format!("failed to load road network from {}", self.network.display()))
    }

    pub fn load_service(&self, config: ServiceConfig) -> Result<RouteService> {
        let gazetteer = self.load_gazetteer()?;
        let network = self.load_network()?;
        Ok(RouteService::new(Arc::new(gazetteer), Arc::new(network), config))
    }
}
