//! `route` command handler.

use anyhow::Result;

use localroute_cli::output::{render_json, render_route_text, OutputFormat};
use localroute_lib::{RouteAlgorithm, ServiceConfig};

use super::DataPaths;

#[derive(Debug, Clone)]
pub struct RouteArgs {
    pub addresses: Vec<String>,
    pub algorithm: Option<RouteAlgorithm>,
    pub max_snap_meters: Option<f64>,
}

pub fn handle_route(paths: &DataPaths, args: &RouteArgs, format: OutputFormat) -> Result<()> {
    let mut config = ServiceConfig::default();
    if let Some(limit) = args.max_snap_meters {
        config.planner.max_snap_distance_meters = Some(limit);
    }
    if let Some(algorithm) = args.algorithm {
        config.planner.algorithm = algorithm;
    }

    let service = paths.load_service(config)?;
    let planned = service.plan_route(&args.addresses)?;

    match format {
        OutputFormat::Text => print!("{}", render_route_text(&planned)),
        OutputFormat::Json => println!("{}", render_json(&planned)?),
    }
    Ok(())
}
