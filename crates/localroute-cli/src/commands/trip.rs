//! `trip` command handler.

use anyhow::Result;

use localroute_cli::output::{render_json, render_trip_text, OutputFormat};
use localroute_lib::{ServiceConfig, TripLabels};

use super::DataPaths;

#[derive(Debug, Clone)]
pub struct TripArgs {
    pub current: String,
    pub pickup: String,
    pub dropoff: String,
    pub cycle_hours: f64,
}

pub fn handle_trip(paths: &DataPaths, args: &TripArgs, format: OutputFormat) -> Result<()> {
    let service = paths.load_service(ServiceConfig::default())?;
    let labels = TripLabels {
        current_location: args.current.clone(),
        pickup_location: args.pickup.clone(),
        dropoff_location: args.dropoff.clone(),
    };
    let planned = service.plan_trip(labels, args.cycle_hours)?;

    match format {
        OutputFormat::Text => print!("{}", render_trip_text(&planned)),
        OutputFormat::Json => println!("{}", render_json(&planned)?),
    }
    Ok(())
}
