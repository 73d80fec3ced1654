//! `geocode` command handler.

use anyhow::Result;

use localroute_cli::output::{render_candidates_text, render_json, OutputFormat};
use localroute_lib::{GeocodingResolver, ScoringConfig};

use super::DataPaths;

pub fn handle_geocode(
    paths: &DataPaths,
    query: &str,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let gazetteer = paths.load_gazetteer()?;
    let resolver = GeocodingResolver::new(&gazetteer, ScoringConfig::default());
    let candidates = resolver.resolve(query, limit)?;

    match format {
        OutputFormat::Text => print!("{}", render_candidates_text(query, &candidates)),
        OutputFormat::Json => println!("{}", render_json(&candidates)?),
    }
    Ok(())
}
