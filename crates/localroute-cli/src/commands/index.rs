//! `index` command handler.

use anyhow::{Context, Result};

use localroute_lib::spatial_index_path;

use super::DataPaths;

/// Build the spatial index for the network and save it beside the database.
pub fn handle_index(paths: &DataPaths, force: bool) -> Result<()> {
    let index_path = spatial_index_path(&paths.network);
    if index_path.exists() && !force {
        println!(
            "Spatial index already exists at {}\nUse --force to rebuild.",
            index_path.display()
        );
        return Ok(());
    }

    let network = paths.load_network()?;
    let index = network.spatial_index();
    index
        .save(&index_path)
        .with_context(|| format!("failed to save spatial index to {}", index_path.display()))?;

    let file_size = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);
    println!("Spatial index built:");
    println!("  Path: {}", index_path.display());
    println!("  Nodes indexed: {}", index.len());
    println!("  File size: {file_size} bytes");
    Ok(())
}
