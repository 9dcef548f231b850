//! Extract, extract-load and load-csv commands

use anyhow::{Context, Result};
use std::path::Path;
use teleport_core::pipeline;
use teleport_core::{LoadOptions, LoadStrategy};

use super::Project;

/// Extract a table into a CSV file and print its path
pub async fn extract(config_path: &str, preview: bool, from: &str, table: &str) -> Result<()> {
    let mut project = Project::load(config_path, preview)?;
    let source = project.source(from)?;

    let (path, rows) = pipeline::extract(&mut project.session, &source, table)
        .await
        .with_context(|| format!("Failed to extract '{table}' from '{source}'"))?;

    tracing::info!("Extracted {} rows", rows);
    println!("{}", path.display());
    Ok(())
}

/// Extract a table and load it into the destination
pub async fn extract_load(
    config_path: &str,
    preview: bool,
    from: &str,
    to: &str,
    table: &str,
) -> Result<()> {
    let mut project = Project::load(config_path, preview)?;
    let source = project.source(from)?;
    let destination = project.source(to)?;

    let rows = pipeline::extract_load(&mut project.session, &source, &destination, table)
        .await
        .with_context(|| format!("Failed to extract-load '{table}' from '{source}' to '{destination}'"))?;

    println!("{rows} rows");
    Ok(())
}

/// Load an existing CSV file into a destination table
pub async fn load_csv(
    config_path: &str,
    to: &str,
    table: &str,
    file: &Path,
    strategy: &str,
    primary_key: Option<&str>,
) -> Result<()> {
    let mut project = Project::load(config_path, false)?;
    let destination = project.source(to)?;

    let strategy: LoadStrategy = serde_yaml::from_str(strategy)
        .with_context(|| format!("Unknown load strategy '{strategy}'"))?;
    let options = LoadOptions {
        strategy,
        primary_key: primary_key.map(str::to_string),
        ..LoadOptions::default()
    };

    let rows = pipeline::load_csv(&mut project.session, &destination, table, file, &options)
        .await
        .with_context(|| format!("Failed to load {} into '{table}'", file.display()))?;

    println!("{rows} rows");
    Ok(())
}
