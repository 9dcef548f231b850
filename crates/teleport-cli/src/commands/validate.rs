//! Validate configuration command

use anyhow::{Context, Result};
use teleport_core::Config;
use teleport_core::script::ScriptEngine;

/// Run the validate command
pub async fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Version: {}", config.project.version);

    let report = config
        .validate(&ScriptEngine::new())
        .context("Invalid configuration")?;

    for database in &report.databases {
        tracing::info!("✓ Database: {}", database);
    }
    for endpoint in &report.endpoints {
        tracing::info!("✓ Endpoint: {}", endpoint);
    }
    tracing::info!("✓ Table policies: {}", report.tables);

    println!("Configuration is valid");
    Ok(())
}
