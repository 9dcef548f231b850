//! about-db and db-terminal commands

use anyhow::{Context, Result};
use std::process::Command;
use teleport_core::{Config, DatabaseConfig, DialectKind};

/// Print the database's name and type
pub fn about(config_path: &str, from: &str) -> Result<()> {
    let (source, database) = resolve(config_path, from)?;
    let kind = database.dialect_kind()?;

    println!("Name: {source}");
    println!("Type: {}", kind.dialect().human_name());
    Ok(())
}

/// Run the dialect's shell against the database and wait for it to exit
pub fn terminal(config_path: &str, from: &str) -> Result<()> {
    let (source, database) = resolve(config_path, from)?;
    let kind = database.dialect_kind()?;
    let command = kind
        .dialect()
        .terminal_command()
        .with_context(|| format!("No terminal for {} databases", kind.dialect().human_name()))?;

    tracing::debug!("Opening {} for {}", command, source);
    let status = Command::new(command)
        .arg(terminal_argument(kind, &database.url))
        .status()
        .with_context(|| format!("Failed to run {command}"))?;

    if !status.success() {
        anyhow::bail!("{command} exited with {status}");
    }
    Ok(())
}

fn resolve(config_path: &str, from: &str) -> Result<(String, DatabaseConfig)> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    config
        .resolve_source(from)
        .with_context(|| format!("Unknown database '{from}'"))
}

/// `sqlite3` takes a file path; the other shells take the URL
fn terminal_argument(kind: DialectKind, url: &str) -> String {
    match kind {
        DialectKind::Sqlite => url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url)
            .to_string(),
        _ => url.to_string(),
    }
}
