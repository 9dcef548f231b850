//! CLI command implementations

pub mod database;
pub mod extract;
pub mod init;
pub mod table;
pub mod validate;

use anyhow::{Context, Result};
use std::sync::Arc;
use teleport_core::pipeline::Session;
use teleport_core::{Config, Database};

/// A loaded project and its session
pub struct Project {
    pub config: Config,
    pub session: Session,
}

impl Project {
    /// Load the project at `config_path`
    pub fn load(config_path: &str, preview: bool) -> Result<Self> {
        tracing::debug!("Loading configuration from {}", config_path);
        let config = Config::load(config_path).context("Failed to load configuration")?;
        let session = Session::from_config(&config, preview)?;
        Ok(Self { config, session })
    }

    /// Register a source name or database file path, returning its identifier
    pub fn source(&mut self, source_or_path: &str) -> Result<String> {
        let (source, database) = self
            .config
            .resolve_source(source_or_path)
            .with_context(|| format!("Unknown database '{source_or_path}'"))?;
        self.session.connections.register(&source, database);
        Ok(source)
    }

    /// Register and connect
    pub async fn connect(&mut self, source_or_path: &str) -> Result<(String, Arc<dyn Database>)> {
        let source = self.source(source_or_path)?;
        let db = self.session.connections.connect(&source).await?;
        Ok((source, db))
    }
}
