//! Connection cache
//!
//! Connections are opened on first use, pinged, and kept for the rest of
//! the invocation. The cache is an explicit object owned by the caller.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::database::{Database, SqlDatabase};
use crate::error::{Error, Result};

/// Source identifier to connection map
#[derive(Default)]
pub struct Connections {
    configs: BTreeMap<String, DatabaseConfig>,
    open: HashMap<String, Arc<dyn Database>>,
}

impl Connections {
    /// A cache over the given database configurations
    pub fn new(configs: BTreeMap<String, DatabaseConfig>) -> Self {
        Self {
            configs,
            open: HashMap::new(),
        }
    }

    /// Add or replace a source's configuration
    pub fn register(&mut self, source: impl Into<String>, config: DatabaseConfig) {
        let source = source.into();
        self.open.remove(&source);
        self.configs.insert(source, config);
    }

    /// Seed an already-open connection
    pub fn insert(&mut self, db: Arc<dyn Database>) {
        self.open.insert(db.source().to_string(), db);
    }

    /// Configuration of a source
    pub fn config(&self, source: &str) -> Result<&DatabaseConfig> {
        self.configs
            .get(source)
            .ok_or_else(|| Error::config(format!("database '{source}' is not configured")))
    }

    /// The cached connection for `source`, opening it first if needed
    pub async fn connect(&mut self, source: &str) -> Result<Arc<dyn Database>> {
        if let Some(db) = self.open.get(source) {
            return Ok(Arc::clone(db));
        }

        let config = self.config(source)?;
        let kind = config.dialect_kind()?;
        tracing::debug!(database = source, "Establish connection to database");
        let db: Arc<dyn Database> = Arc::new(SqlDatabase::connect(source, &config.url, kind).await?);
        db.ping().await?;

        self.open.insert(source.to_string(), Arc::clone(&db));
        Ok(db)
    }
}

impl std::fmt::Debug for Connections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connections")
            .field("configured", &self.configs.keys().collect::<Vec<_>>())
            .field("open", &self.open.keys().collect::<Vec<_>>())
            .finish()
    }
}
