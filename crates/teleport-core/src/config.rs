//! Configuration parsing and validation
//!
//! This module handles loading and validating Teleport configuration files.
//!
//! # Configuration Files
//!
//! - `teleport.yaml` - Project root configuration
//! - `databases/*.yaml` - One connection per source, with per-table extract policies
//! - `apis/*.yaml` - HTTP endpoint definitions

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::dialect::DialectKind;
use crate::endpoint::EndpointConfig;
use crate::error::{Error, Result};
use crate::schema::Table;
use crate::script::ScriptEngine;
use crate::table_extract::TableExtract;

/// Project file name
pub const PROJECT_FILE: &str = "teleport.yaml";

/// Directory holding `<source>.yaml` database files
pub const DATABASES_DIR: &str = "databases";

/// Directory holding `<endpoint>.yaml` API files
pub const APIS_DIR: &str = "apis";

/// Root project configuration from `teleport.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Directory for intermediate CSV files, relative to the project
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Rows extracted per table in preview mode
    #[serde(default = "default_preview_limit")]
    pub preview_limit: u64,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_preview_limit() -> u64 {
    100
}

/// A source database from `databases/<source>.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; `$VAR` and `${VAR}` are expanded when loaded
    pub url: String,

    /// Dialect tag, inferred from the URL scheme when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<DialectKind>,

    /// Extract policies by table name
    #[serde(default)]
    pub tables: BTreeMap<String, TableExtract>,
}

impl DatabaseConfig {
    /// A configuration without table policies
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            dialect: None,
            tables: BTreeMap::new(),
        }
    }

    /// The configured or inferred dialect
    pub fn dialect_kind(&self) -> Result<DialectKind> {
        match self.dialect {
            Some(kind) => Ok(kind),
            None => DialectKind::from_url(&self.url),
        }
    }

    /// Extract policy for `table`, or the default Full policy
    pub fn table_extract(&self, table: &str) -> TableExtract {
        self.tables.get(table).cloned().unwrap_or_default()
    }

    /// Validate the dialect and every table policy
    pub fn validate(&self, engine: &ScriptEngine) -> Result<()> {
        self.dialect_kind()?;
        for (table, extract) in &self.tables {
            extract.validate(engine).map_err(|e| match e {
                Error::ConfigInvalid { message } => {
                    Error::config(format!("table '{table}': {message}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or teleport.yaml file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-project")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(PROJECT_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;

        Ok(Self { project, base_path })
    }

    /// Directory for intermediate CSV files
    pub fn work_dir(&self) -> PathBuf {
        match &self.project.work_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.base_path.join(dir),
            None => std::env::temp_dir(),
        }
    }

    /// Resolve a source argument to its identifier and configuration
    ///
    /// An argument containing `/` is a path to a database file whose stem is
    /// the source identifier; anything else names `databases/<source>.yaml`.
    pub fn resolve_source(&self, source_or_path: &str) -> Result<(String, DatabaseConfig)> {
        if source_or_path.contains('/') {
            let path = Path::new(source_or_path);
            let source = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::config(format!("'{source_or_path}' does not name a database file"))
                })?;
            Ok((source, load_database_file(path)?))
        } else {
            Ok((
                source_or_path.to_string(),
                self.load_database(source_or_path)?,
            ))
        }
    }

    /// Load `databases/<source>.yaml`
    pub fn load_database(&self, source: &str) -> Result<DatabaseConfig> {
        load_database_file(
            &self
                .base_path
                .join(DATABASES_DIR)
                .join(format!("{source}.yaml")),
        )
    }

    /// Load every database file, keyed by source identifier
    pub fn load_databases(&self) -> Result<BTreeMap<String, DatabaseConfig>> {
        yaml_files(&self.base_path.join(DATABASES_DIR))?
            .into_iter()
            .map(|(source, path)| Ok((source, load_database_file(&path)?)))
            .collect()
    }

    /// Load `apis/<name>.yaml`
    pub fn load_endpoint(&self, name: &str) -> Result<EndpointConfig> {
        load_endpoint_file(&self.base_path.join(APIS_DIR).join(format!("{name}.yaml")))
    }

    /// Load every endpoint file, keyed by name
    pub fn load_endpoints(&self) -> Result<BTreeMap<String, EndpointConfig>> {
        yaml_files(&self.base_path.join(APIS_DIR))?
            .into_iter()
            .map(|(name, path)| Ok((name, load_endpoint_file(&path)?)))
            .collect()
    }

    /// Load and validate every database and endpoint file
    pub fn validate(&self, engine: &ScriptEngine) -> Result<ValidationReport> {
        let databases = self.load_databases()?;
        let mut tables = 0;
        for (source, database) in &databases {
            database.validate(engine).map_err(|e| match e {
                Error::ConfigInvalid { message } => {
                    Error::config(format!("database '{source}': {message}"))
                }
                other => other,
            })?;
            tables += database.tables.len();
        }
        let endpoints = self.load_endpoints()?;
        Ok(ValidationReport {
            databases: databases.into_keys().collect(),
            tables,
            endpoints: endpoints.into_keys().collect(),
        })
    }
}

/// Summary of a successful [`Config::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Source identifiers
    pub databases: Vec<String>,
    /// Number of table policies
    pub tables: usize,
    /// Endpoint names
    pub endpoints: Vec<String>,
}

fn yaml_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files: Vec<(String, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "yaml" || ext == "yml"))
        .filter_map(|p| {
            let stem = p.file_stem()?.to_string_lossy().into_owned();
            Some((stem, p))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.display().to_string(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Load a database file and expand environment variables in its URL
pub fn load_database_file(path: &Path) -> Result<DatabaseConfig> {
    let mut database: DatabaseConfig = read_yaml(path)?;
    database.url = expand_env(&database.url);
    database.dialect_kind()?;
    Ok(database)
}

/// Load and validate an endpoint file
pub fn load_endpoint_file(path: &Path) -> Result<EndpointConfig> {
    let endpoint = read_yaml::<EndpointConfig>(path)?.expand_env();
    endpoint.validate()?;
    Ok(endpoint)
}

/// Load and validate a table descriptor file
pub fn load_table_definition(path: &Path) -> Result<Table> {
    let table: Table = read_yaml(path)?;
    table.validate()?;
    Ok(table)
}

static ENV_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))").expect("valid regex")
});

/// Replace `$VAR` and `${VAR}` with environment values; unset variables expand to ""
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    ENV_VAR
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            lookup(name).unwrap_or_else(|| {
                tracing::warn!(variable = name, "Environment variable is not set");
                String::new()
            })
        })
        .into_owned()
}
