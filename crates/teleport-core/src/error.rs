//! Error types for teleport-core

use thiserror::Error;

use crate::endpoint::EndpointError;

/// Result type alias for teleport-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in teleport-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A column carries an option that is not valid for its data type
    #[error("invalid option on column '{column}': {message}")]
    InvalidColumnOption {
        /// Column name
        column: String,
        /// Description of the invalid combination
        message: String,
    },

    /// A generic data type has no representation in a dialect
    #[error("data type {data_type} is not supported by {dialect}")]
    UnsupportedDataType {
        /// Dialect display name
        dialect: String,
        /// Generic data type name
        data_type: String,
    },

    /// A source could not be opened or pinged
    #[error("cannot connect to database '{source_name}': {message}")]
    Connection {
        /// Source identifier
        source_name: String,
        /// Driver message
        message: String,
    },

    /// A table does not exist in a source
    #[error("table \"{table}\" not found in \"{source_name}\"")]
    TableNotFound {
        /// Table name
        table: String,
        /// Source identifier
        source_name: String,
    },

    /// Transform execution error
    #[error("transform error in '{transform}': {message}")]
    TransformError {
        /// Name or type of the transform
        transform: String,
        /// Description of the error
        message: String,
    },

    /// Writing rows into a destination failed
    #[error("load into '{table}' failed{}: {message}", row_context(.row))]
    Load {
        /// Destination table
        table: String,
        /// 1-based CSV data row, when known
        row: Option<u64>,
        /// Description of the error
        message: String,
    },

    /// Endpoint extraction error
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// A workflow step failed; later steps were not run
    #[error("step {step} ({name}) failed: {source}")]
    WorkflowStep {
        /// 1-based step position
        step: usize,
        /// Step name
        name: String,
        /// The step's error
        #[source]
        source: Box<Error>,
    },

    /// A workflow step ran before the step producing its input
    #[error("workflow step '{step}' is missing its input: {missing}")]
    MissingStepInput {
        /// Step name
        step: &'static str,
        /// What was expected
        missing: &'static str,
    },

    /// Database driver error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// CSV encoding/decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Template rendering error
    #[error("template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn row_context(row: &Option<u64>) -> String {
    match row {
        Some(row) => format!(" at row {row}"),
        None => String::new(),
    }
}

impl Error {
    /// Shorthand for [`Error::ConfigInvalid`]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    /// Whether this is a configuration error, surfaced before any I/O
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
                | Self::ConfigInvalid { .. }
                | Self::InvalidColumnOption { .. }
                | Self::UnsupportedDataType { .. }
        )
    }

    /// The innermost error, unwrapping workflow step failures
    pub fn root(&self) -> &Error {
        match self {
            Self::WorkflowStep { source, .. } => source.root(),
            other => other,
        }
    }
}
