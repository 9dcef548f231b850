//! Portable table descriptors
//!
//! Every dialect's native column types normalize onto [`DataType`]; facets a
//! generic type cannot carry (lengths, precision, integer width) move into
//! the column's [`Options`].
//!
//! # Example
//!
//! ```yaml
//! source: shop
//! name: widgets
//! columns:
//!   - name: id
//!     data_type: INTEGER
//!     options: { BYTES: 8, NULLABLE: 0 }
//!   - name: name
//!     data_type: STRING
//!     options: { LENGTH: 255 }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// Generic, dialect-independent column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// Bounded character data
    String,
    /// Unbounded character data
    Text,
    /// Whole numbers
    Integer,
    /// Binary floating point numbers
    Float,
    /// True/false
    Boolean,
    /// Calendar date
    Date,
    /// Date and time of day
    Datetime,
    /// Exact numerics
    Decimal,
    /// Raw bytes
    Blob,
    /// A native type with no generic counterpart
    Unknown,
}

impl DataType {
    /// Upper-case name used in configuration and descriptions
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Text => "TEXT",
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Datetime => "DATETIME",
            DataType::Decimal => "DECIMAL",
            DataType::Blob => "BLOB",
            DataType::Unknown => "UNKNOWN",
        }
    }

    /// Options that are meaningful for this type, besides the universal ones
    fn type_options(&self) -> &'static [ColumnOption] {
        match self {
            DataType::String => &[ColumnOption::Length],
            DataType::Decimal => &[ColumnOption::Precision, ColumnOption::Scale],
            DataType::Integer | DataType::Float => &[ColumnOption::Bytes],
            _ => &[],
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column modifier carried alongside the generic type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnOption {
    /// Maximum character length (STRING)
    Length,
    /// Total digits (DECIMAL)
    Precision,
    /// Digits after the decimal point (DECIMAL)
    Scale,
    /// Storage width in bytes (INTEGER: 1, 2, 4, 8; FLOAT: 4, 8)
    Bytes,
    /// 1 when the column is synthesized by a computed-column function
    Computed,
    /// 0 when the column rejects NULL; absent means nullable
    Nullable,
}

impl ColumnOption {
    /// Upper-case name used in configuration and descriptions
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnOption::Length => "LENGTH",
            ColumnOption::Precision => "PRECISION",
            ColumnOption::Scale => "SCALE",
            ColumnOption::Bytes => "BYTES",
            ColumnOption::Computed => "COMPUTED",
            ColumnOption::Nullable => "NULLABLE",
        }
    }
}

impl fmt::Display for ColumnOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column options; absence of an option means "not applicable/default"
pub type Options = BTreeMap<ColumnOption, i64>;

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Generic type
    pub data_type: DataType,

    /// Type modifiers
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,
}

impl Column {
    /// Create a column without options
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            options: Options::new(),
        }
    }

    /// Set an option
    pub fn with_option(mut self, option: ColumnOption, value: i64) -> Self {
        self.options.insert(option, value);
        self
    }

    /// Value of an option, if set
    pub fn option(&self, option: ColumnOption) -> Option<i64> {
        self.options.get(&option).copied()
    }

    /// Whether the column is synthesized during extraction
    pub fn is_computed(&self) -> bool {
        self.option(ColumnOption::Computed) == Some(1)
    }

    /// Whether the column accepts NULL
    pub fn is_nullable(&self) -> bool {
        self.option(ColumnOption::Nullable) != Some(0)
    }

    /// Check that the options form a valid combination for the data type
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Error::InvalidColumnOption {
            column: self.name.clone(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(Error::config("column name must not be empty"));
        }

        for (option, value) in &self.options {
            let value = *value;
            match option {
                ColumnOption::Computed | ColumnOption::Nullable => {
                    if value != 0 && value != 1 {
                        return Err(invalid(format!("{option} must be 0 or 1, got {value}")));
                    }
                    continue;
                }
                _ if !self.data_type.type_options().contains(option) => {
                    return Err(invalid(format!(
                        "{option} is not applicable to {}",
                        self.data_type
                    )));
                }
                ColumnOption::Length | ColumnOption::Precision if value <= 0 => {
                    return Err(invalid(format!("{option} must be positive, got {value}")));
                }
                ColumnOption::Scale if value < 0 => {
                    return Err(invalid(format!("SCALE must not be negative, got {value}")));
                }
                ColumnOption::Bytes => {
                    let allowed: &[i64] = match self.data_type {
                        DataType::Float => &[4, 8],
                        _ => &[1, 2, 4, 8],
                    };
                    if !allowed.contains(&value) {
                        return Err(invalid(format!(
                            "BYTES for {} must be one of {allowed:?}, got {value}",
                            self.data_type
                        )));
                    }
                }
                _ => {}
            }
        }

        if let Some(scale) = self.option(ColumnOption::Scale) {
            match self.option(ColumnOption::Precision) {
                None => return Err(invalid("SCALE requires PRECISION".to_string())),
                Some(precision) if scale > precision => {
                    return Err(invalid(format!(
                        "SCALE ({scale}) must not exceed PRECISION ({precision})"
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// A table descriptor; column order is the SELECT and CSV order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Source identifier the table was inspected from (or is declared for)
    pub source: String,

    /// Table name
    pub name: String,

    /// Ordered columns
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Table {
    /// Create a table descriptor
    pub fn new(source: impl Into<String>, name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            columns,
        }
    }

    /// Find a column by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Validate every column and reject duplicate names
    pub fn validate(&self) -> Result<()> {
        for (i, column) in self.columns.iter().enumerate() {
            column.validate()?;
            if self.columns[..i]
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(Error::config(format!(
                    "duplicate column '{}' in table '{}'",
                    column.name, self.name
                )));
            }
        }
        Ok(())
    }

    /// Generate `CREATE TABLE <name> (...)` for this table's columns
    pub fn generate_create_table_statement(
        &self,
        dialect: &dyn Dialect,
        name: &str,
    ) -> Result<String> {
        dialect.generate_create_table_statement(self, name)
    }
}

/// Destination table naming convention: `<source>_<table>`
pub fn destination_table_name(source: &str, table: &str) -> String {
    format!("{source}_{table}")
}
