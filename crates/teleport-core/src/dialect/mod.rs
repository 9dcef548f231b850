//! Dialect type mappers
//!
//! Each supported database product implements [`Dialect`]: the round trip
//! between its native column type strings and the generic [`DataType`],
//! DDL generation, identifier/literal quoting and the catalog queries the
//! schema inspector runs.
//!
//! ```text
//! native type ──native_to_generic──▶ (DataType, Options)
//!      ▲                                      │
//!      └──────────generic_to_native───────────┘
//! ```
//!
//! Decoding a type produced by `generic_to_native` reproduces the same
//! `DataType` and options, except where a dialect clamps or defaults a
//! value. Every clamp is listed on the dialect's type.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::schema::{Column, ColumnOption, DataType, Options, Table};
use crate::value::Value;

mod mysql;
mod postgres;
mod redshift;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use redshift::RedshiftDialect;
pub use sqlite::SqliteDialect;

/// Per-dialect capability set
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Dialect tag
    fn kind(&self) -> DialectKind;

    /// Display name
    fn human_name(&self) -> &'static str;

    /// Interactive shell binary, if there is one
    fn terminal_command(&self) -> Option<&'static str>;

    /// Normalize a native type string onto a generic type and options
    fn native_to_generic(&self, native: &str) -> (DataType, Options);

    /// Render the native type for a generic type and options
    fn generic_to_native(&self, data_type: DataType, options: &Options) -> Result<String>;

    /// Query listing the tables visible to the connection, one name per row
    fn table_names_query(&self) -> &'static str;

    /// Query returning `(name, native_type, not_null)` per column of the
    /// table bound as the single parameter, in catalog order
    fn catalog_query(&self) -> &'static str;

    /// Quote an identifier
    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quote a string literal
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Render a boolean literal
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "TRUE" } else { "FALSE" }
    }

    /// Render a binary literal
    fn bytes_literal(&self, value: &[u8]) -> String {
        format!("X'{}'", hex::encode(value))
    }

    /// Select-list expression reading `column` in a form rows can decode
    fn select_expression(&self, column: &Column) -> String {
        self.quote_ident(&column.name)
    }

    /// Render a value as a SQL literal
    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Boolean(b) => self.boolean_literal(*b).to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => value.to_string(),
            Value::Bytes(bytes) => self.bytes_literal(bytes),
            other => self.quote_string(&other.to_string()),
        }
    }

    /// Generate a single `CREATE TABLE` statement, column order preserved
    fn generate_create_table_statement(&self, table: &Table, name: &str) -> Result<String> {
        table.validate()?;
        let mut definitions = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let mut definition = format!(
                "{} {}",
                self.quote_ident(&column.name),
                self.generic_to_native(column.data_type, &column.options)?
            );
            if !column.is_nullable() {
                definition.push_str(" NOT NULL");
            }
            definitions.push(definition);
        }
        Ok(format!(
            "CREATE TABLE {} ({})",
            self.quote_ident(name),
            definitions.join(", ")
        ))
    }

    /// Error for a generic type this dialect cannot represent
    fn unsupported(&self, data_type: DataType) -> Error {
        Error::UnsupportedDataType {
            dialect: self.human_name().to_string(),
            data_type: data_type.to_string(),
        }
    }
}

/// Closed set of supported dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// PostgreSQL
    Postgres,
    /// Amazon Redshift
    Redshift,
    /// MySQL / MariaDB
    Mysql,
    /// SQLite
    Sqlite,
}

static POSTGRES: PostgresDialect = PostgresDialect;
static REDSHIFT: RedshiftDialect = RedshiftDialect;
static MYSQL: MySqlDialect = MySqlDialect;
static SQLITE: SqliteDialect = SqliteDialect;

impl DialectKind {
    /// The dialect implementation for this tag
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            DialectKind::Postgres => &POSTGRES,
            DialectKind::Redshift => &REDSHIFT,
            DialectKind::Mysql => &MYSQL,
            DialectKind::Sqlite => &SQLITE,
        }
    }

    /// Infer the dialect from a connection URL scheme
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| Error::config(format!("database URL '{url}' has no scheme")))?;
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(DialectKind::Postgres),
            "redshift" => Ok(DialectKind::Redshift),
            "mysql" | "mariadb" => Ok(DialectKind::Mysql),
            "sqlite" => Ok(DialectKind::Sqlite),
            other => Err(Error::config(format!(
                "unsupported database scheme '{other}'; expected postgres, redshift, mysql or sqlite"
            ))),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialectKind::Postgres => "postgres",
            DialectKind::Redshift => "redshift",
            DialectKind::Mysql => "mysql",
            DialectKind::Sqlite => "sqlite",
        })
    }
}

/// A native type string split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeType {
    /// Lower-case base name with whitespace collapsed, e.g. `character varying`
    pub name: String,
    /// Numeric parameters, e.g. `[10, 2]` for `numeric(10,2)`
    pub params: Vec<i64>,
    /// Lower-case text after the parameter list, e.g. `without time zone`
    pub suffix: String,
}

static PARAMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\)").expect("valid regex"));

impl NativeType {
    /// Parse a native type string
    pub fn parse(native: &str) -> Self {
        let native = native.trim().to_ascii_lowercase();
        let (head, rest) = match native.find('(') {
            Some(idx) => native.split_at(idx),
            None => (native.as_str(), ""),
        };

        let mut params = Vec::new();
        let mut suffix = rest;
        if let Some(captures) = PARAMS.captures(rest) {
            params = captures
                .iter()
                .skip(1)
                .flatten()
                .filter_map(|m| m.as_str().parse().ok())
                .collect();
            suffix = &rest[captures[0].len()..];
        } else if let Some(end) = rest.find(')') {
            suffix = &rest[end + 1..];
        }

        Self {
            name: collapse_whitespace(head),
            params,
            suffix: collapse_whitespace(suffix),
        }
    }

    /// First parameter, if present
    pub fn param(&self, idx: usize) -> Option<i64> {
        self.params.get(idx).copied()
    }
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build options from `(option, value)` pairs, skipping absent values
pub(crate) fn options<const N: usize>(pairs: [(ColumnOption, Option<i64>); N]) -> Options {
    pairs
        .into_iter()
        .filter_map(|(option, value)| value.map(|v| (option, v)))
        .collect()
}

/// Precision/scale pair rendered as `(p,s)`, `(p)` or nothing
pub(crate) fn precision_scale(options: &Options, max_precision: i64, max_scale: i64) -> String {
    match (
        options.get(&ColumnOption::Precision),
        options.get(&ColumnOption::Scale),
    ) {
        (Some(p), Some(s)) => {
            let p = (*p).min(max_precision);
            format!("({},{})", p, (*s).min(max_scale).min(p))
        }
        (Some(p), None) => format!("({})", (*p).min(max_precision)),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use rstest::rstest;

    #[rstest]
    #[case("integer", "integer", vec![], "")]
    #[case("character varying(255)", "character varying", vec![255], "")]
    #[case("numeric(10,2)", "numeric", vec![10, 2], "")]
    #[case("NUMERIC( 10 , 2 )", "numeric", vec![10, 2], "")]
    #[case("timestamp(6) without time zone", "timestamp", vec![6], "without time zone")]
    #[case("bigint(20) unsigned", "bigint", vec![20], "unsigned")]
    #[case("int unsigned", "int unsigned", vec![], "")]
    #[case("enum('a','b')", "enum", vec![], "")]
    fn test_parse_native_type(
        #[case] native: &str,
        #[case] name: &str,
        #[case] params: Vec<i64>,
        #[case] suffix: &str,
    ) {
        let parsed = NativeType::parse(native);
        assert_eq!(parsed.name, name);
        assert_eq!(parsed.params, params);
        assert_eq!(parsed.suffix, suffix);
    }

    #[rstest]
    #[case("postgres://u:p@localhost/db", DialectKind::Postgres)]
    #[case("postgresql://localhost/db", DialectKind::Postgres)]
    #[case("redshift://u:p@cluster:5439/dev", DialectKind::Redshift)]
    #[case("mysql://root@localhost/shop", DialectKind::Mysql)]
    #[case("sqlite:///tmp/shop.db", DialectKind::Sqlite)]
    #[case("sqlite::memory:", DialectKind::Sqlite)]
    fn test_dialect_from_url(#[case] url: &str, #[case] kind: DialectKind) {
        assert_eq!(DialectKind::from_url(url).unwrap(), kind);
    }

    #[test]
    fn test_dialect_from_unknown_scheme() {
        assert!(DialectKind::from_url("oracle://db").is_err());
        assert!(DialectKind::from_url("no-scheme").is_err());
    }

    #[test]
    fn test_generate_create_table_statement() {
        let table = Table::new(
            "shop",
            "widgets",
            vec![
                Column::new("id", DataType::Integer)
                    .with_option(ColumnOption::Bytes, 8)
                    .with_option(ColumnOption::Nullable, 0),
                Column::new("name", DataType::String).with_option(ColumnOption::Length, 255),
                Column::new("name_hash", DataType::String)
                    .with_option(ColumnOption::Length, 64)
                    .with_option(ColumnOption::Computed, 1),
            ],
        );
        let ddl = DialectKind::Postgres
            .dialect()
            .generate_create_table_statement(&table, "shop_widgets")
            .unwrap();
        assert_eq!(
            ddl,
            r#"CREATE TABLE "shop_widgets" ("id" BIGINT NOT NULL, "name" VARCHAR(255), "name_hash" VARCHAR(64))"#
        );
    }

    #[test]
    fn test_create_table_rejects_invalid_options_before_rendering() {
        let table = Table::new(
            "shop",
            "widgets",
            vec![Column::new("id", DataType::Integer).with_option(ColumnOption::Length, 8)],
        );
        let err = DialectKind::Sqlite
            .dialect()
            .generate_create_table_statement(&table, "shop_widgets")
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_literals() {
        let dialect = DialectKind::Postgres.dialect();
        assert_eq!(dialect.literal(&Value::Null), "NULL");
        assert_eq!(dialect.literal(&Value::Integer(-4)), "-4");
        assert_eq!(dialect.literal(&Value::Float(1.5)), "1.5");
        assert_eq!(dialect.literal(&Value::String("it's".into())), "'it''s'");
        assert_eq!(dialect.literal(&Value::Boolean(true)), "TRUE");
        assert_eq!(
            DialectKind::Mysql.dialect().literal(&Value::String(r"a\b".into())),
            r"'a\\b'"
        );
    }
}
