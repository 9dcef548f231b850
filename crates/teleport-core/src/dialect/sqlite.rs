//! SQLite type mapping
//!
//! SQLite keeps declared column types verbatim, so every generic type round
//! trips through its declared name. Reading follows SQLite's affinity rules:
//! any declared type containing `INT` is an integer, `CHAR`/`CLOB` are
//! strings, and an empty declared type is `UNKNOWN`. `INTEGER` with
//! `BYTES: 4` and `FLOAT` with `BYTES: 8` read back without `BYTES`.

use super::{Dialect, DialectKind, NativeType, options, precision_scale};
use crate::error::Result;
use crate::schema::{ColumnOption, DataType, Options};

/// SQLite dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn human_name(&self) -> &'static str {
        "SQLite"
    }

    fn terminal_command(&self) -> Option<&'static str> {
        Some("sqlite3")
    }

    fn native_to_generic(&self, native: &str) -> (DataType, Options) {
        use ColumnOption::*;

        let native = NativeType::parse(native);
        let name = native.name.as_str();
        match name {
            "" => (DataType::Unknown, Options::new()),
            "boolean" | "bool" => (DataType::Boolean, Options::new()),
            "date" => (DataType::Date, Options::new()),
            "datetime" | "timestamp" => (DataType::Datetime, Options::new()),
            "bigint" | "int8" => (DataType::Integer, options([(Bytes, Some(8))])),
            "smallint" | "int2" => (DataType::Integer, options([(Bytes, Some(2))])),
            "tinyint" => (DataType::Integer, options([(Bytes, Some(1))])),
            _ if name.contains("int") => (DataType::Integer, Options::new()),
            "decimal" | "numeric" => (
                DataType::Decimal,
                options([(Precision, native.param(0)), (Scale, native.param(1))]),
            ),
            "float" => (DataType::Float, options([(Bytes, Some(4))])),
            "real" | "double" | "double precision" => (DataType::Float, Options::new()),
            "text" | "clob" => (DataType::Text, Options::new()),
            _ if name.contains("char") => {
                (DataType::String, options([(Length, native.param(0))]))
            }
            "blob" => (DataType::Blob, Options::new()),
            _ => (DataType::Unknown, Options::new()),
        }
    }

    fn generic_to_native(&self, data_type: DataType, options: &Options) -> Result<String> {
        let bytes = options.get(&ColumnOption::Bytes).copied();
        Ok(match data_type {
            DataType::String => match options.get(&ColumnOption::Length) {
                Some(length) => format!("VARCHAR({length})"),
                None => "VARCHAR".to_string(),
            },
            DataType::Text => "TEXT".to_string(),
            DataType::Integer => match bytes {
                Some(1) => "TINYINT",
                Some(2) => "SMALLINT",
                Some(8) => "BIGINT",
                _ => "INTEGER",
            }
            .to_string(),
            DataType::Float => match bytes {
                Some(4) => "FLOAT",
                _ => "REAL",
            }
            .to_string(),
            DataType::Decimal => format!("DECIMAL{}", precision_scale(options, i64::MAX, i64::MAX)),
            DataType::Boolean => "BOOLEAN".to_string(),
            DataType::Date => "DATE".to_string(),
            DataType::Datetime => "DATETIME".to_string(),
            DataType::Blob => "BLOB".to_string(),
            other => return Err(self.unsupported(other)),
        })
    }

    fn table_names_query(&self) -> &'static str {
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
    }

    fn catalog_query(&self) -> &'static str {
        r#"SELECT name, type, "notnull" FROM pragma_table_info(?) ORDER BY cid"#
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }
}
