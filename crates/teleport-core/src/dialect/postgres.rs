//! PostgreSQL type mapping
//!
//! Clamps and normalizations:
//! - `INTEGER` with `BYTES: 4` (the default width) reads back without `BYTES`
//! - `INTEGER` with `BYTES: 1` is stored as `SMALLINT` and reads back as `BYTES: 2`
//! - `FLOAT` with `BYTES: 8` (the default) reads back without `BYTES`
//! - `STRING` `LENGTH` is capped at 10485760
//! - `DECIMAL` `PRECISION` and `SCALE` are capped at 1000

use super::{Dialect, DialectKind, NativeType, options, precision_scale};
use crate::error::Result;
use crate::schema::{Column, ColumnOption, DataType, Options};

pub(super) const MAX_VARCHAR: i64 = 10_485_760;
const MAX_NUMERIC: i64 = 1000;

/// PostgreSQL dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

/// Decode a native type shared by PostgreSQL and Redshift catalogs
pub(super) fn decode(native: &NativeType) -> (DataType, Options) {
    use ColumnOption::*;

    match native.name.as_str() {
        "smallint" | "int2" | "smallserial" => (DataType::Integer, options([(Bytes, Some(2))])),
        "integer" | "int" | "int4" | "serial" => (DataType::Integer, Options::new()),
        "bigint" | "int8" | "bigserial" => (DataType::Integer, options([(Bytes, Some(8))])),
        "real" | "float4" => (DataType::Float, options([(Bytes, Some(4))])),
        "double precision" | "float8" => (DataType::Float, Options::new()),
        "float" => match native.param(0) {
            Some(p) if p <= 24 => (DataType::Float, options([(Bytes, Some(4))])),
            _ => (DataType::Float, Options::new()),
        },
        "numeric" | "decimal" => (
            DataType::Decimal,
            options([(Precision, native.param(0)), (Scale, native.param(1))]),
        ),
        "character varying" | "varchar" | "character" | "char" | "bpchar" => {
            (DataType::String, options([(Length, native.param(0))]))
        }
        "text" => (DataType::Text, Options::new()),
        "boolean" | "bool" => (DataType::Boolean, Options::new()),
        "date" => (DataType::Date, Options::new()),
        "bytea" => (DataType::Blob, Options::new()),
        name if name.starts_with("timestamp") => (DataType::Datetime, Options::new()),
        _ => (DataType::Unknown, Options::new()),
    }
}

/// Unknown types are read as `::text`; binary results of uuid, json and
/// the like are not decodable as strings
pub(super) fn select_expression(dialect: &dyn Dialect, column: &Column) -> String {
    let ident = dialect.quote_ident(&column.name);
    match column.data_type {
        DataType::Unknown => format!("{ident}::text AS {ident}"),
        _ => ident,
    }
}

/// Integer and float widths shared by PostgreSQL and Redshift
pub(super) fn encode_number(data_type: DataType, options: &Options) -> Option<&'static str> {
    let bytes = options.get(&ColumnOption::Bytes).copied();
    match data_type {
        DataType::Integer => Some(match bytes {
            Some(1) | Some(2) => "SMALLINT",
            Some(8) => "BIGINT",
            _ => "INTEGER",
        }),
        DataType::Float => Some(match bytes {
            Some(4) => "REAL",
            _ => "DOUBLE PRECISION",
        }),
        _ => None,
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn human_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn terminal_command(&self) -> Option<&'static str> {
        Some("psql")
    }

    fn native_to_generic(&self, native: &str) -> (DataType, Options) {
        decode(&NativeType::parse(native))
    }

    fn generic_to_native(&self, data_type: DataType, options: &Options) -> Result<String> {
        if let Some(native) = encode_number(data_type, options) {
            return Ok(native.to_string());
        }
        Ok(match data_type {
            DataType::String => match options.get(&ColumnOption::Length) {
                Some(length) => format!("VARCHAR({})", (*length).min(MAX_VARCHAR)),
                None => "VARCHAR".to_string(),
            },
            DataType::Text => "TEXT".to_string(),
            DataType::Decimal => {
                format!("NUMERIC{}", precision_scale(options, MAX_NUMERIC, MAX_NUMERIC))
            }
            DataType::Boolean => "BOOLEAN".to_string(),
            DataType::Date => "DATE".to_string(),
            DataType::Datetime => "TIMESTAMP".to_string(),
            DataType::Blob => "BYTEA".to_string(),
            other => return Err(self.unsupported(other)),
        })
    }

    fn table_names_query(&self) -> &'static str {
        PG_TABLE_NAMES
    }

    fn catalog_query(&self) -> &'static str {
        PG_CATALOG
    }

    fn bytes_literal(&self, value: &[u8]) -> String {
        format!("decode('{}', 'hex')", hex::encode(value))
    }

    fn select_expression(&self, column: &Column) -> String {
        select_expression(self, column)
    }
}

pub(super) const PG_TABLE_NAMES: &str = "SELECT tablename::text FROM pg_catalog.pg_tables \
     WHERE schemaname = current_schema() ORDER BY tablename";

pub(super) const PG_CATALOG: &str = "SELECT a.attname::text, \
     format_type(a.atttypid, a.atttypmod)::text, a.attnotnull \
     FROM pg_catalog.pg_attribute a \
     JOIN pg_catalog.pg_class c ON c.oid = a.attrelid \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     WHERE c.relname = $1 AND n.nspname = current_schema() \
     AND a.attnum > 0 AND NOT a.attisdropped \
     ORDER BY a.attnum";
