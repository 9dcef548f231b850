//! Amazon Redshift type mapping
//!
//! Redshift speaks the PostgreSQL catalog, with these differences:
//! - `STRING` without `LENGTH` is stored as `VARCHAR(256)`; `LENGTH` is capped at 65535
//! - `TEXT` is stored as `VARCHAR(65535)` and reads back as `STRING` with `LENGTH: 65535`
//! - a native `text` column reads as `STRING` with `LENGTH: 256`
//! - `DECIMAL` `PRECISION` is capped at 38 and `SCALE` at 37
//! - `BLOB` is not supported
//!
//! Integer and float widths normalize as for PostgreSQL.

use super::postgres::{self, PG_CATALOG, PG_TABLE_NAMES};
use super::{Dialect, DialectKind, NativeType, options, precision_scale};
use crate::error::Result;
use crate::schema::{Column, ColumnOption, DataType, Options};

const DEFAULT_VARCHAR: i64 = 256;
const MAX_VARCHAR: i64 = 65_535;
const MAX_PRECISION: i64 = 38;
const MAX_SCALE: i64 = 37;

/// Amazon Redshift dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct RedshiftDialect;

impl Dialect for RedshiftDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Redshift
    }

    fn human_name(&self) -> &'static str {
        "Redshift"
    }

    fn terminal_command(&self) -> Option<&'static str> {
        Some("psql")
    }

    fn native_to_generic(&self, native: &str) -> (DataType, Options) {
        let native = NativeType::parse(native);
        match native.name.as_str() {
            "text" => (
                DataType::String,
                options([(ColumnOption::Length, Some(DEFAULT_VARCHAR))]),
            ),
            _ => postgres::decode(&native),
        }
    }

    fn generic_to_native(&self, data_type: DataType, options: &Options) -> Result<String> {
        if let Some(native) = postgres::encode_number(data_type, options) {
            return Ok(native.to_string());
        }
        Ok(match data_type {
            DataType::String => {
                let length = options
                    .get(&ColumnOption::Length)
                    .copied()
                    .unwrap_or(DEFAULT_VARCHAR);
                format!("VARCHAR({})", length.min(MAX_VARCHAR))
            }
            DataType::Text => format!("VARCHAR({MAX_VARCHAR})"),
            DataType::Decimal => format!(
                "NUMERIC{}",
                precision_scale(options, MAX_PRECISION, MAX_SCALE)
            ),
            DataType::Boolean => "BOOLEAN".to_string(),
            DataType::Date => "DATE".to_string(),
            DataType::Datetime => "TIMESTAMP".to_string(),
            other => return Err(self.unsupported(other)),
        })
    }

    fn table_names_query(&self) -> &'static str {
        PG_TABLE_NAMES
    }

    fn catalog_query(&self) -> &'static str {
        PG_CATALOG
    }

    fn select_expression(&self, column: &Column) -> String {
        postgres::select_expression(self, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use rstest::rstest;

    fn round_trip(column: &Column) -> Column {
        let native = RedshiftDialect
            .generic_to_native(column.data_type, &column.options)
            .unwrap();
        let (data_type, options) = RedshiftDialect.native_to_generic(&native);
        Column {
            name: column.name.clone(),
            data_type,
            options,
        }
    }

    #[rstest]
    #[case(Column::new("c", DataType::String).with_option(ColumnOption::Length, 100))]
    #[case(Column::new("c", DataType::Integer))]
    #[case(Column::new("c", DataType::Integer).with_option(ColumnOption::Bytes, 8))]
    #[case(Column::new("c", DataType::Float).with_option(ColumnOption::Bytes, 4))]
    #[case(Column::new("c", DataType::Decimal)
        .with_option(ColumnOption::Precision, 18)
        .with_option(ColumnOption::Scale, 4))]
    #[case(Column::new("c", DataType::Boolean))]
    #[case(Column::new("c", DataType::Date))]
    #[case(Column::new("c", DataType::Datetime))]
    fn test_round_trip(#[case] column: Column) {
        assert_eq!(round_trip(&column), column);
    }

    #[rstest]
    #[case(
        Column::new("c", DataType::String),
        Column::new("c", DataType::String).with_option(ColumnOption::Length, 256)
    )]
    #[case(
        Column::new("c", DataType::Text),
        Column::new("c", DataType::String).with_option(ColumnOption::Length, 65_535)
    )]
    #[case(
        Column::new("c", DataType::String).with_option(ColumnOption::Length, 100_000),
        Column::new("c", DataType::String).with_option(ColumnOption::Length, 65_535)
    )]
    #[case(
        Column::new("c", DataType::Decimal)
            .with_option(ColumnOption::Precision, 50)
            .with_option(ColumnOption::Scale, 40),
        Column::new("c", DataType::Decimal)
            .with_option(ColumnOption::Precision, 38)
            .with_option(ColumnOption::Scale, 37)
    )]
    fn test_round_trip_clamped(#[case] column: Column, #[case] expected: Column) {
        assert_eq!(round_trip(&column), expected);
    }

    #[test]
    fn test_native_text_reads_as_varchar_256() {
        let (data_type, options) = RedshiftDialect.native_to_generic("text");
        assert_eq!(data_type, DataType::String);
        assert_eq!(options.get(&ColumnOption::Length), Some(&256));
    }

    #[test]
    fn test_blob_unsupported() {
        let err = RedshiftDialect
            .generic_to_native(DataType::Blob, &Options::new())
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
