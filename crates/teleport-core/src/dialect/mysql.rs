//! MySQL type mapping
//!
//! Clamps and normalizations:
//! - `STRING` without `LENGTH` is stored as `VARCHAR(255)`; `LENGTH` is capped at 65535
//! - `TEXT` is stored as `LONGTEXT`
//! - `INTEGER` `BYTES` 1, 2, 8 map to `TINYINT`, `SMALLINT`, `BIGINT`; 4 (the
//!   default) maps to `INT` and reads back without `BYTES`; `MEDIUMINT` also
//!   reads as the default width
//! - `FLOAT` with `BYTES: 4` is `FLOAT`; the default is `DOUBLE`
//! - `DECIMAL` `PRECISION` is capped at 65 and `SCALE` at 30
//! - `BOOLEAN` is `TINYINT(1)`
//! - `unsigned` and `zerofill` are dropped when reading

use super::{Dialect, DialectKind, NativeType, options, precision_scale};
use crate::error::Result;
use crate::schema::{ColumnOption, DataType, Options};

const DEFAULT_VARCHAR: i64 = 255;
const MAX_VARCHAR: i64 = 65_535;
const MAX_PRECISION: i64 = 65;
const MAX_SCALE: i64 = 30;

/// MySQL dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

fn strip_modifiers(value: &str) -> String {
    value
        .split_whitespace()
        .filter(|word| !matches!(*word, "unsigned" | "signed" | "zerofill"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mysql
    }

    fn human_name(&self) -> &'static str {
        "MySQL"
    }

    fn terminal_command(&self) -> Option<&'static str> {
        Some("mysql")
    }

    fn native_to_generic(&self, native: &str) -> (DataType, Options) {
        use ColumnOption::*;

        let native = NativeType::parse(native);
        let name = strip_modifiers(&native.name);
        match name.as_str() {
            "tinyint" if native.param(0) == Some(1) => (DataType::Boolean, Options::new()),
            "bool" | "boolean" => (DataType::Boolean, Options::new()),
            "tinyint" => (DataType::Integer, options([(Bytes, Some(1))])),
            "smallint" => (DataType::Integer, options([(Bytes, Some(2))])),
            "mediumint" | "int" | "integer" => (DataType::Integer, Options::new()),
            "bigint" => (DataType::Integer, options([(Bytes, Some(8))])),
            "float" => (DataType::Float, options([(Bytes, Some(4))])),
            "double" | "double precision" | "real" => (DataType::Float, Options::new()),
            "decimal" | "numeric" | "dec" | "fixed" => (
                DataType::Decimal,
                options([(Precision, native.param(0)), (Scale, native.param(1))]),
            ),
            "varchar" | "char" | "nvarchar" | "nchar" => {
                (DataType::String, options([(Length, native.param(0))]))
            }
            "tinytext" | "text" | "mediumtext" | "longtext" => (DataType::Text, Options::new()),
            "date" => (DataType::Date, Options::new()),
            "datetime" | "timestamp" => (DataType::Datetime, Options::new()),
            "tinyblob" | "blob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
                (DataType::Blob, Options::new())
            }
            _ => (DataType::Unknown, Options::new()),
        }
    }

    fn generic_to_native(&self, data_type: DataType, options: &Options) -> Result<String> {
        let bytes = options.get(&ColumnOption::Bytes).copied();
        Ok(match data_type {
            DataType::String => {
                let length = options
                    .get(&ColumnOption::Length)
                    .copied()
                    .unwrap_or(DEFAULT_VARCHAR);
                format!("VARCHAR({})", length.min(MAX_VARCHAR))
            }
            DataType::Text => "LONGTEXT".to_string(),
            DataType::Integer => match bytes {
                Some(1) => "TINYINT",
                Some(2) => "SMALLINT",
                Some(8) => "BIGINT",
                _ => "INT",
            }
            .to_string(),
            DataType::Float => match bytes {
                Some(4) => "FLOAT",
                _ => "DOUBLE",
            }
            .to_string(),
            DataType::Decimal => format!(
                "DECIMAL{}",
                precision_scale(options, MAX_PRECISION, MAX_SCALE)
            ),
            DataType::Boolean => "TINYINT(1)".to_string(),
            DataType::Date => "DATE".to_string(),
            DataType::Datetime => "DATETIME".to_string(),
            DataType::Blob => "LONGBLOB".to_string(),
            other => return Err(self.unsupported(other)),
        })
    }

    fn table_names_query(&self) -> &'static str {
        "SELECT TABLE_NAME FROM information_schema.TABLES \
         WHERE TABLE_SCHEMA = DATABASE() ORDER BY TABLE_NAME"
    }

    fn catalog_query(&self) -> &'static str {
        "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE = 'NO' \
         FROM information_schema.COLUMNS \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
         ORDER BY ORDINAL_POSITION"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use rstest::rstest;

    fn round_trip(column: &Column) -> Column {
        let native = MySqlDialect
            .generic_to_native(column.data_type, &column.options)
            .unwrap();
        let (data_type, options) = MySqlDialect.native_to_generic(&native);
        Column {
            name: column.name.clone(),
            data_type,
            options,
        }
    }

    #[rstest]
    #[case(Column::new("c", DataType::String).with_option(ColumnOption::Length, 80))]
    #[case(Column::new("c", DataType::Text))]
    #[case(Column::new("c", DataType::Integer))]
    #[case(Column::new("c", DataType::Integer).with_option(ColumnOption::Bytes, 1))]
    #[case(Column::new("c", DataType::Integer).with_option(ColumnOption::Bytes, 2))]
    #[case(Column::new("c", DataType::Integer).with_option(ColumnOption::Bytes, 8))]
    #[case(Column::new("c", DataType::Float))]
    #[case(Column::new("c", DataType::Float).with_option(ColumnOption::Bytes, 4))]
    #[case(Column::new("c", DataType::Decimal)
        .with_option(ColumnOption::Precision, 10)
        .with_option(ColumnOption::Scale, 2))]
    #[case(Column::new("c", DataType::Boolean))]
    #[case(Column::new("c", DataType::Date))]
    #[case(Column::new("c", DataType::Datetime))]
    #[case(Column::new("c", DataType::Blob))]
    fn test_round_trip(#[case] column: Column) {
        assert_eq!(round_trip(&column), column);
    }

    #[rstest]
    #[case(
        Column::new("c", DataType::String),
        Column::new("c", DataType::String).with_option(ColumnOption::Length, 255)
    )]
    #[case(
        Column::new("c", DataType::Integer).with_option(ColumnOption::Bytes, 4),
        Column::new("c", DataType::Integer)
    )]
    #[case(
        Column::new("c", DataType::Decimal)
            .with_option(ColumnOption::Precision, 80)
            .with_option(ColumnOption::Scale, 35),
        Column::new("c", DataType::Decimal)
            .with_option(ColumnOption::Precision, 65)
            .with_option(ColumnOption::Scale, 30)
    )]
    fn test_round_trip_clamped(#[case] column: Column, #[case] expected: Column) {
        assert_eq!(round_trip(&column), expected);
    }

    #[rstest]
    #[case("int(11)", DataType::Integer, None)]
    #[case("bigint(20) unsigned", DataType::Integer, Some(8))]
    #[case("int unsigned zerofill", DataType::Integer, None)]
    #[case("tinyint(4)", DataType::Integer, Some(1))]
    #[case("tinyint(1)", DataType::Boolean, None)]
    #[case("mediumint(9)", DataType::Integer, None)]
    #[case("enum('a','b')", DataType::Unknown, None)]
    fn test_native_to_generic(
        #[case] native: &str,
        #[case] data_type: DataType,
        #[case] bytes: Option<i64>,
    ) {
        let (actual, options) = MySqlDialect.native_to_generic(native);
        assert_eq!(actual, data_type);
        assert_eq!(options.get(&ColumnOption::Bytes).copied(), bytes);
    }

    #[test]
    fn test_quoting() {
        assert_eq!(MySqlDialect.quote_ident("order"), "`order`");
        assert_eq!(MySqlDialect.boolean_literal(true), "1");
    }
}
