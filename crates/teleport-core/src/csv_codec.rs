//! Intermediate CSV files
//!
//! The extractor writes one header-bearing CSV per run, named
//! `extract-<table>-<source>-<random>.csv`; the loader reads it back with
//! each cell parsed by its column's [`DataType`].
//!
//! NULL is written as `\N`. Text starting with a backslash gets one more
//! backslash so it never reads back as NULL. An empty cell is the empty
//! string for text columns and NULL for every other type, which keeps
//! hand-written files with blank numbers loadable.

use chrono::{NaiveDate, NaiveDateTime};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::schema::{Column, DataType};
use crate::value::{DATE_FORMAT, Value};

/// Cell text standing for NULL
pub const NULL_CELL: &str = "\\N";

/// Encode one cell
pub fn format_cell(value: &Value, data_type: DataType) -> String {
    match (data_type, value) {
        (_, Value::Null) => NULL_CELL.to_string(),
        (DataType::Date, Value::DateTime(dt)) => dt.date().format(DATE_FORMAT).to_string(),
        (_, Value::String(s)) if s.starts_with('\\') => format!("\\{s}"),
        _ => value.to_string(),
    }
}

/// Decode one cell
pub fn parse_cell(text: &str, data_type: DataType) -> std::result::Result<Value, String> {
    if text == NULL_CELL {
        return Ok(Value::Null);
    }
    if text.is_empty() {
        return Ok(match data_type {
            DataType::String | DataType::Text | DataType::Unknown => Value::String(String::new()),
            _ => Value::Null,
        });
    }
    let text = text.strip_prefix('\\').filter(|t| t.starts_with('\\')).unwrap_or(text);
    match data_type {
        DataType::String | DataType::Text | DataType::Decimal | DataType::Unknown => {
            Ok(Value::String(text.to_string()))
        }
        DataType::Integer => text
            .trim()
            .parse()
            .map(Value::Integer)
            .map_err(|_| format!("invalid integer '{text}'")),
        DataType::Float => text
            .trim()
            .parse()
            .map(Value::Float)
            .map_err(|_| format!("invalid float '{text}'")),
        DataType::Boolean => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(Value::Boolean(true)),
            "false" | "f" | "0" => Ok(Value::Boolean(false)),
            _ => Err(format!("invalid boolean '{text}'")),
        },
        DataType::Date => NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
            .map(Value::Date)
            .map_err(|_| format!("invalid date '{text}'")),
        DataType::Datetime => Ok(parse_datetime(text.trim())
            .map(Value::DateTime)
            .unwrap_or_else(|| Value::String(text.to_string()))),
        DataType::Blob => hex::decode(text.trim())
            .map(Value::Bytes)
            .map_err(|e| format!("invalid hex '{text}': {e}")),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Writer for one extraction's CSV file
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
    types: Vec<DataType>,
    rows: u64,
}

impl CsvSink {
    /// Create `extract-<table>-<source>-*.csv` in `work_dir` and write the header
    ///
    /// The file is kept on disk even if extraction later fails.
    pub fn create(work_dir: &Path, table: &str, source: &str, columns: &[Column]) -> Result<Self> {
        std::fs::create_dir_all(work_dir)?;
        let (file, path) = tempfile::Builder::new()
            .prefix(&format!("extract-{table}-{source}-"))
            .suffix(".csv")
            .tempfile_in(work_dir)?
            .keep()
            .map_err(|e| Error::Io(e.error))?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(columns.iter().map(|c| c.name.as_str()))?;
        Ok(Self {
            path,
            writer,
            types: columns.iter().map(|c| c.data_type).collect(),
            rows: 0,
        })
    }

    /// Path of the file being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode and write one row
    pub fn write_row(&mut self, row: &[Value]) -> Result<()> {
        if row.len() != self.types.len() {
            return Err(Error::config(format!(
                "row has {} values, expected {}",
                row.len(),
                self.types.len()
            )));
        }
        self.writer.write_record(
            row.iter()
                .zip(&self.types)
                .map(|(value, data_type)| format_cell(value, *data_type)),
        )?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and return the file path and data row count
    pub fn finish(mut self) -> Result<(PathBuf, u64)> {
        self.writer.flush()?;
        Ok((self.path, self.rows))
    }
}

/// Reader for a CSV file written by [`CsvSink`]
pub struct CsvSource {
    table: String,
    records: csv::StringRecordsIntoIter<File>,
    types: Vec<DataType>,
    row: u64,
}

impl CsvSource {
    /// Open `path` and check its header against `columns`
    pub fn open(path: &Path, table: &str, columns: &[Column]) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let matches = header.len() == columns.len()
            && header
                .iter()
                .zip(columns)
                .all(|(name, column)| name.eq_ignore_ascii_case(&column.name));
        if !matches {
            return Err(Error::Load {
                table: table.to_string(),
                row: None,
                message: format!(
                    "CSV header {header:?} does not match columns {:?}",
                    columns.iter().map(|c| &c.name).collect::<Vec<_>>()
                ),
            });
        }
        Ok(Self {
            table: table.to_string(),
            records: reader.into_records(),
            types: columns.iter().map(|c| c.data_type).collect(),
            row: 0,
        })
    }
}

impl Iterator for CsvSource {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.row += 1;
        let row = self.row;
        let load_error = |message: String| Error::Load {
            table: self.table.clone(),
            row: Some(row),
            message,
        };

        Some(record.map_err(Error::from).and_then(|record| {
            if record.len() != self.types.len() {
                return Err(load_error(format!(
                    "expected {} cells, found {}",
                    self.types.len(),
                    record.len()
                )));
            }
            record
                .iter()
                .zip(&self.types)
                .map(|(cell, data_type)| parse_cell(cell, *data_type).map_err(&load_error))
                .collect()
        }))
    }
}
