//! Loading CSV files into destination tables
//!
//! The CSV is first copied into a staging table with batched INSERTs; one
//! transaction then applies the load strategy to the destination:
//!
//! | Strategy                    | Statements                                               |
//! |-----------------------------|----------------------------------------------------------|
//! | Full                        | `DELETE FROM dest`, `INSERT INTO dest SELECT … staging`  |
//! | Incremental, ModifiedOnly   | `DELETE FROM dest WHERE pk IN (SELECT pk FROM staging)`, |
//! |                             | `INSERT INTO dest SELECT … staging` (last row per pk)    |
//!
//! Staging rows carry their CSV row number, so when the file repeats a
//! primary key only the last occurrence reaches the destination.
//!
//! The staging table is dropped whether or not the load succeeded.

use std::path::Path;

use crate::csv_codec::CsvSource;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::inspect::{inspect, table_exists};
use crate::schema::{Column, ColumnOption, DataType, Table};
use crate::strategy::{LoadOptions, LoadStrategy};

/// Rows per staging INSERT statement
pub const INSERT_BATCH_SIZE: usize = 500;

/// Staging column holding each row's position in the CSV file
pub const ROW_NUMBER_COLUMN: &str = "_teleport_row";

/// Create `name` from `source`'s columns unless it already exists, then
/// return its inspected descriptor
pub async fn create_table_if_not_exists(
    db: &dyn Database,
    name: &str,
    source: &Table,
) -> Result<Table> {
    if !table_exists(db, name).await? {
        let ddl = db.dialect().generate_create_table_statement(source, name)?;
        tracing::info!(database = %db.source(), table = name, "Creating destination table");
        tracing::debug!(%ddl, "Create table statement");
        db.execute(&ddl).await?;
    }
    inspect(db, name).await
}

/// Destination columns for a CSV file's header, in header order
pub fn csv_columns(path: &Path, destination: &Table) -> Result<Vec<Column>> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .headers()?
        .iter()
        .map(|name| {
            destination.column(name).cloned().ok_or_else(|| Error::Load {
                table: destination.name.clone(),
                row: None,
                message: format!("CSV column '{name}' does not exist in the destination table"),
            })
        })
        .collect()
}

/// Load `csv` into `destination` under `options`, returning the CSV's row count
///
/// `columns` is the CSV's column order; each must exist in `destination`.
pub async fn load(
    db: &dyn Database,
    destination: &Table,
    columns: &[Column],
    csv: &Path,
    options: &LoadOptions,
) -> Result<u64> {
    options.validate()?;
    let dialect = db.dialect();

    let load_columns = columns
        .iter()
        .map(|column| staging_column(destination, column))
        .collect::<Result<Vec<_>>>()?;

    let primary_key = match options.strategy {
        LoadStrategy::Full => None,
        LoadStrategy::Incremental | LoadStrategy::ModifiedOnly => {
            let key = options.primary_key.as_deref().unwrap_or_default();
            let column = load_columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(key))
                .ok_or_else(|| {
                    Error::config(format!(
                        "primary key '{key}' is not among the loaded columns of '{}'",
                        destination.name
                    ))
                })?;
            Some(column.name.clone())
        }
    };

    let staging_name = format!(
        "{}_staging_{}",
        destination.name,
        &uuid::Uuid::new_v4().simple().to_string()[..8]
    );
    let mut staging_columns = load_columns.clone();
    staging_columns.push(
        Column::new(ROW_NUMBER_COLUMN, DataType::Integer).with_option(ColumnOption::Bytes, 8),
    );
    let staging = Table::new(destination.source.clone(), &staging_name, staging_columns);
    db.execute(&dialect.generate_create_table_statement(&staging, &staging_name)?)
        .await?;

    tracing::info!(
        table = %destination.name,
        strategy = %options.strategy,
        file = %csv.display(),
        "Loading"
    );
    let result = apply(
        db,
        destination,
        &staging,
        &load_columns,
        csv,
        primary_key.as_deref(),
    )
    .await;

    if let Err(e) = db
        .execute(&format!("DROP TABLE {}", dialect.quote_ident(&staging_name)))
        .await
    {
        tracing::warn!(table = %staging_name, error = %e, "Failed to drop staging table");
    }

    let rows = result?;
    tracing::info!(table = %destination.name, rows, "Loaded");
    Ok(rows)
}

/// Destination-typed column for the staging table; constraints are dropped
fn staging_column(destination: &Table, column: &Column) -> Result<Column> {
    let mut staged = destination
        .column(&column.name)
        .cloned()
        .ok_or_else(|| Error::Load {
            table: destination.name.clone(),
            row: None,
            message: format!("column '{}' does not exist in the destination table", column.name),
        })?;
    staged.options.remove(&ColumnOption::Nullable);
    staged.options.remove(&ColumnOption::Computed);
    if staged.data_type == DataType::Unknown {
        staged.data_type = DataType::Text;
        staged.options.clear();
    }
    Ok(staged)
}

async fn apply(
    db: &dyn Database,
    destination: &Table,
    staging: &Table,
    columns: &[Column],
    csv: &Path,
    primary_key: Option<&str>,
) -> Result<u64> {
    let dialect = db.dialect();
    let column_list = columns
        .iter()
        .map(|c| dialect.quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let row_number = dialect.quote_ident(ROW_NUMBER_COLUMN);
    let staging_list = format!("{column_list}, {row_number}");
    let staging_ident = dialect.quote_ident(&staging.name);
    let destination_ident = dialect.quote_ident(&destination.name);

    let mut rows: u64 = 0;
    let mut batch: Vec<String> = Vec::with_capacity(INSERT_BATCH_SIZE);
    for row in CsvSource::open(csv, &destination.name, columns)? {
        let values = row?
            .iter()
            .map(|value| dialect.literal(value))
            .collect::<Vec<_>>()
            .join(", ");
        rows += 1;
        batch.push(format!("({values}, {rows})"));
        if batch.len() == INSERT_BATCH_SIZE {
            insert_batch(db, &destination.name, &staging_ident, &staging_list, &mut batch, rows)
                .await?;
        }
    }
    insert_batch(db, &destination.name, &staging_ident, &staging_list, &mut batch, rows).await?;

    let (delete, insert) = match primary_key {
        None => (
            format!("DELETE FROM {destination_ident}"),
            format!(
                "INSERT INTO {destination_ident} ({column_list}) SELECT {column_list} FROM {staging_ident}"
            ),
        ),
        Some(key) => {
            let key = dialect.quote_ident(key);
            (
                format!(
                    "DELETE FROM {destination_ident} WHERE {key} IN (SELECT {key} FROM {staging_ident})"
                ),
                format!(
                    "INSERT INTO {destination_ident} ({column_list}) \
                     SELECT {column_list} FROM {staging_ident} s \
                     WHERE s.{key} IS NULL OR s.{row_number} = \
                     (SELECT MAX(t.{row_number}) FROM {staging_ident} t WHERE t.{key} = s.{key})"
                ),
            )
        }
    };
    db.execute_in_transaction(&[delete, insert])
        .await
        .map_err(|e| Error::Load {
            table: destination.name.clone(),
            row: None,
            message: e.to_string(),
        })?;
    Ok(rows)
}

async fn insert_batch(
    db: &dyn Database,
    table: &str,
    staging: &str,
    column_list: &str,
    batch: &mut Vec<String>,
    rows: u64,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    let first = rows - batch.len() as u64 + 1;
    let sql = format!("INSERT INTO {staging} ({column_list}) VALUES {}", batch.join(", "));
    batch.clear();
    db.execute(&sql).await.map_err(|e| Error::Load {
        table: table.to_string(),
        row: None,
        message: format!("rows {first}-{rows}: {e}"),
    })?;
    Ok(())
}
