//! Streaming extraction into CSV
//!
//! Rows are fetched, transformed, encoded and written one at a time, so
//! memory stays bounded by the width of a row.

use futures::StreamExt;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::csv_codec::CsvSink;
use crate::database::Database;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::inspect::table_exists;
use crate::schema::{Column, Table};
use crate::script::ScriptEngine;
use crate::table_extract::{ComputedColumn, TableExtract};
use crate::transform::TransformPipeline;
use crate::workflow::RowCounter;

/// Extraction settings shared by every table of an invocation
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Directory receiving the intermediate CSV files
    pub work_dir: PathBuf,

    /// Stop after this many rows; the source query still runs in full
    pub preview_limit: Option<u64>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            preview_limit: None,
        }
    }
}

/// Source columns whose names also exist in `destination`, in source order
pub fn importable_columns(destination: &Table, source: &Table) -> Vec<Column> {
    source
        .columns
        .iter()
        .filter(|column| destination.column(&column.name).is_some())
        .cloned()
        .collect()
}

/// What to extract from one table
#[derive(Debug, Clone, Copy)]
pub struct ExtractRequest<'a> {
    /// Inspected source table, computed columns included
    pub table: &'a Table,
    /// Columns to emit; computed ones are evaluated, the rest selected
    pub columns: &'a [Column],
    /// Optional filter appended as `WHERE`
    pub where_statement: Option<&'a str>,
    /// Column transforms by column name
    pub column_transforms: &'a BTreeMap<String, Vec<String>>,
    /// Computed column functions
    pub computed_columns: &'a [ComputedColumn],
}

/// Extracts tables from one source connection
pub struct Extractor<'a> {
    db: &'a dyn Database,
    engine: &'a ScriptEngine,
    rows: &'a RowCounter,
    options: &'a ExtractOptions,
}

impl<'a> Extractor<'a> {
    /// Create an extractor counting rows into `rows`
    pub fn new(
        db: &'a dyn Database,
        engine: &'a ScriptEngine,
        rows: &'a RowCounter,
        options: &'a ExtractOptions,
    ) -> Self {
        Self {
            db,
            engine,
            rows,
            options,
        }
    }

    /// Extract `request` into a new CSV file and return its path
    ///
    /// On error the partially written file stays on disk.
    pub async fn extract(&self, request: ExtractRequest<'_>) -> Result<PathBuf> {
        let table = request.table;
        if !table_exists(self.db, &table.name).await? {
            return Err(Error::TableNotFound {
                table: table.name.clone(),
                source_name: self.db.source().to_string(),
            });
        }

        if let Some(unknown) = request
            .column_transforms
            .keys()
            .find(|name| table.column(name).is_none())
        {
            return Err(Error::config(format!(
                "transform configured for column '{unknown}' which is not in '{}'",
                table.name
            )));
        }

        let selected: Vec<Column> = request
            .columns
            .iter()
            .filter(|c| !c.is_computed())
            .cloned()
            .collect();
        let computed: Vec<&ComputedColumn> = request
            .computed_columns
            .iter()
            .filter(|c| request.columns.iter().any(|col| col.name.eq_ignore_ascii_case(&c.name)))
            .collect();
        let transforms: BTreeMap<String, Vec<String>> = request
            .column_transforms
            .iter()
            .filter(|(name, _)| selected.iter().any(|c| c.name.eq_ignore_ascii_case(name)))
            .map(|(name, functions)| (name.clone(), functions.clone()))
            .collect();

        let computed_specs: Vec<ComputedColumn> = computed.iter().map(|c| (*c).clone()).collect();
        let pipeline =
            TransformPipeline::compile(self.engine, &selected, &transforms, &computed_specs)?;

        let mut csv_columns = selected.clone();
        csv_columns.extend(computed.iter().map(|c| c.to_column()));

        let sql = select_statement(self.db.dialect(), table, &selected, request.where_statement);
        let mut sink = CsvSink::create(
            &self.options.work_dir,
            &table.name,
            self.db.source(),
            &csv_columns,
        )?;

        tracing::info!(
            database = %self.db.source(),
            table = %table.name,
            file = %sink.path().display(),
            "Extracting"
        );
        tracing::debug!(%sql, "Extract query");

        let mut extracted: u64 = 0;
        let mut stream = self.db.fetch(&sql);
        while let Some(row) = stream.next().await {
            let row = row?;
            self.rows.increment();
            extracted += 1;
            let row = pipeline.process(row)?;
            sink.write_row(&row)?;
            if self.options.preview_limit.is_some_and(|limit| extracted >= limit) {
                tracing::debug!(rows = extracted, "Preview limit reached");
                break;
            }
        }
        drop(stream);

        let (path, rows) = sink.finish()?;
        tracing::info!(table = %table.name, rows, file = %path.display(), "Extracted");
        Ok(path)
    }

    /// Extract `table` with its configured policy, restricted to the
    /// columns `destination` already has when it exists
    pub async fn extract_source(
        &self,
        table: &Table,
        destination: Option<&Table>,
        extract: &TableExtract,
    ) -> Result<PathBuf> {
        let columns = match destination {
            Some(destination) => importable_columns(destination, table),
            None => table.columns.clone(),
        };
        let where_statement = extract
            .load_options
            .where_statement(self.db.dialect(), chrono::Local::now().naive_local());

        self.extract(ExtractRequest {
            table,
            columns: &columns,
            where_statement: where_statement.as_deref(),
            column_transforms: &extract.column_transforms,
            computed_columns: &extract.computed_columns,
        })
        .await
    }
}

/// `SELECT` reading `columns` of `table`, optionally filtered
pub fn select_statement(
    dialect: &dyn Dialect,
    table: &Table,
    columns: &[Column],
    filter: Option<&str>,
) -> String {
    let columns = columns
        .iter()
        .map(|c| dialect.select_expression(c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("SELECT {columns} FROM {}", dialect.quote_ident(&table.name));
    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqlDatabase;
    use crate::dialect::DialectKind;
    use crate::inspect::inspect_with_computed;
    use crate::schema::DataType;
    use tempfile::TempDir;

    async fn widgets() -> SqlDatabase {
        let db = SqlDatabase::connect("shop", "sqlite::memory:", DialectKind::Sqlite)
            .await
            .unwrap();
        db.execute("CREATE TABLE widgets (id INTEGER NOT NULL, name VARCHAR(20), price REAL)")
            .await
            .unwrap();
        db.execute("INSERT INTO widgets VALUES (1, 'a', 1.5), (2, 'b', 2.0), (3, 'c', NULL)")
            .await
            .unwrap();
        db
    }

    fn options(dir: &TempDir, preview_limit: Option<u64>) -> ExtractOptions {
        ExtractOptions {
            work_dir: dir.path().to_path_buf(),
            preview_limit,
        }
    }

    #[test]
    fn test_importable_columns() {
        let source = Table::new(
            "shop",
            "widgets",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("name", DataType::String),
                Column::new("internal", DataType::Text),
            ],
        );
        let destination = Table::new(
            "warehouse",
            "shop_widgets",
            vec![
                Column::new("NAME", DataType::String),
                Column::new("id", DataType::Integer),
                Column::new("loaded_at", DataType::Datetime),
            ],
        );
        let names: Vec<_> = importable_columns(&destination, &source)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn test_select_statement_casts_unknown_columns_on_postgres() {
        let table = Table::new(
            "crm",
            "people",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("ref", DataType::Unknown),
            ],
        );
        assert_eq!(
            select_statement(
                DialectKind::Postgres.dialect(),
                &table,
                &table.columns,
                Some("\"id\" > 1")
            ),
            r#"SELECT "id", "ref"::text AS "ref" FROM "people" WHERE "id" > 1"#
        );
        assert_eq!(
            select_statement(DialectKind::Redshift.dialect(), &table, &table.columns, None),
            r#"SELECT "id", "ref"::text AS "ref" FROM "people""#
        );
        assert_eq!(
            select_statement(DialectKind::Sqlite.dialect(), &table, &table.columns, None),
            r#"SELECT "id", "ref" FROM "people""#
        );
    }

    #[tokio::test]
    async fn test_preview_limit_truncates_client_side() {
        let db = widgets().await;
        let dir = TempDir::new().unwrap();
        let engine = ScriptEngine::new();
        let rows = RowCounter::new();
        let options = options(&dir, Some(2));
        let extractor = Extractor::new(&db, &engine, &rows, &options);
        let table = inspect_with_computed(&db, "widgets", &[]).await.unwrap();

        let path = extractor
            .extract_source(&table, None, &TableExtract::default())
            .await
            .unwrap();

        assert_eq!(rows.get(), 2);
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "id,name,price\n1,a,1.5\n2,b,2\n"
        );
    }

    #[tokio::test]
    async fn test_transform_error_leaves_partial_file() {
        let db = widgets().await;
        let dir = TempDir::new().unwrap();
        let engine = ScriptEngine::new();
        let rows = RowCounter::new();
        let options = options(&dir, None);
        let extractor = Extractor::new(&db, &engine, &rows, &options);
        let table = inspect_with_computed(&db, "widgets", &[]).await.unwrap();
        let extract: TableExtract =
            serde_yaml::from_str("transforms:\n  price: [\"value + 1\"]\n").unwrap();

        let err = extractor
            .extract_source(&table, None, &extract)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TransformError { .. }), "{err}");
        assert_eq!(rows.get(), 3);
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_table() {
        let db = widgets().await;
        let dir = TempDir::new().unwrap();
        let engine = ScriptEngine::new();
        let rows = RowCounter::new();
        let options = options(&dir, None);
        let extractor = Extractor::new(&db, &engine, &rows, &options);
        let table = Table::new("shop", "gadgets", vec![Column::new("id", DataType::Integer)]);

        let err = extractor
            .extract_source(&table, None, &TableExtract::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TableNotFound { .. }));
        assert_eq!(rows.get(), 0);
    }
}
