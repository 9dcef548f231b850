//! Schema inspection
//!
//! Reads a live table's columns from the dialect's catalog and normalizes
//! each native type through the dialect's type mapper. Computed columns are
//! appended to the in-memory [`Table`] only.

use crate::database::Database;
use crate::error::{Error, Result};
use crate::schema::{Column, ColumnOption, Table};
use crate::table_extract::ComputedColumn;
use crate::value::Value;

/// Names of the tables visible to the connection
pub async fn table_names(db: &dyn Database) -> Result<Vec<String>> {
    let rows = db.fetch_all(db.dialect().table_names_query(), &[]).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .map(|name| name.to_string())
        .collect())
}

/// Whether `table` exists in the connected database
pub async fn table_exists(db: &dyn Database, table: &str) -> Result<bool> {
    Ok(table_names(db).await?.iter().any(|name| name == table))
}

/// Inspect `table`; fails with [`Error::TableNotFound`] when it does not exist
pub async fn inspect(db: &dyn Database, table: &str) -> Result<Table> {
    if !table_exists(db, table).await? {
        return Err(Error::TableNotFound {
            table: table.to_string(),
            source_name: db.source().to_string(),
        });
    }

    let dialect = db.dialect();
    let rows = db.fetch_all(dialect.catalog_query(), &[table]).await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let [name, native, not_null]: [Value; 3] = row.try_into().map_err(|row: Vec<Value>| {
            Error::config(format!(
                "catalog query for '{table}' returned {} columns, expected 3",
                row.len()
            ))
        })?;
        let native = native.to_string();
        let (data_type, mut options) = dialect.native_to_generic(&native);
        if is_true(&not_null) {
            options.insert(ColumnOption::Nullable, 0);
        }
        tracing::trace!(table, column = %name, %native, %data_type, "Inspected column");
        columns.push(Column {
            name: name.to_string(),
            data_type,
            options,
        });
    }

    tracing::debug!(
        database = %db.source(),
        table,
        columns = columns.len(),
        "Inspected table"
    );
    Ok(Table::new(db.source(), table, columns))
}

/// Inspect `table` and append `computed` columns after its own
pub async fn inspect_with_computed(
    db: &dyn Database,
    table: &str,
    computed: &[ComputedColumn],
) -> Result<Table> {
    let mut inspected = inspect(db, table).await?;
    inspected
        .columns
        .extend(computed.iter().map(ComputedColumn::to_column));
    inspected.validate()?;
    Ok(inspected)
}

fn is_true(value: &Value) -> bool {
    match value {
        Value::Boolean(b) => *b,
        Value::Integer(i) => *i != 0,
        Value::String(s) => matches!(s.as_str(), "1" | "t" | "true" | "YES"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqlDatabase;
    use crate::dialect::DialectKind;
    use crate::schema::DataType;

    async fn shop() -> SqlDatabase {
        let db = SqlDatabase::connect("shop", "sqlite::memory:", DialectKind::Sqlite)
            .await
            .unwrap();
        db.execute(
            "CREATE TABLE widgets (id BIGINT NOT NULL, name VARCHAR(40), price DECIMAL(10,2), \
             updated_at DATETIME, payload)",
        )
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_inspect_preserves_catalog_order() {
        let db = shop().await;
        let table = inspect(&db, "widgets").await.unwrap();

        assert_eq!(table.source, "shop");
        assert_eq!(
            table.column_names(),
            vec!["id", "name", "price", "updated_at", "payload"]
        );
        let id = &table.columns[0];
        assert_eq!(id.data_type, DataType::Integer);
        assert_eq!(id.option(ColumnOption::Bytes), Some(8));
        assert!(!id.is_nullable());
        assert_eq!(table.columns[1].option(ColumnOption::Length), Some(40));
        assert!(table.columns[1].is_nullable());
        assert_eq!(table.columns[2].data_type, DataType::Decimal);
        assert_eq!(table.columns[3].data_type, DataType::Datetime);
        assert_eq!(table.columns[4].data_type, DataType::Unknown);
    }

    #[tokio::test]
    async fn test_missing_table_is_not_found() {
        let db = shop().await;
        let err = inspect(&db, "gadgets").await.unwrap_err();
        assert_eq!(err.to_string(), "table \"gadgets\" not found in \"shop\"");
        assert!(!table_exists(&db, "gadgets").await.unwrap());
    }

    #[tokio::test]
    async fn test_computed_columns_are_appended() {
        let db = shop().await;
        let computed = vec![ComputedColumn {
            name: "name_hash".to_string(),
            data_type: DataType::String,
            options: [(ColumnOption::Length, 64)].into_iter().collect(),
            function: "name | sha256".to_string(),
        }];
        let table = inspect_with_computed(&db, "widgets", &computed)
            .await
            .unwrap();
        assert_eq!(table.columns.len(), 6);
        assert!(table.columns[5].is_computed());

        let live = inspect(&db, "widgets").await.unwrap();
        assert_eq!(live.columns.len(), 5);
    }

    #[tokio::test]
    async fn test_table_names() {
        let db = shop().await;
        db.execute("CREATE TABLE gadgets (id INTEGER)").await.unwrap();
        assert_eq!(table_names(&db).await.unwrap(), vec!["gadgets", "widgets"]);
    }
}
