//! Database connections
//!
//! [`Database`] is the seam between the pipeline and a live connection.
//! [`SqlDatabase`] implements it on sqlx pools; rows decode into [`Value`]s
//! by the driver's column type.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as _, Connection as _, Row, TypeInfo, ValueRef};
use std::str::FromStr;

use crate::dialect::{Dialect, DialectKind};
use crate::error::{Error, Result};
use crate::value::Value;

/// A live connection to one source
#[async_trait]
pub trait Database: Send + Sync {
    /// Source identifier
    fn source(&self) -> &str;

    /// Dialect of the connected database
    fn dialect(&self) -> &'static dyn Dialect;

    /// Round trip to the server
    async fn ping(&self) -> Result<()>;

    /// Run a query with positional text parameters and collect every row
    async fn fetch_all(&self, sql: &str, params: &[&str]) -> Result<Vec<Vec<Value>>>;

    /// Run a query and stream its rows one at a time
    fn fetch<'a>(&'a self, sql: &'a str) -> BoxStream<'a, Result<Vec<Value>>>;

    /// Execute a statement, returning the number of affected rows
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// Execute statements in order inside one transaction
    async fn execute_in_transaction(&self, statements: &[String]) -> Result<()>;
}

enum Pool {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

macro_rules! with_pool {
    ($pool:expr, $p:ident => $body:expr) => {
        match $pool {
            Pool::Postgres($p) => $body,
            Pool::MySql($p) => $body,
            Pool::Sqlite($p) => $body,
        }
    };
}

/// sqlx-backed [`Database`]
pub struct SqlDatabase {
    source: String,
    kind: DialectKind,
    pool: Pool,
}

impl std::fmt::Debug for SqlDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlDatabase")
            .field("source", &self.source)
            .field("kind", &self.kind)
            .finish()
    }
}

impl SqlDatabase {
    /// Open a single-connection pool for `url`
    pub async fn connect(source: &str, url: &str, kind: DialectKind) -> Result<Self> {
        let connection_error = |e: sqlx::Error| Error::Connection {
            source_name: source.to_string(),
            message: e.to_string(),
        };
        let url = driver_url(kind, url);

        tracing::debug!(database = %source, dialect = %kind, "Opening connection");
        let pool = match kind {
            DialectKind::Postgres | DialectKind::Redshift => Pool::Postgres(
                PgPoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect(&url)
                    .await
                    .map_err(connection_error)?,
            ),
            DialectKind::Mysql => Pool::MySql(
                MySqlPoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect(&url)
                    .await
                    .map_err(connection_error)?,
            ),
            DialectKind::Sqlite => {
                let options = SqliteConnectOptions::from_str(&url)
                    .map_err(connection_error)?
                    .create_if_missing(true);
                Pool::Sqlite(
                    SqlitePoolOptions::new()
                        .max_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None)
                        .connect_with(options)
                        .await
                        .map_err(connection_error)?,
                )
            }
        };

        Ok(Self {
            source: source.to_string(),
            kind,
            pool,
        })
    }
}

/// Rewrite the URL scheme to the one the sqlx driver expects
fn driver_url(kind: DialectKind, url: &str) -> String {
    let rest = url.split_once(':').map_or(url, |(_, rest)| rest);
    match kind {
        DialectKind::Postgres | DialectKind::Redshift => format!("postgres:{rest}"),
        DialectKind::Mysql => format!("mysql:{rest}"),
        DialectKind::Sqlite => format!("sqlite:{rest}"),
    }
}

#[async_trait]
impl Database for SqlDatabase {
    fn source(&self) -> &str {
        &self.source
    }

    fn dialect(&self) -> &'static dyn Dialect {
        self.kind.dialect()
    }

    async fn ping(&self) -> Result<()> {
        let result = with_pool!(&self.pool, p => match p.acquire().await {
            Ok(mut conn) => conn.ping().await,
            Err(e) => Err(e),
        });
        result.map_err(|e| Error::Connection {
            source_name: self.source.clone(),
            message: e.to_string(),
        })
    }

    async fn fetch_all(&self, sql: &str, params: &[&str]) -> Result<Vec<Vec<Value>>> {
        with_pool!(&self.pool, p => {
            let mut query = sqlx::query(sql).persistent(false);
            for param in params {
                query = query.bind(*param);
            }
            query.fetch_all(p).await?.iter().map(DecodeRow::decode_row).collect()
        })
    }

    fn fetch<'a>(&'a self, sql: &'a str) -> BoxStream<'a, Result<Vec<Value>>> {
        with_pool!(&self.pool, p => sqlx::query(sql)
            .persistent(false)
            .fetch(p)
            .map(|row| row.map_err(Error::from).and_then(|row| row.decode_row()))
            .boxed())
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        tracing::trace!(database = %self.source, %sql, "Executing");
        with_pool!(&self.pool, p => Ok(sqlx::raw_sql(sql).execute(p).await?.rows_affected()))
    }

    async fn execute_in_transaction(&self, statements: &[String]) -> Result<()> {
        with_pool!(&self.pool, p => {
            let mut tx = p.begin().await?;
            for sql in statements {
                tracing::trace!(database = %self.source, %sql, "Executing in transaction");
                sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(sql)).await?;
            }
            tx.commit().await?;
            Ok(())
        })
    }
}

trait DecodeRow {
    fn decode_row(&self) -> Result<Vec<Value>>;
}

impl DecodeRow for PgRow {
    fn decode_row(&self) -> Result<Vec<Value>> {
        (0..self.len()).map(|i| decode_pg(self, i)).collect()
    }
}

impl DecodeRow for MySqlRow {
    fn decode_row(&self) -> Result<Vec<Value>> {
        (0..self.len()).map(|i| decode_mysql(self, i)).collect()
    }
}

impl DecodeRow for SqliteRow {
    fn decode_row(&self) -> Result<Vec<Value>> {
        (0..self.len()).map(|i| decode_sqlite(self, i)).collect()
    }
}

fn decode_pg(row: &PgRow, i: usize) -> Result<Value> {
    if row.try_get_raw(i)?.is_null() {
        return Ok(Value::Null);
    }
    Ok(match row.column(i).type_info().name() {
        "BOOL" => Value::Boolean(row.try_get(i)?),
        "INT2" => Value::Integer(row.try_get::<i16, _>(i)?.into()),
        "INT4" => Value::Integer(row.try_get::<i32, _>(i)?.into()),
        "INT8" => Value::Integer(row.try_get(i)?),
        "FLOAT4" => Value::Float(row.try_get::<f32, _>(i)?.into()),
        "FLOAT8" => Value::Float(row.try_get(i)?),
        "NUMERIC" => Value::String(row.try_get::<rust_decimal::Decimal, _>(i)?.to_string()),
        "DATE" => Value::Date(row.try_get(i)?),
        "TIMESTAMP" => Value::DateTime(row.try_get(i)?),
        "TIMESTAMPTZ" => Value::DateTime(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(i)?
                .naive_utc(),
        ),
        "BYTEA" => Value::Bytes(row.try_get(i)?),
        _ => Value::String(row.try_get_unchecked(i)?),
    })
}

fn decode_mysql(row: &MySqlRow, i: usize) -> Result<Value> {
    if row.try_get_raw(i)?.is_null() {
        return Ok(Value::Null);
    }
    let type_name = row.column(i).type_info().name();
    Ok(match type_name {
        "BOOLEAN" => Value::Boolean(row.try_get(i)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::Integer(row.try_get_unchecked(i)?)
        }
        name if name.ends_with("UNSIGNED") => {
            let unsigned: u64 = row.try_get_unchecked(i)?;
            i64::try_from(unsigned).map_or_else(|_| Value::String(unsigned.to_string()), Value::Integer)
        }
        "FLOAT" => Value::Float(row.try_get::<f32, _>(i)?.into()),
        "DOUBLE" => Value::Float(row.try_get(i)?),
        "DECIMAL" => Value::String(row.try_get::<rust_decimal::Decimal, _>(i)?.to_string()),
        "DATE" => Value::Date(row.try_get(i)?),
        "DATETIME" | "TIMESTAMP" => Value::DateTime(row.try_get(i)?),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            Value::Bytes(row.try_get(i)?)
        }
        _ => match row.try_get_unchecked::<String, _>(i) {
            Ok(text) => Value::String(text),
            Err(_) => {
                let bytes: Vec<u8> = row.try_get_unchecked(i)?;
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            }
        },
    })
}

fn decode_sqlite(row: &SqliteRow, i: usize) -> Result<Value> {
    let raw = row.try_get_raw(i)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();
    if row.column(i).type_info().name() == "BOOLEAN" && storage == "INTEGER" {
        return Ok(Value::Boolean(row.try_get_unchecked(i)?));
    }
    Ok(match storage.as_str() {
        "INTEGER" => Value::Integer(row.try_get_unchecked(i)?),
        "REAL" => Value::Float(row.try_get_unchecked(i)?),
        "BLOB" => Value::Bytes(row.try_get_unchecked(i)?),
        _ => Value::String(row.try_get_unchecked(i)?),
    })
}
