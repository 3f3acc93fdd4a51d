//! SQLite client.
//!
//! SQLite is file-based and ignores credentials. Accepted connection string
//! formats mirror the factory's detection: `sqlite://` URLs, bare
//! `.db`/`.sqlite`/`.sqlite3` paths, and `:memory:`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};

use super::{DatabaseType, UnsupportedColumnType};
use crate::error::ExtractError;
use crate::stream::{FieldValue, RowCursor};
use crate::Result;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens a SQLite database.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid connection string, or a
    /// connection error if the database file cannot be opened.
    pub async fn connect(url: &str) -> Result<Self> {
        let normalized = normalize_connection_string(url);

        let options = SqliteConnectOptions::from_str(&normalized).map_err(|e| {
            ExtractError::configuration(format!("Invalid SQLite connection string: {}", e))
        })?;

        // A single connection keeps :memory: databases coherent and is all
        // the sequential loop ever uses.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| {
                ExtractError::connection_failed("opening SQLite database", e)
            })?;

        Ok(Self { pool })
    }
}

/// Normalizes bare paths and `:memory:` to the `sqlite:` URL format.
fn normalize_connection_string(url: &str) -> String {
    if url == ":memory:" {
        return "sqlite::memory:".to_string();
    }
    if url.starts_with("sqlite:") {
        return url.to_string();
    }
    format!("sqlite://{}", url)
}

#[async_trait]
impl super::DatabaseClient for SqliteClient {
    async fn open_cursor<'q>(
        &'q self,
        query: &'q str,
        fetch_size: u32,
    ) -> Result<Box<dyn RowCursor + 'q>> {
        tracing::debug!("fetch size hint {} (driver manages row batching)", fetch_size);

        let statement = self
            .pool
            .prepare(query)
            .await
            .map_err(|e| ExtractError::query_failed("preparing query", e))?;

        let labels: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let stream = sqlx::query(query).fetch(&self.pool);

        Ok(Box::new(SqliteCursor { labels, stream }))
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct SqliteCursor<'q> {
    labels: Vec<String>,
    stream: BoxStream<'q, std::result::Result<SqliteRow, sqlx::Error>>,
}

#[async_trait]
impl RowCursor for SqliteCursor<'_> {
    fn column_labels(&self) -> &[String] {
        &self.labels
    }

    async fn next_row(&mut self) -> Result<Option<Vec<FieldValue>>> {
        match self.stream.next().await {
            None => Ok(None),
            Some(Err(e)) => Err(ExtractError::cursor_failed("fetching next row", e)),
            Some(Ok(row)) => {
                let mut fields = Vec::with_capacity(self.labels.len());
                for (index, label) in self.labels.iter().enumerate() {
                    fields.push(decode_field(&row, index, label)?);
                }
                Ok(Some(fields))
            }
        }
    }
}

/// Converts one column to its text form. SQLite is dynamically typed, so
/// the chain covers its four storage classes; NULL is detected on the raw
/// value before any decode runs.
fn decode_field(row: &SqliteRow, index: usize, label: &str) -> Result<FieldValue> {
    let raw = row.try_get_raw(index).map_err(|e| {
        ExtractError::cursor_failed(format!("reading column '{}'", label), e)
    })?;
    if raw.is_null() {
        return Ok(None);
    }
    let type_name = raw.type_info().name().to_string();

    if let Ok(v) = row.try_get::<String, _>(index) {
        return Ok(Some(v));
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
        use base64::Engine;
        return Ok(Some(
            base64::engine::general_purpose::STANDARD.encode(&v),
        ));
    }

    Err(ExtractError::cursor_failed(
        format!("decoding column '{}'", label),
        UnsupportedColumnType { type_name },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_connection_string() {
        assert_eq!(normalize_connection_string(":memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_connection_string("sqlite:///path/db.sqlite"),
            "sqlite:///path/db.sqlite"
        );
        assert_eq!(
            normalize_connection_string("/path/to/db.sqlite"),
            "sqlite:///path/to/db.sqlite"
        );
    }
}
