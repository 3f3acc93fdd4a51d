//! PostgreSQL client.
//!
//! Connects through sqlx with the request credentials applied on top of the
//! URL, prepares the statement once to learn the column labels, then streams
//! rows one at a time.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{Column, Executor, PgPool, Row, Statement, TypeInfo, ValueRef};

use super::{DatabaseType, UnsupportedColumnType};
use crate::error::{redact_database_url, ExtractError};
use crate::request::Credentials;
use crate::stream::{FieldValue, RowCursor};
use crate::Result;

/// Connect timeout applied to the single pooled connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Connects to PostgreSQL, overriding URL credentials with `credentials`.
    ///
    /// # Errors
    /// Returns a configuration error for a malformed URL, or a connection
    /// error if the server cannot be reached or authentication fails.
    pub async fn connect(url: &str, credentials: &Credentials) -> Result<Self> {
        let options = PgConnectOptions::from_str(url)
            .map_err(|e| {
                ExtractError::configuration(format!(
                    "Invalid PostgreSQL connection string format: {}",
                    e
                ))
            })?
            .username(&credentials.username)
            .password(&credentials.password);

        // Single sequential run: one connection is all the loop ever uses.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| {
                ExtractError::connection_failed(
                    format!("connecting to {}", redact_database_url(url)),
                    e,
                )
            })?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl super::DatabaseClient for PostgresClient {
    async fn open_cursor<'q>(
        &'q self,
        query: &'q str,
        fetch_size: u32,
    ) -> Result<Box<dyn RowCursor + 'q>> {
        // sqlx exposes no per-cursor batch-size knob; the hint is recorded
        // and the driver manages its own row batching.
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

        Ok(Box::new(PostgresCursor { labels, stream }))
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSql
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct PostgresCursor<'q> {
    labels: Vec<String>,
    stream: BoxStream<'q, std::result::Result<PgRow, sqlx::Error>>,
}

#[async_trait]
impl RowCursor for PostgresCursor<'_> {
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

/// Converts one column to its text form, trying decodes in order of
/// likelihood. NULL is detected on the raw value before any decode runs.
fn decode_field(row: &PgRow, index: usize, label: &str) -> Result<FieldValue> {
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
    if let Ok(v) = row.try_get::<i32, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<i16, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<f32, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<bool, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<uuid::Uuid, _>(index) {
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
