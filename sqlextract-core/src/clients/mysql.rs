//! MySQL client.
//!
//! Same shape as the PostgreSQL client: request credentials override the
//! URL, the statement is prepared once for column labels, rows stream one
//! at a time.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};

use super::{DatabaseType, UnsupportedColumnType};
use crate::error::{redact_database_url, ExtractError};
use crate::request::Credentials;
use crate::stream::{FieldValue, RowCursor};
use crate::Result;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MySqlClient {
    pool: MySqlPool,
}

impl MySqlClient {
    /// Connects to MySQL, overriding URL credentials with `credentials`.
    ///
    /// # Errors
    /// Returns a configuration error for a malformed URL, or a connection
    /// error if the server cannot be reached or authentication fails.
    pub async fn connect(url: &str, credentials: &Credentials) -> Result<Self> {
        let options = MySqlConnectOptions::from_str(url)
            .map_err(|e| {
                ExtractError::configuration(format!(
                    "Invalid MySQL connection string format: {}",
                    e
                ))
            })?
            .username(&credentials.username)
            .password(&credentials.password);

        let pool = MySqlPoolOptions::new()
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
impl super::DatabaseClient for MySqlClient {
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

        Ok(Box::new(MySqlCursor { labels, stream }))
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct MySqlCursor<'q> {
    labels: Vec<String>,
    stream: BoxStream<'q, std::result::Result<MySqlRow, sqlx::Error>>,
}

#[async_trait]
impl RowCursor for MySqlCursor<'_> {
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
fn decode_field(row: &MySqlRow, index: usize, label: &str) -> Result<FieldValue> {
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
    if let Ok(v) = row.try_get::<u64, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<i32, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<u32, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<i16, _>(index) {
        return Ok(Some(v.to_string()));
    }
    if let Ok(v) = row.try_get::<i8, _>(index) {
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
