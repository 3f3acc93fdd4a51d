//! End-to-end export run.
//!
//! Ties the pieces together in strict order: connect, open the destination,
//! execute the query, drain the cursor. One connection, one cursor, one
//! file handle; all released when the run ends, success or failure. Errors
//! propagate unchanged and any partial output stays on disk as-is.

use crate::clients;
use crate::error::redact_database_url;
use crate::request::ExtractRequest;
use crate::sink::FileSink;
use crate::stream::{stream_rows, ExtractSummary, LogProgress, ProgressObserver};
use crate::Result;

/// Runs a full export, reporting progress through the default logging
/// observer.
///
/// # Errors
/// Returns the first connection, query, cursor, or sink failure; nothing is
/// retried.
pub async fn run(request: &ExtractRequest) -> Result<ExtractSummary> {
    run_with_observer(request, &LogProgress).await
}

/// Runs a full export with an injected progress observer.
///
/// # Errors
/// Returns the first connection, query, cursor, or sink failure; nothing is
/// retried.
pub async fn run_with_observer(
    request: &ExtractRequest,
    observer: &dyn ProgressObserver,
) -> Result<ExtractSummary> {
    request.validate()?;

    tracing::info!(
        "Starting extract from {}@{} to {}",
        request.credentials.username,
        redact_database_url(&request.url),
        request.output.display()
    );
    tracing::info!("Query: {}", request.query);

    let client = clients::connect(&request.url, &request.credentials).await?;
    tracing::info!("Connected to {} database", client.database_type());

    let mut sink = FileSink::create(&request.output)?;
    tracing::info!("Opened output file for writing");

    let mut cursor = client
        .open_cursor(&request.query, request.fetch_size)
        .await?;
    tracing::info!("Executed query");

    let outcome = stream_rows(
        cursor.as_mut(),
        &mut sink,
        request.limit,
        request.report_interval,
        observer,
    )
    .await;

    // The cursor borrows the client; release it before closing.
    drop(cursor);
    client.close().await;

    let summary = outcome?;
    tracing::info!(
        "Completed processing {} records in {:?}",
        summary.record_count,
        summary.elapsed
    );

    Ok(summary)
}
