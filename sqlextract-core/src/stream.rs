//! The row-streaming loop.
//!
//! [`stream_rows`] drains a forward-only [`RowCursor`] into a line-oriented
//! [`LineSink`] under a limit/progress policy and reports an
//! [`ExtractSummary`]. Memory stays O(1) in row count: exactly one row is
//! held at a time, assembled into a line buffer before it is pushed to the
//! sink with its terminator.
//!
//! Field values are joined with a bare `,` and never quoted or escaped; a
//! value containing a comma or line break is written verbatim. That is the
//! documented output contract, not an oversight.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::Result;

/// A decoded field: `Some(text)` for a present value, `None` for SQL NULL.
///
/// NULL serializes as the empty string, never as a literal `null`.
pub type FieldValue = Option<String>;

/// Forward-only handle over a query's result rows.
///
/// Column metadata is fixed at cursor-open time; every row is decoded
/// against that column count. Implementations must not reorder or buffer
/// rows beyond the driver's own batching.
#[async_trait]
pub trait RowCursor: Send {
    /// Ordered column labels, read once from the result metadata.
    fn column_labels(&self) -> &[String];

    /// Pulls the next row, or `None` on exhaustion.
    ///
    /// # Errors
    /// Returns a cursor-advance error if fetching or decoding fails; the
    /// stream is aborted and never resumed.
    async fn next_row(&mut self) -> Result<Option<Vec<FieldValue>>>;
}

/// Append-only destination for lines of text.
///
/// The sink is never read back; lines arrive in row order, each complete
/// with its terminator.
pub trait LineSink: Send {
    /// Writes one complete line (terminator included by the sink).
    ///
    /// # Errors
    /// Returns a sink-write error on I/O failure.
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Flushes buffered lines to the underlying destination.
    ///
    /// # Errors
    /// Returns a sink-write error on I/O failure.
    fn flush(&mut self) -> Result<()>;
}

/// Receives progress notifications from the streaming loop.
///
/// Notifications must be non-blocking from the streamer's perspective and
/// must not alter row processing.
pub trait ProgressObserver: Send + Sync {
    /// Called with the running record count at every report interval.
    fn rows_exported(&self, count: u64);
}

/// Default observer: logs progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn rows_exported(&self, count: u64) {
        tracing::info!("So far exported {} records", count);
    }
}

/// Summary of a completed export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Number of data rows written (header excluded)
    pub record_count: u64,
    /// Wall-clock time from metadata read to completion
    pub elapsed: Duration,
}

/// Joins field values into one delimited line; NULL becomes empty.
fn format_row(fields: &[FieldValue]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        if let Some(value) = field {
            line.push_str(value);
        }
    }
    line
}

/// Drains `cursor` into `sink`, honoring `limit` and reporting progress.
///
/// Writes the header line first, then one line per row in cursor order.
/// With a limit of `n`, exactly `min(available, n)` rows are written and
/// rows past the limit are never fetched; reaching the limit completes the
/// run through the same path as natural exhaustion.
///
/// # Errors
/// Any cursor-advance or sink-write failure aborts immediately and
/// propagates unchanged. Lines already flushed stay in the sink.
pub async fn stream_rows(
    cursor: &mut dyn RowCursor,
    sink: &mut dyn LineSink,
    limit: Option<u64>,
    report_interval: u64,
    observer: &dyn ProgressObserver,
) -> Result<ExtractSummary> {
    let start = Instant::now();

    let header = cursor.column_labels().join(",");
    sink.write_line(&header)?;

    let mut record_count: u64 = 0;
    loop {
        if let Some(limit) = limit {
            if record_count >= limit {
                tracing::info!("Extracted requested {} records, stop", limit);
                break;
            }
        }

        let Some(fields) = cursor.next_row().await? else {
            break;
        };

        sink.write_line(&format_row(&fields))?;
        record_count += 1;

        if report_interval > 0 && record_count % report_interval == 0 {
            observer.rows_exported(record_count);
        }
    }

    sink.flush()?;

    Ok(ExtractSummary {
        record_count,
        elapsed: start.elapsed(),
    })
}
