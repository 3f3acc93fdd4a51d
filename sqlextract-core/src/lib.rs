//! Core engine for sqlextract.
//!
//! This crate holds everything the CLI binary is thin over: the extract
//! request model, the row-streaming loop, the file sink, the error
//! taxonomy, logging setup, and the feature-gated database clients.
//!
//! # Architecture
//! - Factory pattern for client instantiation, keyed on the URL scheme
//! - The streaming core only sees trait objects: a cursor, a sink, and a
//!   progress observer
//! - All database operations are read-only; memory stays O(1) in row count
//! - Connection URLs are redacted before appearing in logs or errors

pub mod clients;
pub mod error;
pub mod extract;
pub mod logging;
pub mod request;
pub mod sink;
pub mod stream;

// Re-export commonly used types
pub use clients::{DatabaseClient, DatabaseType};
pub use error::{ExtractError, Result};
pub use logging::init_logging;
pub use request::{Credentials, ExtractRequest, DEFAULT_FETCH_SIZE, DEFAULT_REPORT_INTERVAL};
pub use sink::FileSink;
pub use stream::{ExtractSummary, FieldValue, LineSink, LogProgress, ProgressObserver, RowCursor};
