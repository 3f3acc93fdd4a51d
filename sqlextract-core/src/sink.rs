//! File-backed line sink.
//!
//! The destination is created (or truncated) before the query executes; an
//! existing file triggers a warning, not an error. Writes go through a
//! buffer and each line is emitted whole with its terminator, so a row is
//! never split across a failure.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ExtractError;
use crate::stream::LineSink;
use crate::Result;

/// Buffered, truncate-on-open sink over a destination file.
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Opens the destination for writing, truncating any existing content.
    ///
    /// Logs a warning first when the path already exists, matching the
    /// overwrite-without-prompting contract.
    ///
    /// # Errors
    /// Returns a sink-write error if the file cannot be created (invalid
    /// path, permission denied, ...).
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            tracing::warn!("File {} already exists, will be truncated", path.display());
        }

        let file = File::create(path).map_err(|e| {
            ExtractError::sink_failed(format!("opening {} for writing", path.display()), e)
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Destination path this sink writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSink for FileSink {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.write_all(b"\n"))
            .map_err(|e| {
                ExtractError::sink_failed(format!("writing to {}", self.path.display()), e)
            })
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| {
            ExtractError::sink_failed(format!("flushing {}", self.path.display()), e)
        })
    }
}
