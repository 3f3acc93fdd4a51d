//! Shared logging setup for the sqlextract binary.
//!
//! Logging is process-wide state initialized once at startup; the streaming
//! core itself only reports progress through the injected observer.

use crate::Result;

/// Maps CLI verbosity flags to a log level.
///
/// `quiet` wins over any `-v` count; otherwise 0=INFO, 1=DEBUG, 2+=TRACE.
fn log_level(verbose: u8, quiet: bool) -> tracing::Level {
    if quiet {
        return tracing::Level::ERROR;
    }
    match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Initializes structured logging based on verbosity level.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
/// * `quiet` - If true, only show ERROR level logs
///
/// # Errors
/// Returns a configuration error if a global subscriber is already set.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose, quiet))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::ExtractError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Logging can only be initialized once per test process, so only the
    // level selection is exercised.

    #[test]
    fn test_quiet_always_wins() {
        assert_eq!(log_level(0, true), tracing::Level::ERROR);
        assert_eq!(log_level(3, true), tracing::Level::ERROR);
    }

    #[test]
    fn test_verbosity_escalates_to_trace() {
        assert_eq!(log_level(0, false), tracing::Level::INFO);
        assert_eq!(log_level(1, false), tracing::Level::DEBUG);
        assert_eq!(log_level(2, false), tracing::Level::TRACE);
        assert_eq!(log_level(10, false), tracing::Level::TRACE);
    }
}
