//! Extract request configuration.
//!
//! An [`ExtractRequest`] describes one complete export run: where to
//! connect, what to execute, where the rows go, and the streaming policy
//! (fetch size, progress interval, optional record limit). It is built
//! once, validated, and never mutated during the run.

use std::path::PathBuf;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ExtractError;
use crate::Result;

/// Default driver fetch-size hint (rows per round trip).
pub const DEFAULT_FETCH_SIZE: u32 = 1000;

/// Default progress-report interval (rows between notifications).
pub const DEFAULT_REPORT_INTERVAL: u64 = 10_000;

/// Database credentials, wiped from memory on drop.
///
/// Credentials supplied here override whatever the connection URL carries;
/// they are never logged or embedded back into an error message.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Manual Debug so a stray {:?} can never leak the password.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

/// Immutable configuration for a single export run.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    /// Database connection URL (scheme selects the client)
    pub url: String,
    /// Credentials applied on top of the URL
    pub credentials: Credentials,
    /// Query text, executed verbatim
    pub query: String,
    /// Destination file path (truncated if it exists)
    pub output: PathBuf,
    /// Driver fetch-size hint; never affects output content
    pub fetch_size: u32,
    /// Rows between progress notifications
    pub report_interval: u64,
    /// Optional record limit; absent means unbounded
    pub limit: Option<u64>,
}

impl ExtractRequest {
    /// Creates a request with default fetch size, report interval, and no
    /// record limit.
    pub fn new(
        url: impl Into<String>,
        credentials: Credentials,
        query: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            credentials,
            query: query.into(),
            output: output.into(),
            fetch_size: DEFAULT_FETCH_SIZE,
            report_interval: DEFAULT_REPORT_INTERVAL,
            limit: None,
        }
    }

    /// Sets the driver fetch-size hint.
    #[must_use]
    pub fn with_fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    /// Sets the progress-report interval.
    #[must_use]
    pub fn with_report_interval(mut self, report_interval: u64) -> Self {
        self.report_interval = report_interval;
        self
    }

    /// Sets the record limit.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validates the request before a run starts.
    ///
    /// # Errors
    /// Returns a configuration error for an empty URL or query, a zero
    /// fetch size, or a zero report interval.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ExtractError::configuration(
                "Connection URL must not be empty",
            ));
        }
        if self.query.trim().is_empty() {
            return Err(ExtractError::configuration("Query must not be empty"));
        }
        if self.fetch_size == 0 {
            return Err(ExtractError::configuration(
                "Fetch size must be a positive integer",
            ));
        }
        if self.report_interval == 0 {
            return Err(ExtractError::configuration(
                "Report interval must be a positive integer",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ExtractRequest {
        ExtractRequest::new(
            "postgres://localhost/db",
            Credentials::new("scott", "tiger"),
            "SELECT 1",
            "/tmp/out.csv",
        )
    }

    #[test]
    fn test_defaults() {
        let req = request();
        assert_eq!(req.fetch_size, DEFAULT_FETCH_SIZE);
        assert_eq!(req.report_interval, DEFAULT_REPORT_INTERVAL);
        assert_eq!(req.limit, None);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let req = request()
            .with_fetch_size(50)
            .with_report_interval(100)
            .with_limit(5);
        assert_eq!(req.fetch_size, 50);
        assert_eq!(req.report_interval, 100);
        assert_eq!(req.limit, Some(5));
    }

    #[test]
    fn test_validate_rejects_zero_fetch_size() {
        let req = request().with_fetch_size(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_report_interval() {
        let req = request().with_report_interval(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_query() {
        let mut req = request();
        req.query = "  ".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_limit_zero_is_a_valid_request() {
        // A zero limit means "header only": valid, just nothing to fetch.
        let req = request().with_limit(0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_credentials_debug_masks_password() {
        let creds = Credentials::new("scott", "tiger");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("scott"));
        assert!(!debug.contains("tiger"));
    }
}
