//! Query-to-CSV export tool.
//!
//! This binary connects to a database, executes a single query, and streams
//! the result set to a comma-delimited text file, logging progress along
//! the way. It is a thin shell over `sqlextract-core`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sqlextract_core::{extract, init_logging, Credentials, ExtractRequest};

#[derive(Parser)]
#[command(name = "sqlextract")]
#[command(about = "Stream a SQL query result set to a delimited text file")]
#[command(version)]
#[command(long_about = "
sqlextract - stream a SQL query result set to a delimited text file

Connects to the database, executes the query, and writes one header line of
column labels followed by one comma-separated line per row. NULL values
become empty fields; values are written verbatim, without quoting.

An existing output file is truncated and overwritten (a warning is logged).

SUPPORTED DATABASES:
- PostgreSQL (postgres://)
- MySQL      (mysql://)
- SQLite     (sqlite:// or .db/.sqlite files)

EXAMPLES:
  sqlextract -u postgres://localhost/shop -U scott -o orders.csv \\
      -q 'SELECT * FROM orders'
  sqlextract -u sqlite:///tmp/data.db -U '' -P '' -o top.csv \\
      -q 'SELECT * FROM events ORDER BY ts DESC' --limit 1000
")]
struct Cli {
    /// Database connection URL
    #[arg(short = 'u', long, help = "Database connection URL (credentials are redacted in logs)")]
    url: String,

    /// Database user
    #[arg(short = 'U', long, help = "Database user")]
    user: String,

    /// Database password
    #[arg(
        short = 'P',
        long,
        env = "SQLEXTRACT_PASSWORD",
        help = "Database password (prompted interactively when omitted)"
    )]
    password: Option<String>,

    /// Output file path
    #[arg(short = 'o', long, help = "Output file path (truncated if it exists)")]
    output: PathBuf,

    /// Query to execute
    #[arg(short = 'q', long, help = "Query text, executed verbatim")]
    query: String,

    /// Driver fetch-size hint
    #[arg(
        long,
        default_value_t = sqlextract_core::DEFAULT_FETCH_SIZE,
        help = "Rows per driver round trip (performance hint, never affects output)"
    )]
    fetch_size: u32,

    /// Progress-report interval
    #[arg(
        long = "report-freq",
        default_value_t = sqlextract_core::DEFAULT_REPORT_INTERVAL,
        help = "Rows between progress log lines"
    )]
    report_freq: u64,

    /// Record limit
    #[arg(long, help = "Stop after this many records (stopping early is success)")]
    limit: Option<u64>,

    /// Increase verbosity
    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(long, help = "Suppress all output except errors")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet)?;

    let password = match cli.password {
        Some(password) => password,
        None => rpassword::prompt_password("Database password: ")
            .context("failed to read password from terminal")?,
    };

    let mut request = ExtractRequest::new(
        cli.url,
        Credentials::new(cli.user, password),
        cli.query,
        cli.output,
    )
    .with_fetch_size(cli.fetch_size)
    .with_report_interval(cli.report_freq);

    if let Some(limit) = cli.limit {
        request = request.with_limit(limit);
    }

    match extract::run(&request).await {
        Ok(summary) => {
            println!(
                "Exported {} records in {:?}",
                summary.record_count, summary.elapsed
            );
            println!("Output: {}", request.output.display());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Extract failed: {}", e);
            Err(e.into())
        }
    }
}
