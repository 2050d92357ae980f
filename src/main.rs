//! rustpubmed - PubMed papers with non-academic authors
//!
//! Searches PubMed, keeps the articles where at least one author lists a
//! company affiliation, and writes them to CSV.
//!
//! ## Usage
//!
//! ```bash
//! rustpubmed "crispr AND therapy" --max-results 50 -f crispr.csv
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rustpubmed::entrez::{EntrezClient, EntrezConfig, DEFAULT_BASE_URL, DEFAULT_TOOL};
use rustpubmed::{export, pipeline};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Fetch PubMed papers with non-academic authors
#[derive(Parser)]
#[command(name = "rustpubmed")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Search query for PubMed (full PubMed query syntax)
    query: String,

    /// Maximum number of results to fetch
    #[arg(long, default_value_t = 20)]
    max_results: usize,

    /// Output CSV filename
    #[arg(short, long, default_value = "results.csv")]
    file: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Contact email sent to NCBI with every request
    #[arg(long, env = "NCBI_EMAIL")]
    email: Option<String>,

    /// NCBI API key (raises the rate limit from 3 to 10 requests/s)
    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// E-utilities base URL
    #[arg(long, default_value = DEFAULT_BASE_URL, hide = true)]
    base_url: String,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(cli.debug)
        .with_thread_ids(false)
        .init();

    let config = EntrezConfig {
        base_url: cli.base_url,
        email: cli.email,
        tool: DEFAULT_TOOL.to_string(),
        api_key: cli.api_key,
        ..Default::default()
    };
    let client = EntrezClient::new(config).context("Failed to create E-utilities client")?;

    info!(
        query = %cli.query,
        max_results = cli.max_results,
        base_url = %client.config().base_url,
        "Running query"
    );

    let report = pipeline::process_query(&client, &cli.query, cli.max_results)
        .await
        .context("PubMed search failed")?;

    export::save_csv(&report.rows, &cli.file)
        .with_context(|| format!("Failed to write {}", cli.file.display()))?;

    Ok(())
}
