//! # rustpubmed
//!
//! Finds PubMed papers with at least one author affiliated with a
//! non-academic (pharma, biotech, industry) organization.
//!
//! ## Modules
//!
//! - [`entrez`] - NCBI E-utilities client (ESearch + EFetch)
//! - [`affiliation`] - Academic keyword heuristic and email extraction
//! - [`record`] - Article records and report rows
//! - [`pipeline`] - Sequential search/fetch/classify batch
//! - [`export`] - CSV output
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustpubmed::entrez::{EntrezClient, EntrezConfig};
//! use rustpubmed::{export, pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = EntrezClient::new(EntrezConfig::default())?;
//!     let report = pipeline::process_query(&client, "cancer immunotherapy", 20).await?;
//!     export::save_csv(&report.rows, std::path::Path::new("results.csv"))?;
//!     Ok(())
//! }
//! ```

pub mod affiliation;
pub mod entrez;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod record;

pub use error::{PubmedError, Result};
