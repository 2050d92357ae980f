//! Batch pipeline: search, then fetch and classify each article in turn.
//!
//! Articles are processed one at a time in search order. A failure to fetch or
//! parse one article is logged and counted, and the batch moves on; only a
//! failed search aborts the batch.

use crate::entrez::ArticleSource;
use crate::error::Result;
use crate::record::{extract_report_row, ReportRow};
use tracing::{debug, info, warn};

/// What happened to a single PMID
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// At least one non-academic author
    Row(ReportRow),
    /// Fetched fine, but every affiliation was academic (or there were none)
    NoRow,
    /// Fetch or parse failed
    Failed { pmid: String, reason: String },
}

/// Per-outcome counts for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub retrieved: usize,
    pub rows: usize,
    pub no_row: usize,
    pub failed: usize,
}

impl BatchStats {
    fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Row(_) => self.rows += 1,
            RecordOutcome::NoRow => self.no_row += 1,
            RecordOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Rows collected for a query, in search order
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub rows: Vec<ReportRow>,
    pub stats: BatchStats,
}

/// Fetch one article and reduce it to an outcome. Never fails.
pub async fn fetch_outcome<S>(source: &S, pmid: &str) -> RecordOutcome
where
    S: ArticleSource + ?Sized,
{
    match source.fetch_record(pmid).await {
        Ok(record) => match extract_report_row(pmid, &record) {
            Some(row) => RecordOutcome::Row(row),
            None => {
                debug!(pmid = %pmid, "No non-academic authors");
                RecordOutcome::NoRow
            }
        },
        Err(e) => {
            warn!(pmid = %pmid, error = %e, "Error parsing paper");
            RecordOutcome::Failed {
                pmid: pmid.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// Run `query` and collect a row for every article with a non-academic author.
///
/// Search errors propagate. Per-article failures are skipped and counted.
pub async fn process_query<S>(source: &S, query: &str, max_results: usize) -> Result<BatchReport>
where
    S: ArticleSource + ?Sized,
{
    let pmids = source.search_ids(query, max_results).await?;
    info!(count = pmids.len(), "Found {} results", pmids.len());

    let mut report = BatchReport {
        rows: Vec::new(),
        stats: BatchStats {
            retrieved: pmids.len(),
            ..Default::default()
        },
    };

    for pmid in &pmids {
        let outcome = fetch_outcome(source, pmid).await;
        report.stats.record(&outcome);
        if let RecordOutcome::Row(row) = outcome {
            report.rows.push(row);
        }
    }

    let stats = report.stats;
    info!(
        retrieved = stats.retrieved,
        rows = stats.rows,
        no_row = stats.no_row,
        failed = stats.failed,
        "Collected {} papers with non-academic authors",
        stats.rows
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PubmedError;
    use crate::record::{ArticleRecord, Author};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory source; PMIDs missing from `records` fail to fetch
    #[derive(Default)]
    struct FakeSource {
        ids: Vec<String>,
        records: HashMap<String, ArticleRecord>,
        fail_search: bool,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn with(mut self, pmid: &str, record: Option<ArticleRecord>) -> Self {
            self.ids.push(pmid.to_string());
            if let Some(record) = record {
                self.records.insert(pmid.to_string(), record);
            }
            self
        }
    }

    #[async_trait]
    impl ArticleSource for FakeSource {
        async fn search_ids(&self, _query: &str, max_results: usize) -> Result<Vec<String>> {
            if self.fail_search {
                return Err(PubmedError::Api {
                    code: 500,
                    message: "esearch down".to_string(),
                });
            }
            Ok(self.ids.iter().take(max_results).cloned().collect())
        }

        async fn fetch_record(&self, pmid: &str) -> Result<ArticleRecord> {
            if let Ok(mut fetched) = self.fetched.lock() {
                fetched.push(pmid.to_string());
            }
            self.records
                .get(pmid)
                .cloned()
                .ok_or_else(|| PubmedError::Parse(format!("no record for {}", pmid)))
        }
    }

    fn article(affiliations: &[&str]) -> ArticleRecord {
        ArticleRecord {
            title: "T".to_string(),
            authors: vec![Author {
                fore_name: Some("Jane".to_string()),
                last_name: Some("Doe".to_string()),
                affiliations: affiliations.iter().map(|s| s.to_string()).collect(),
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_collects_rows_in_search_order() {
        let source = FakeSource::default()
            .with("3", Some(article(&["Acme Corp"])))
            .with("1", Some(article(&["Harvard University"])))
            .with("2", None)
            .with("5", Some(article(&["Beta Labs"])));

        let report = process_query(&source, "q", 20).await.expect("report");

        let ids: Vec<&str> = report.rows.iter().map(|r| r.pubmed_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "5"]);
        assert_eq!(
            report.stats,
            BatchStats {
                retrieved: 4,
                rows: 2,
                no_row: 1,
                failed: 1,
            }
        );

        let fetched = source.fetched.lock().expect("lock").clone();
        assert_eq!(fetched, vec!["3", "1", "2", "5"]);
    }

    #[tokio::test]
    async fn test_max_results_is_forwarded() {
        let source = FakeSource::default()
            .with("1", Some(article(&["Acme Corp"])))
            .with("2", Some(article(&["Acme Corp"])));

        let report = process_query(&source, "q", 1).await.expect("report");
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.stats.retrieved, 1);
    }

    #[tokio::test]
    async fn test_no_identifiers() {
        let source = FakeSource::default();
        let report = process_query(&source, "q", 20).await.expect("report");
        assert!(report.rows.is_empty());
        assert_eq!(report.stats, BatchStats::default());
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let source = FakeSource {
            fail_search: true,
            ..Default::default()
        };
        let err = process_query(&source, "q", 20).await.expect_err("should fail");
        assert!(matches!(err, PubmedError::Api { code: 500, .. }));
    }

    #[tokio::test]
    async fn test_fetch_outcome_variants() {
        let source = FakeSource::default()
            .with("row", Some(article(&["Acme Corp, a@acme.com"])))
            .with("none", Some(ArticleRecord::default()));

        match fetch_outcome(&source, "row").await {
            RecordOutcome::Row(row) => assert_eq!(row.corresponding_email, "a@acme.com"),
            other => panic!("expected row, got {:?}", other),
        }
        assert_eq!(fetch_outcome(&source, "none").await, RecordOutcome::NoRow);
        assert!(matches!(
            fetch_outcome(&source, "missing").await,
            RecordOutcome::Failed { ref pmid, .. } if pmid == "missing"
        ));
    }
}
