//! NCBI E-utilities client.
//!
//! Two calls are used:
//! - ESearch (`esearch.fcgi`, JSON) turns a query into an ordered list of PMIDs
//! - EFetch (`efetch.fcgi`, XML) returns the full record for one PMID
//!
//! API Details:
//! - Identify the caller with `tool` and `email` on every request
//! - Rate limit: 3 req/s without an API key, 10 req/s with one
//! - Requests are never retried; callers decide what a failure means

use crate::error::{OptionExt, PubmedError, Result};
use crate::record::{ArticleRecord, Author};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// E-utilities base URL
pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Tool name reported to NCBI
pub const DEFAULT_TOOL: &str = "rustpubmed";

const INTERVAL_WITHOUT_KEY: Duration = Duration::from_millis(334);
const INTERVAL_WITH_KEY: Duration = Duration::from_millis(100);

/// Where article identifiers and records come from.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Ordered PMIDs matching `query`, at most `max_results` of them.
    async fn search_ids(&self, query: &str, max_results: usize) -> Result<Vec<String>>;

    /// Full record for one PMID.
    async fn fetch_record(&self, pmid: &str) -> Result<ArticleRecord>;
}

/// Connection settings for E-utilities
#[derive(Debug, Clone)]
pub struct EntrezConfig {
    pub base_url: String,
    /// Contact address NCBI can use if the tool misbehaves
    pub email: Option<String>,
    pub tool: String,
    /// Raises the rate limit to 10 req/s
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for EntrezConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            email: None,
            tool: DEFAULT_TOOL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl EntrezConfig {
    /// Minimum spacing between two requests
    pub fn request_interval(&self) -> Duration {
        if self.api_key.is_some() {
            INTERVAL_WITH_KEY
        } else {
            INTERVAL_WITHOUT_KEY
        }
    }
}

/// E-utilities client with request spacing
pub struct EntrezClient {
    client: Client,
    config: EntrezConfig,
    last_request: Mutex<Option<Instant>>,
}

impl EntrezClient {
    /// Create a new EntrezClient
    pub fn new(config: EntrezConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(PubmedError::Config("E-utilities base URL is empty".to_string()));
        }

        let client = Client::builder()
            .user_agent(format!("{}/{}", config.tool, env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| PubmedError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            last_request: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &EntrezConfig {
        &self.config
    }

    /// Parameters sent with every request
    fn identity_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tool", self.config.tool.clone())];
        if let Some(email) = &self.config.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.config.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Sleep until the request interval has passed since the previous request
    async fn wait_for_rate_limit(&self) {
        let interval = self.config.request_interval();
        let remaining = {
            let last = self.last_request.lock().ok();
            last.and_then(|l| *l)
                .and_then(|t| interval.checked_sub(t.elapsed()))
        };

        if let Some(wait) = remaining {
            tokio::time::sleep(wait).await;
        }

        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(Instant::now());
        }
    }

    async fn get_text(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);

        self.wait_for_rate_limit().await;
        debug!(url = %url, params = ?params, "E-utilities request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&self.identity_params())
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PubmedError::RateLimited(1));
        }

        if !status.is_success() {
            return Err(PubmedError::Api {
                code: status.as_u16() as i32,
                message: format!("{} returned {}", endpoint, status),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ArticleSource for EntrezClient {
    async fn search_ids(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        debug!(query = query, max_results = max_results, "Searching PubMed");

        if max_results == 0 {
            return Ok(Vec::new());
        }

        let body = self
            .get_text(
                "esearch.fcgi",
                &[
                    ("db", "pubmed".to_string()),
                    ("term", query.to_string()),
                    ("retmax", max_results.to_string()),
                    ("retmode", "json".to_string()),
                ],
            )
            .await?;

        let ids = parse_esearch_json(&body)?;
        info!(query = query, count = ids.len(), "ESearch complete");
        Ok(ids)
    }

    async fn fetch_record(&self, pmid: &str) -> Result<ArticleRecord> {
        let body = self
            .get_text(
                "efetch.fcgi",
                &[
                    ("db", "pubmed".to_string()),
                    ("id", pmid.to_string()),
                    ("retmode", "xml".to_string()),
                ],
            )
            .await?;

        parse_efetch_xml(&body)
    }
}

// === ESearch Response Types ===

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: Option<ESearchResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

/// Parse an ESearch JSON body into PMIDs, in the order returned
fn parse_esearch_json(body: &str) -> Result<Vec<String>> {
    let response: ESearchResponse = serde_json::from_str(body)?;

    if let Some(message) = response.error {
        return Err(PubmedError::Api { code: 0, message });
    }

    let result = response
        .esearchresult
        .ok_or_parse("ESearch response has no esearchresult")?;

    if let Some(message) = result.error {
        return Err(PubmedError::Api { code: 0, message });
    }

    Ok(result.idlist)
}

// === EFetch XML ===

/// Element path from the set root down to `Article`
const ARTICLE_PATH: [&str; 3] = ["PubmedArticle", "MedlineCitation", "Article"];

/// Collects the first article of an EFetch result
#[derive(Default)]
struct ArticleBuilder {
    seen_pubmed_article: bool,
    done: bool,
    record: Option<ArticleRecord>,
}

impl ArticleBuilder {
    /// Path below `Article`, if `path` is inside the first article
    fn article_rel(path: &[String]) -> Option<Vec<&str>> {
        let below_root = path.get(1..)?;
        if below_root.len() < ARTICLE_PATH.len()
            || below_root.iter().zip(ARTICLE_PATH).any(|(a, b)| a != b)
        {
            return None;
        }
        Some(below_root[ARTICLE_PATH.len()..].iter().map(String::as_str).collect())
    }

    fn is_pubmed_article(path: &[String]) -> bool {
        path.len() == 2 && path[1] == "PubmedArticle"
    }

    fn start(&mut self, path: &[String]) {
        if self.done {
            return;
        }
        if Self::is_pubmed_article(path) {
            self.seen_pubmed_article = true;
            return;
        }
        let Some(rel) = Self::article_rel(path) else {
            return;
        };

        match rel.as_slice() {
            [] => self.record = Some(ArticleRecord::default()),
            ["AuthorList", "Author"] => {
                if let Some(record) = self.record.as_mut() {
                    record.authors.push(Author::default());
                }
            }
            ["AuthorList", "Author", "AffiliationInfo"] => {
                if let Some(author) = self.current_author() {
                    author.affiliations.push(String::new());
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, path: &[String], text: &str) {
        if self.done {
            return;
        }
        let Some(rel) = Self::article_rel(path) else {
            return;
        };
        let Some(record) = self.record.as_mut() else {
            return;
        };

        match rel.as_slice() {
            // Inline markup (<i>, <sup>, ...) is flattened into the title
            ["ArticleTitle", ..] => record.title.push_str(text),
            ["Journal", "JournalIssue", "PubDate", part] => {
                let slot = match *part {
                    "Year" => &mut record.pub_date.year,
                    "Month" => &mut record.pub_date.month,
                    "Day" => &mut record.pub_date.day,
                    _ => return,
                };
                slot.get_or_insert_with(String::new).push_str(text);
            }
            ["AuthorList", "Author", "ForeName"] => {
                if let Some(author) = record.authors.last_mut() {
                    author.fore_name.get_or_insert_with(String::new).push_str(text);
                }
            }
            ["AuthorList", "Author", "LastName"] => {
                if let Some(author) = record.authors.last_mut() {
                    author.last_name.get_or_insert_with(String::new).push_str(text);
                }
            }
            ["AuthorList", "Author", "AffiliationInfo", "Affiliation", ..] => {
                if let Some(aff) = record
                    .authors
                    .last_mut()
                    .and_then(|a| a.affiliations.last_mut())
                {
                    aff.push_str(text);
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, path: &[String]) {
        if Self::is_pubmed_article(path) {
            self.done = true;
        }
    }

    fn current_author(&mut self) -> Option<&mut Author> {
        self.record.as_mut().and_then(|r| r.authors.last_mut())
    }

    fn finish(self) -> Result<ArticleRecord> {
        if !self.seen_pubmed_article {
            return Err(PubmedError::Parse(
                "EFetch response has no PubmedArticle".to_string(),
            ));
        }

        let mut record = self
            .record
            .ok_or_parse("PubmedArticle has no MedlineCitation/Article")?;

        record.title = record.title.trim().to_string();
        let date = &mut record.pub_date;
        for part in [&mut date.year, &mut date.month, &mut date.day] {
            trim_in_place(part);
        }
        for author in &mut record.authors {
            trim_in_place(&mut author.fore_name);
            trim_in_place(&mut author.last_name);
            for aff in &mut author.affiliations {
                *aff = aff.trim().to_string();
            }
        }

        Ok(record)
    }
}

fn trim_in_place(value: &mut Option<String>) {
    if let Some(s) = value {
        *s = s.trim().to_string();
    }
}

/// Parse an EFetch `PubmedArticleSet` document.
///
/// Only the first `PubmedArticle` is read. A document without a
/// `PubmedArticle`, or an article without `MedlineCitation/Article`, is a
/// parse error. A missing `AuthorList` means no authors.
pub fn parse_efetch_xml(xml: &str) -> Result<ArticleRecord> {
    let mut reader = Reader::from_str(xml);
    let mut path: Vec<String> = Vec::new();
    let mut builder = ArticleBuilder::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                builder.start(&path);
            }
            Event::Empty(e) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                builder.start(&path);
                builder.end(&path);
                path.pop();
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                builder.text(&path, &text);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e);
                builder.text(&path, &text);
            }
            Event::End(_) => {
                builder.end(&path);
                path.pop();
                if builder.done {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    builder.finish()
}
