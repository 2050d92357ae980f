//! Article records and the report rows derived from them.
//!
//! An [`ArticleRecord`] is the per-article metadata fetched from PubMed. It is
//! reduced to a [`ReportRow`] when at least one author lists a non-academic
//! affiliation.

use crate::affiliation::{extract_email, is_academic_affiliation};
use serde::Serialize;

/// Placeholder written when no corresponding email was found
pub const EMAIL_NOT_AVAILABLE: &str = "N/A";

/// Publication date parts as they appear in `PubDate`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PubDate {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
}

/// One entry of an article's author list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub fore_name: Option<String>,
    pub last_name: Option<String>,
    /// One entry per `AffiliationInfo`, empty when it carries no text
    pub affiliations: Vec<String>,
}

impl Author {
    /// "ForeName LastName", trimmed. Missing parts leave blank segments.
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.fore_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

/// Metadata for a single fetched article
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleRecord {
    pub title: String,
    pub pub_date: PubDate,
    pub authors: Vec<Author>,
}

/// Flattened summary of an article with at least one non-academic author.
///
/// Field renames give the CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "PubmedID")]
    pub pubmed_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Publication Date")]
    pub publication_date: String,
    #[serde(rename = "Non-academic Author(s)")]
    pub non_academic_authors: String,
    #[serde(rename = "Company Affiliation(s)")]
    pub company_affiliations: String,
    #[serde(rename = "Corresponding Author Email")]
    pub corresponding_email: String,
}

/// Join the present, non-empty date parts with `-` in year-month-day order.
///
/// No calendar validation: `("2023", "Jan", "")` becomes `"2023-Jan"`.
pub fn format_pub_date(year: Option<&str>, month: Option<&str>, day: Option<&str>) -> String {
    [year, month, day]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Reduce an article to a report row.
///
/// Returns `None` unless some author has a non-academic affiliation. An author
/// is listed once per non-academic affiliation, so the author and affiliation
/// columns always hold the same number of entries.
pub fn extract_report_row(pmid: &str, record: &ArticleRecord) -> Option<ReportRow> {
    let mut non_academic_authors: Vec<String> = Vec::new();
    let mut company_affiliations: Vec<&str> = Vec::new();
    let mut corresponding_email: Option<String> = None;

    for author in &record.authors {
        for aff in &author.affiliations {
            if is_academic_affiliation(aff) {
                continue;
            }
            non_academic_authors.push(author.full_name());
            company_affiliations.push(aff);
            if corresponding_email.is_none() && aff.contains('@') {
                corresponding_email = extract_email(aff);
            }
        }
    }

    if non_academic_authors.is_empty() {
        return None;
    }

    let date = &record.pub_date;
    Some(ReportRow {
        pubmed_id: pmid.to_string(),
        title: record.title.clone(),
        publication_date: format_pub_date(
            date.year.as_deref(),
            date.month.as_deref(),
            date.day.as_deref(),
        ),
        non_academic_authors: non_academic_authors.join("; "),
        company_affiliations: company_affiliations.join("; "),
        corresponding_email: corresponding_email
            .unwrap_or_else(|| EMAIL_NOT_AVAILABLE.to_string()),
    })
}
