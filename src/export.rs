//! CSV export of report rows.

use crate::error::Result;
use crate::record::ReportRow;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// CSV column order; matches the serde renames on [`ReportRow`]
pub const REPORT_COLUMNS: [&str; 6] = [
    "PubmedID",
    "Title",
    "Publication Date",
    "Non-academic Author(s)",
    "Company Affiliation(s)",
    "Corresponding Author Email",
];

/// Save report rows to a CSV file.
///
/// Nothing is written for an empty slice and `Ok(false)` is returned. Rows go
/// to a sibling `.tmp` file that is renamed over `path` once fully flushed, so
/// `path` never holds a partial file.
pub fn save_csv(rows: &[ReportRow], path: &Path) -> Result<bool> {
    if rows.is_empty() {
        info!("No non-academic papers found.");
        return Ok(false);
    }

    let tmp_path = temp_path(path);
    debug!(tmp = ?tmp_path, "Writing CSV");

    if let Err(e) = write_rows(rows, &tmp_path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    std::fs::rename(&tmp_path, path)?;

    info!(path = ?path, count = rows.len(), "Saved {} papers", rows.len());
    Ok(true)
}

fn write_rows(rows: &[ReportRow], path: &Path) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;

    for row in rows {
        wtr.serialize(row)?;
    }

    wtr.flush()?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, email: &str) -> ReportRow {
        ReportRow {
            pubmed_id: id.to_string(),
            title: "Drug, delivery; \"quoted\"".to_string(),
            publication_date: "2023-05".to_string(),
            non_academic_authors: "Jane Doe; Al Smith".to_string(),
            company_affiliations: "Acme Inc.; Genentech".to_string(),
            corresponding_email: email.to_string(),
        }
    }

    #[test]
    fn test_empty_rows_write_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.csv");

        assert!(!save_csv(&[], &path).expect("save"));
        assert!(!path.exists());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_save_csv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.csv");

        let rows = vec![row("1", "jane@acme.com"), row("2", "N/A")];
        assert!(save_csv(&rows, &path).expect("save"));
        assert!(!temp_path(&path).exists());

        let mut rdr = csv::Reader::from_path(&path).expect("reader");
        let headers: Vec<String> = rdr
            .headers()
            .expect("headers")
            .iter()
            .map(String::from)
            .collect();
        assert_eq!(headers, REPORT_COLUMNS);

        let records: Vec<csv::StringRecord> = rdr.records().collect::<std::result::Result<_, _>>().expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "1");
        assert_eq!(&records[0][1], "Drug, delivery; \"quoted\"");
        assert_eq!(&records[0][3], "Jane Doe; Al Smith");
        assert_eq!(&records[1][5], "N/A");
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale").expect("write");

        save_csv(&[row("9", "N/A")], &path).expect("save");
        let content = std::fs::read_to_string(&path).expect("read");
        assert!(content.starts_with("PubmedID,Title,Publication Date"));
        assert!(!content.contains("stale"));
    }

    #[test]
    fn test_temp_path() {
        assert_eq!(
            temp_path(Path::new("/tmp/results.csv")),
            PathBuf::from("/tmp/results.csv.tmp")
        );
    }
}
