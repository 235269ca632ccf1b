//! Report lookup for catalog items.
//!
//! Reports live at `<data>/<modality>/reports/<bucket>/<base><suffix>` with the
//! suffixes from [`CatalogConfig::REPORT_SUFFIXES`] tried in order.

use crate::catalog::types::Item;
use crate::config::{CatalogConfig, PathsConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of a report lookup. A missing report is data, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportText {
    Found { text: String, source: PathBuf },
    NotFound,
}

impl ReportText {
    /// Text to show the reviewer; the sentinel when nothing was found.
    pub fn text(&self) -> &str {
        match self {
            ReportText::Found { text, .. } => text,
            ReportText::NotFound => CatalogConfig::REPORT_NOT_FOUND,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ReportText::Found { .. })
    }
}

/// Maps items to their report files.
#[derive(Debug, Clone)]
pub struct ReportResolver {
    data_dir: PathBuf,
}

impl ReportResolver {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn reports_dir(&self, item: &Item) -> PathBuf {
        self.data_dir
            .join(item.modality.as_str())
            .join(PathsConfig::REPORTS_DIR_NAME)
            .join(item.bucket.as_str())
    }

    /// Candidate report paths for an item, in lookup order.
    pub fn candidates(&self, item: &Item) -> Vec<PathBuf> {
        let dir = self.reports_dir(item);
        let base = item.base_name();
        CatalogConfig::REPORT_SUFFIXES
            .iter()
            .map(|suffix| dir.join(format!("{}{}", base, suffix)))
            .collect()
    }

    /// Trimmed contents of the first candidate that exists and reads.
    pub fn resolve_report(&self, item: &Item) -> ReportText {
        for candidate in self.candidates(item) {
            if !candidate.is_file() {
                continue;
            }
            match read_trimmed(&candidate) {
                Ok(text) => {
                    debug!("Resolved report for {} at {}", item.key(), candidate.display());
                    return ReportText::Found {
                        text,
                        source: candidate,
                    };
                }
                Err(e) => warn!("Failed to read report {}: {}", candidate.display(), e),
            }
        }

        debug!("No report found for {}", item.key());
        ReportText::NotFound
    }
}

fn read_trimmed(path: &Path) -> std::io::Result<String> {
    fs::read_to_string(path).map(|text| text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Bucket, Modality};
    use tempfile::TempDir;

    fn scan007() -> Item {
        Item {
            filename: "scan007.png".into(),
            modality: Modality::new("ct").unwrap(),
            bucket: Bucket::Easy,
        }
    }

    fn write_report(root: &Path, name: &str, text: &str) {
        let dir = root.join("ct").join("reports").join("easy");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn test_candidate_order() {
        let resolver = ReportResolver::new("/data");
        let names: Vec<String> = resolver
            .candidates(&scan007())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["scan007.txt", "scan007.ehr.txt", "scan007.report.txt"]);
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_report(temp_dir.path(), "scan007.report.txt", "third");
        write_report(temp_dir.path(), "scan007.ehr.txt", "  second\n");

        let report = ReportResolver::new(temp_dir.path()).resolve_report(&scan007());
        assert_eq!(report.text(), "second");
        assert!(report.is_found());
    }

    #[test]
    fn test_plain_txt_preferred() {
        let temp_dir = TempDir::new().unwrap();
        write_report(temp_dir.path(), "scan007.ehr.txt", "second");
        write_report(temp_dir.path(), "scan007.txt", "first");

        let report = ReportResolver::new(temp_dir.path()).resolve_report(&scan007());
        assert_eq!(report.text(), "first");
    }

    #[test]
    fn test_missing_report_is_sentinel() {
        let temp_dir = TempDir::new().unwrap();
        let report = ReportResolver::new(temp_dir.path()).resolve_report(&scan007());
        assert_eq!(report, ReportText::NotFound);
        assert_eq!(report.text(), CatalogConfig::REPORT_NOT_FOUND);
    }

    #[test]
    fn test_other_bucket_report_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("ct").join("reports").join("hard");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("scan007.txt"), "wrong bucket").unwrap();

        let report = ReportResolver::new(temp_dir.path()).resolve_report(&scan007());
        assert!(!report.is_found());
    }
}
