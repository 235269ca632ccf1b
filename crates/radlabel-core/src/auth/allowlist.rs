//! The allow-list file and the administrative builder that produces it.
//!
//! File format (`doctor_whitelist.json`):
//!
//! ```json
//! {
//!   "created": "2026-10-14T09:30:00+00:00",
//!   "total_doctors": 2,
//!   "whitelist": ["DOC1042", "DOC7731"]
//! }
//! ```

use crate::config::AuthConfig;
use crate::persistence::{atomic_read_json, atomic_write_json};
use crate::{LabelError, Result};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const RANDOM_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// On-disk shape of the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListFile {
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub total_doctors: usize,
    pub whitelist: Vec<String>,
}

/// Set of identifiers allowed to authenticate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    ids: BTreeSet<String>,
}

impl AllowList {
    /// Load the allow-list, or `None` if the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let file: Option<AllowListFile> = atomic_read_json(path)?;
        Ok(file.map(|f| Self {
            ids: f.whitelist.into_iter().collect(),
        }))
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, identifier: &str) -> bool {
        self.ids.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// Accumulates identifiers from several sources, suppressing duplicates.
#[derive(Debug, Clone, Default)]
pub struct AllowListBuilder {
    ids: Vec<String>,
}

impl AllowListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing allow-list file, or empty if there is none.
    pub fn from_existing(path: &Path) -> Result<Self> {
        let mut builder = Self::new();
        if let Some(list) = AllowList::load(path)? {
            for id in list.iter() {
                builder.add(id);
            }
        }
        Ok(builder)
    }

    /// Add one identifier. Returns false for blank or duplicate entries.
    pub fn add(&mut self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        if identifier.is_empty() || self.ids.iter().any(|id| id == identifier) {
            return false;
        }
        self.ids.push(identifier.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifiers in sorted order.
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids = self.ids.clone();
        ids.sort();
        ids
    }

    /// Generate up to `count` new identifiers from `pattern` with the thread RNG.
    pub fn generate_random(&mut self, count: usize, pattern: &str) -> Vec<String> {
        self.generate_random_with(&mut rand::rng(), count, pattern)
    }

    /// Generate up to `count` new identifiers from `pattern`.
    ///
    /// Placeholders: `{number}` (1000-9999), `{random}` (4 chars of A-Z0-9),
    /// `{letter}` (one A-Z). Gives up after `count * 10` attempts, so a
    /// pattern with little entropy yields fewer identifiers.
    pub fn generate_random_with<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        count: usize,
        pattern: &str,
    ) -> Vec<String> {
        let mut generated = Vec::new();
        let max_attempts = count.saturating_mul(10);
        let mut attempts = 0;

        while generated.len() < count && attempts < max_attempts {
            attempts += 1;
            let candidate = random_id(rng, pattern);
            if self.add(&candidate) {
                generated.push(candidate);
            }
        }

        debug!(
            "Generated {} of {} identifiers in {} attempts",
            generated.len(),
            count,
            attempts
        );
        generated
    }

    /// Import one identifier per line. Returns the number added.
    pub fn import_lines(&mut self, path: &Path) -> Result<usize> {
        let contents = fs::read_to_string(path).map_err(|e| LabelError::io_with_path(e, path))?;
        Ok(contents.lines().filter(|line| self.add(line)).count())
    }

    /// Import the given column of a CSV file. Returns the number added.
    pub fn import_csv(&mut self, path: &Path, column: usize) -> Result<usize> {
        let contents = fs::read_to_string(path).map_err(|e| LabelError::io_with_path(e, path))?;
        let mut added = 0;
        for record in parse_csv(&contents) {
            if let Some(field) = record.get(column) {
                if self.add(field) {
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    pub fn to_file(&self) -> AllowListFile {
        AllowListFile {
            created: Some(Utc::now().to_rfc3339()),
            total_doctors: self.ids.len(),
            whitelist: self.sorted_ids(),
        }
    }

    /// Write the allow-list atomically.
    pub fn save(&self, path: &Path) -> Result<AllowListFile> {
        let file = self.to_file();
        atomic_write_json(path, &file, false)?;
        info!(
            "Saved allow-list with {} identifiers to {}",
            file.total_doctors,
            path.display()
        );
        Ok(file)
    }
}

fn random_id<R: Rng + ?Sized>(rng: &mut R, pattern: &str) -> String {
    let number = rng.random_range(AuthConfig::RANDOM_NUMBER_MIN..=AuthConfig::RANDOM_NUMBER_MAX);
    let suffix: String = (0..AuthConfig::RANDOM_SUFFIX_LEN)
        .map(|_| RANDOM_CHARSET[rng.random_range(0..RANDOM_CHARSET.len())] as char)
        .collect();
    let letter = LETTERS[rng.random_range(0..LETTERS.len())] as char;

    pattern
        .replace("{number}", &number.to_string())
        .replace("{random}", &suffix)
        .replace("{letter}", &letter.to_string())
}

/// Parse CSV records, honouring double-quoted fields and `""` escapes.
///
/// Quoted fields may span lines. Blank lines produce no record.
fn parse_csv(contents: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut started = false;
    let mut chars = contents.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => {
                in_quotes = !in_quotes;
                started = true;
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
                started = true;
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                if started || !current.is_empty() {
                    fields.push(std::mem::take(&mut current));
                    records.push(std::mem::take(&mut fields));
                }
                started = false;
            }
            _ => current.push(c),
        }
    }
    if started || !current.is_empty() {
        fields.push(current);
        records.push(fields);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    #[test]
    fn test_add_suppresses_duplicates_and_blanks() {
        let mut builder = AllowListBuilder::new();
        assert!(builder.add("DOC1"));
        assert!(!builder.add("DOC1"));
        assert!(!builder.add("  DOC1  "));
        assert!(!builder.add("   "));
        assert!(builder.add("doc1"));
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_save_writes_sorted_list_with_total() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doctor_whitelist.json");

        let mut builder = AllowListBuilder::new();
        builder.add("DOC9");
        builder.add("DOC1");
        builder.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["total_doctors"], 2);
        assert_eq!(raw["whitelist"], serde_json::json!(["DOC1", "DOC9"]));
        assert!(raw["created"].is_string());

        let list = AllowList::load(&path).unwrap().unwrap();
        assert!(list.contains("DOC9"));
    }

    #[test]
    fn test_generate_random_uses_pattern() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut builder = AllowListBuilder::new();

        let ids = builder.generate_random_with(&mut rng, 5, "MD{number}-{letter}{random}");
        assert_eq!(ids.len(), 5);
        for id in &ids {
            let rest = id.strip_prefix("MD").unwrap();
            let (number, tail) = rest.split_once('-').unwrap();
            let number: u32 = number.parse().unwrap();
            assert!((1000..=9999).contains(&number));
            assert_eq!(tail.len(), 5);
            assert!(tail.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
        assert_eq!(builder.len(), 5);
    }

    #[test]
    fn test_generate_random_gives_up_on_fixed_pattern() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut builder = AllowListBuilder::new();

        let ids = builder.generate_random_with(&mut rng, 3, "ADMIN");
        assert_eq!(ids, vec!["ADMIN".to_string()]);
    }

    #[test]
    fn test_import_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doctors.txt");
        fs::write(&path, "DOC1\n\nDOC2\r\nDOC1\n").unwrap();

        let mut builder = AllowListBuilder::new();
        assert_eq!(builder.import_lines(&path).unwrap(), 2);
        assert_eq!(builder.sorted_ids(), vec!["DOC1", "DOC2"]);
    }

    #[test]
    fn test_import_csv_column() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doctors.csv");
        fs::write(&path, "name,id\n\"Smith, J\",DOC5\nLee,DOC6\nshort\n").unwrap();

        let mut builder = AllowListBuilder::new();
        assert_eq!(builder.import_csv(&path, 1).unwrap(), 3);
        assert_eq!(builder.sorted_ids(), vec!["DOC5", "DOC6", "id"]);
    }

    #[test]
    fn test_import_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut builder = AllowListBuilder::new();
        assert!(builder.import_lines(&temp_dir.path().join("nope.txt")).is_err());
    }

    #[test]
    fn test_from_existing_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doctor_whitelist.json");
        let mut first = AllowListBuilder::new();
        first.add("DOC1");
        first.save(&path).unwrap();

        let mut builder = AllowListBuilder::from_existing(&path).unwrap();
        assert!(!builder.add("DOC1"));
        assert!(builder.add("DOC2"));
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_parse_csv_records() {
        assert_eq!(parse_csv("a,b\r\n\nc\n"), vec![vec!["a", "b"], vec!["c"]]);
        assert_eq!(parse_csv("\"a,b\",c"), vec![vec!["a,b", "c"]]);
        assert_eq!(parse_csv("\"say \"\"hi\"\"\""), vec![vec!["say \"hi\""]]);
        assert_eq!(parse_csv("\"\"\n"), vec![vec![""]]);
        assert!(parse_csv("").is_empty());
    }

    #[test]
    fn test_import_csv_quoted_newline() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doctors.csv");
        fs::write(&path, "\"Smith,\nJohn\",DOC5\nLee,DOC6\n").unwrap();

        let mut builder = AllowListBuilder::new();
        assert_eq!(builder.import_csv(&path, 1).unwrap(), 2);
        assert_eq!(builder.sorted_ids(), vec!["DOC5", "DOC6"]);
    }
}
