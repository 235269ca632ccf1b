//! Canonical label records and their persisted shape.
//!
//! Records written by older versions of the tool differ in shape: the
//! category may sit under `doctor_difficulty` or `doctor_confidence`, the
//! bucket under `original_difficulty`, and `filename`/`modality`/`reasoning`
//! may be absent. [`RawLabelRecord`] accepts all of them and
//! [`LabelRecord::from_raw`] normalizes into one shape. Fields this version
//! does not know are kept in `extra` and written back unchanged.

use crate::catalog::{Bucket, ItemKey, Modality};
use crate::config::LabelScheme;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reviewer's judgment for one item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Easy,
    Medium,
    Hard,
    Low,
    High,
    Skipped,
    Dropped,
    /// A value written by another version of the tool.
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Easy => "easy",
            Category::Medium => "medium",
            Category::Hard => "hard",
            Category::Low => "low",
            Category::High => "high",
            Category::Skipped => "skipped",
            Category::Dropped => "dropped",
            Category::Other(value) => value,
        }
    }

    /// Parse a known category; unknown values are `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Category::Easy),
            "medium" => Some(Category::Medium),
            "hard" => Some(Category::Hard),
            "low" => Some(Category::Low),
            "high" => Some(Category::High),
            "skipped" => Some(Category::Skipped),
            "dropped" => Some(Category::Dropped),
            _ => None,
        }
    }

    /// Skip and drop count as labeled but are not judgments.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Category::Skipped | Category::Dropped)
    }

    /// Whether this category may be submitted under `scheme`.
    pub fn is_valid_for(&self, scheme: LabelScheme) -> bool {
        self.is_reserved() || scheme.categories().contains(&self.as_str())
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::parse(&value).unwrap_or(Category::Other(value))
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Category::from)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record as found on disk, in any historical shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLabelRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_confidence: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_difficulty: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ehr_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Canonical label record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub category: Category,
    /// Scheme the category was recorded under; selects the persisted field.
    pub scheme: LabelScheme,
    pub timestamp: DateTime<Utc>,
    pub modality: String,
    pub bucket: Option<Bucket>,
    pub filename: String,
    pub report_text: String,
    #[serde(default)]
    pub reasoning: String,
    /// Unrecognized persisted fields, carried through on rewrite.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LabelRecord {
    /// Normalize a persisted record.
    ///
    /// `key` and `modality` fill in fields older records omit. Fails with a
    /// message when the timestamp is missing or unparseable.
    pub fn from_raw(key: &ItemKey, raw: RawLabelRecord, modality: &Modality) -> Result<Self, String> {
        let (scheme, category) = match (raw.doctor_confidence, raw.doctor_difficulty) {
            (Some(category), _) => (LabelScheme::Confidence, category),
            (None, Some(category)) => (LabelScheme::Difficulty, category),
            (None, None) => return Err(format!("record {} has no category", key)),
        };

        let timestamp = match raw.timestamp.as_deref() {
            Some(value) => parse_timestamp(value)
                .ok_or_else(|| format!("record {} has invalid timestamp '{}'", key, value))?,
            None => return Err(format!("record {} has no timestamp", key)),
        };

        let key_parts = key.parts();
        let bucket = raw
            .difficulty
            .as_deref()
            .or(raw.original_difficulty.as_deref())
            .and_then(Bucket::from_str)
            .or(key_parts.map(|(bucket, _)| bucket));

        let filename = raw.filename.unwrap_or_else(|| match key_parts {
            Some((_, filename)) => filename.to_string(),
            None => key.as_str().to_string(),
        });

        Ok(Self {
            category,
            scheme,
            timestamp,
            modality: raw.modality.unwrap_or_else(|| modality.to_string()),
            bucket,
            filename,
            report_text: raw.ehr_text.unwrap_or_default(),
            reasoning: raw.reasoning.unwrap_or_default(),
            extra: raw.extra,
        })
    }

    /// Persisted shape in the current format.
    pub fn to_raw(&self) -> RawLabelRecord {
        let (doctor_confidence, doctor_difficulty) = match self.scheme {
            LabelScheme::Confidence => (Some(self.category.clone()), None),
            LabelScheme::Difficulty => (None, Some(self.category.clone())),
        };

        RawLabelRecord {
            doctor_confidence,
            doctor_difficulty,
            timestamp: Some(self.timestamp.to_rfc3339()),
            modality: Some(self.modality.clone()),
            difficulty: self.bucket.map(|b| b.as_str().to_string()),
            original_difficulty: None,
            filename: Some(self.filename.clone()),
            ehr_text: Some(self.report_text.clone()),
            reasoning: Some(self.reasoning.clone()),
            extra: self.extra.clone(),
        }
    }

    /// Canonical store key, when the record names its bucket.
    pub fn canonical_key(&self) -> Option<ItemKey> {
        self.bucket.map(|bucket| ItemKey::new(bucket, &self.filename))
    }
}

/// Parse RFC 3339, or a naive ISO-8601 timestamp read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ct() -> Modality {
        Modality::new("ct").unwrap()
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("High"), Some(Category::High));
        assert_eq!(Category::parse("skipped"), Some(Category::Skipped));
        assert_eq!(Category::parse("very_hard"), None);
        assert_eq!(
            Category::from("very_hard".to_string()),
            Category::Other("very_hard".into())
        );
    }

    #[test]
    fn test_category_scheme_validation() {
        assert!(Category::Low.is_valid_for(LabelScheme::Confidence));
        assert!(!Category::Low.is_valid_for(LabelScheme::Difficulty));
        assert!(Category::Medium.is_valid_for(LabelScheme::Difficulty));
        assert!(Category::Dropped.is_valid_for(LabelScheme::Difficulty));
        assert!(!Category::Other("meh".into()).is_valid_for(LabelScheme::Confidence));
    }

    #[test]
    fn test_current_shape_normalizes() {
        let raw: RawLabelRecord = serde_json::from_value(json!({
            "doctor_confidence": "high",
            "timestamp": "2026-10-14T09:30:00+00:00",
            "modality": "ct",
            "difficulty": "easy",
            "filename": "x.png",
            "ehr_text": "report",
            "reasoning": "clear artifact"
        }))
        .unwrap();

        let record = LabelRecord::from_raw(&ItemKey::from("easy/x.png"), raw, &ct()).unwrap();
        assert_eq!(record.category, Category::High);
        assert_eq!(record.scheme, LabelScheme::Confidence);
        assert_eq!(record.bucket, Some(Bucket::Easy));
        assert_eq!(record.reasoning, "clear artifact");
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_legacy_shape_normalizes() {
        let raw: RawLabelRecord = serde_json::from_value(json!({
            "doctor_difficulty": "medium",
            "timestamp": "2025-03-01T12:00:00.123456",
            "original_difficulty": "hard",
            "seed": 42,
            "ehr_text": "old report",
            "metadata": {"scm_realism": 0.8}
        }))
        .unwrap();

        let record = LabelRecord::from_raw(&ItemKey::from("scan1.png"), raw, &ct()).unwrap();
        assert_eq!(record.category, Category::Medium);
        assert_eq!(record.scheme, LabelScheme::Difficulty);
        assert_eq!(record.bucket, Some(Bucket::Hard));
        assert_eq!(record.filename, "scan1.png");
        assert_eq!(record.modality, "ct");
        assert_eq!(record.reasoning, "");
        assert_eq!(record.canonical_key(), Some(ItemKey::from("hard/scan1.png")));
        assert_eq!(record.extra.get("seed"), Some(&json!(42)));

        let rewritten = serde_json::to_value(record.to_raw()).unwrap();
        assert_eq!(rewritten["doctor_difficulty"], "medium");
        assert_eq!(rewritten["difficulty"], "hard");
        assert_eq!(rewritten["metadata"]["scm_realism"], 0.8);
        assert!(rewritten.get("original_difficulty").is_none());
        assert!(rewritten.get("doctor_confidence").is_none());
    }

    #[test]
    fn test_missing_category_or_timestamp_is_rejected() {
        let key = ItemKey::from("easy/x.png");
        let no_category: RawLabelRecord =
            serde_json::from_value(json!({"timestamp": "2026-01-01T00:00:00Z"})).unwrap();
        assert!(LabelRecord::from_raw(&key, no_category, &ct()).is_err());

        let bad_time: RawLabelRecord =
            serde_json::from_value(json!({"doctor_confidence": "low", "timestamp": "yesterday"}))
                .unwrap();
        assert!(LabelRecord::from_raw(&key, bad_time, &ct()).is_err());
    }

    #[test]
    fn test_unknown_category_survives() {
        let raw: RawLabelRecord = serde_json::from_value(json!({
            "doctor_difficulty": "very_hard",
            "timestamp": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        let record = LabelRecord::from_raw(&ItemKey::from("hard/a.png"), raw, &ct()).unwrap();
        assert_eq!(record.category, Category::Other("very_hard".into()));
        assert_eq!(
            serde_json::to_value(record.to_raw()).unwrap()["doctor_difficulty"],
            "very_hard"
        );
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert!(parse_timestamp("2026-10-14T09:30:00Z").is_some());
        assert!(parse_timestamp("2026-10-14T09:30:00.5+02:00").is_some());
        assert!(parse_timestamp("2026-10-14T09:30:00").is_some());
        assert!(parse_timestamp("14/10/2026").is_none());
    }
}
