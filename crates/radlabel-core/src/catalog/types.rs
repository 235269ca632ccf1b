//! Catalog types: modalities, buckets, items and their keys.

use crate::{LabelError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Name of a data modality, e.g. `retina` or `chest_xray`.
///
/// Always a single path component so it can name directories safely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Modality(String);

impl Modality {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(['/', '\\', ':'])
        {
            return Err(LabelError::InvalidModality(name));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Modality {
    type Error = LabelError;

    fn try_from(value: String) -> Result<Self> {
        Modality::new(value)
    }
}

impl From<Modality> for String {
    fn from(value: Modality) -> Self {
        value.0
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pre-assigned difficulty bucket an image is filed under.
///
/// Only used for file organization; unrelated to the reviewer's judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Easy,
    Medium,
    Hard,
}

impl Bucket {
    /// All buckets in review order.
    pub const ALL: [Bucket; 3] = [Bucket::Easy, Bucket::Medium, Bucket::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Easy => "easy",
            Bucket::Medium => "medium",
            Bucket::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Bucket::Easy),
            "medium" => Some(Bucket::Medium),
            "hard" => Some(Bucket::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store key of an item: `<bucket>/<filename>`.
///
/// Keys read back from older stores may not follow that shape, so any string
/// is accepted; [`ItemKey::parts`] tells the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn new(bucket: Bucket, filename: &str) -> Self {
        Self(format!("{}/{}", bucket.as_str(), filename))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bucket and filename, when the key has the canonical shape.
    pub fn parts(&self) -> Option<(Bucket, &str)> {
        let (bucket, filename) = self.0.split_once('/')?;
        if filename.is_empty() {
            return None;
        }
        Bucket::from_str(bucket).map(|b| (b, filename))
    }
}

impl From<String> for ItemKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for ItemKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One reviewable image discovered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub filename: String,
    pub modality: Modality,
    pub bucket: Bucket,
}

impl Item {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.bucket, &self.filename)
    }

    /// Filename without its image extension.
    pub fn base_name(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((base, _)) if !base.is_empty() => base,
            _ => &self.filename,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modality_validation() {
        assert_eq!(Modality::new(" retina ").unwrap().as_str(), "retina");
        assert!(Modality::new("").is_err());
        assert!(Modality::new("..").is_err());
        assert!(Modality::new("ct/../etc").is_err());
        assert!(Modality::new("c:t").is_err());
    }

    #[test]
    fn test_modality_deserialize_rejects_paths() {
        let ok: Modality = serde_json::from_str("\"ct\"").unwrap();
        assert_eq!(ok.as_str(), "ct");
        assert!(serde_json::from_str::<Modality>("\"../x\"").is_err());
    }

    #[test]
    fn test_bucket_order() {
        let mut buckets = vec![Bucket::Hard, Bucket::Easy, Bucket::Medium];
        buckets.sort();
        assert_eq!(buckets, Bucket::ALL.to_vec());
    }

    #[test]
    fn test_item_key() {
        let item = Item {
            filename: "scan007.png".into(),
            modality: Modality::new("ct").unwrap(),
            bucket: Bucket::Medium,
        };
        let key = item.key();
        assert_eq!(key.as_str(), "medium/scan007.png");
        assert_eq!(key.parts(), Some((Bucket::Medium, "scan007.png")));
        assert_eq!(item.base_name(), "scan007");
    }

    #[test]
    fn test_legacy_key_has_no_parts() {
        assert_eq!(ItemKey::from("scan007.png").parts(), None);
        assert_eq!(ItemKey::from("extreme/scan007.png").parts(), None);
        assert_eq!(ItemKey::from("easy/").parts(), None);
    }

    #[test]
    fn test_base_name_keeps_dotfiles() {
        let item = Item {
            filename: ".png".into(),
            modality: Modality::new("ct").unwrap(),
            bucket: Bucket::Easy,
        };
        assert_eq!(item.base_name(), ".png");
    }
}
