//! Centralized configuration for radlabel.
//!
//! Constant groups describe the on-disk layout and fixed review parameters.
//! [`LabelingConfig`] is the optional `radlabel.json` file at the root that
//! overrides paths, schemes and the history window.

use crate::persistence::atomic_read_json;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory and file names, relative to the labeling root.
pub struct PathsConfig;

impl PathsConfig {
    pub const DATA_DIR_NAME: &'static str = "data";
    pub const IMAGES_DIR_NAME: &'static str = "images";
    pub const REPORTS_DIR_NAME: &'static str = "reports";
    pub const LABELS_DIR_NAME: &'static str = "doctor_labels";
    pub const LABEL_FILE_PREFIX: &'static str = "doctor_";
    pub const ALLOWLIST_FILENAME: &'static str = "doctor_whitelist.json";
    pub const CONFIG_FILENAME: &'static str = "radlabel.json";
}

/// Catalog scanning and report lookup.
pub struct CatalogConfig;

impl CatalogConfig {
    /// Recognized image extensions, compared case-insensitively.
    pub const IMAGE_EXTENSIONS: &'static [&'static str] = &["png", "jpg", "jpeg", "bmp"];
    /// Report filename suffixes, tried in order after the image base name.
    pub const REPORT_SUFFIXES: &'static [&'static str] = &[".txt", ".ehr.txt", ".report.txt"];
    pub const REPORT_NOT_FOUND: &'static str = "EHR text not found";
}

/// Review session parameters.
pub struct SessionConfig;

impl SessionConfig {
    pub const HISTORY_WINDOW: usize = 10;
}

/// Reviewer authentication.
pub struct AuthConfig;

impl AuthConfig {
    /// Hex characters kept from the SHA-256 digest of an identifier.
    pub const HANDLE_LEN: usize = 16;
    pub const RANDOM_NUMBER_MIN: u32 = 1000;
    pub const RANDOM_NUMBER_MAX: u32 = 9999;
    pub const RANDOM_SUFFIX_LEN: usize = 4;
    pub const DEFAULT_ID_PATTERN: &'static str = "DOC{number}";
}

/// Category vocabulary used by a modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelScheme {
    /// How hard it is to tell the image is synthetic: easy, medium, hard.
    Difficulty,
    /// How confident the reviewer is: low, medium, high.
    Confidence,
}

impl LabelScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelScheme::Difficulty => "difficulty",
            LabelScheme::Confidence => "confidence",
        }
    }

    /// Substantive categories, in display order.
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            LabelScheme::Difficulty => &["easy", "medium", "hard"],
            LabelScheme::Confidence => &["low", "medium", "high"],
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "difficulty" => Some(LabelScheme::Difficulty),
            "confidence" => Some(LabelScheme::Confidence),
            _ => None,
        }
    }
}

impl Default for LabelScheme {
    fn default() -> Self {
        LabelScheme::Confidence
    }
}

impl std::fmt::Display for LabelScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Contents of the optional `radlabel.json` file.
///
/// Relative paths are resolved against the labeling root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    pub default_scheme: Option<LabelScheme>,
    /// Scheme per modality name.
    pub schemes: HashMap<String, LabelScheme>,
    pub history_window: Option<usize>,
    pub data_dir: Option<PathBuf>,
    pub labels_dir: Option<PathBuf>,
    pub allowlist_file: Option<PathBuf>,
}

impl LabelingConfig {
    /// Load `radlabel.json` from the root, or the defaults if it does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_from(&root.join(PathsConfig::CONFIG_FILENAME))
    }

    /// Load a config file at an explicit path, or the defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        match atomic_read_json::<LabelingConfig>(path)? {
            Some(config) => {
                debug!("Loaded labeling config from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Resolve an optional configured path against the root.
    pub fn resolve(root: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
        match configured {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => root.join(path),
            None => root.join(default_name),
        }
    }
}
