//! Directory scanning for reviewable items.
//!
//! Layout: `<data>/<modality>/images/<bucket>/<file>`. Missing directories
//! contribute nothing; the catalog never fails a request.

use crate::catalog::types::{Bucket, Item, Modality};
use crate::config::{CatalogConfig, PathsConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Enumerates items from the data directory.
#[derive(Debug, Clone)]
pub struct ItemCatalog {
    data_dir: PathBuf,
}

impl ItemCatalog {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn images_dir(&self, modality: &Modality, bucket: Bucket) -> PathBuf {
        self.data_dir
            .join(modality.as_str())
            .join(PathsConfig::IMAGES_DIR_NAME)
            .join(bucket.as_str())
    }

    /// Whether `<data>/<modality>/images` exists.
    pub fn has_images_dir(&self, modality: &Modality) -> bool {
        self.data_dir
            .join(modality.as_str())
            .join(PathsConfig::IMAGES_DIR_NAME)
            .is_dir()
    }

    pub fn image_path(&self, item: &Item) -> PathBuf {
        self.images_dir(&item.modality, item.bucket)
            .join(&item.filename)
    }

    /// All items of a modality in review order: bucket order, then filename.
    pub fn list_items(&self, modality: &Modality) -> Vec<Item> {
        let mut items = Vec::new();
        for bucket in Bucket::ALL {
            let dir = self.images_dir(modality, bucket);
            let mut filenames = list_image_files(&dir);
            filenames.sort();
            debug!("{} images in {}", filenames.len(), dir.display());
            items.extend(filenames.into_iter().map(|filename| Item {
                filename,
                modality: modality.clone(),
                bucket,
            }));
        }
        items
    }

    /// Modalities with an `images/` directory, sorted by name.
    pub fn list_modalities(&self) -> Vec<Modality> {
        if !self.data_dir.is_dir() {
            warn!("Data directory not found: {}", self.data_dir.display());
            return Vec::new();
        }

        let mut modalities: Vec<Modality> = WalkDir::new(&self.data_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir())
            .filter(|entry| entry.path().join(PathsConfig::IMAGES_DIR_NAME).is_dir())
            .filter_map(|entry| Modality::new(entry.file_name().to_string_lossy()).ok())
            .collect();
        modalities.sort();
        modalities
    }
}

/// Whether a filename carries a recognized image extension.
pub fn is_image_file(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => CatalogConfig::IMAGE_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

fn list_image_files(dir: &Path) -> Vec<String> {
    if !dir.is_dir() {
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(String::from))
        .filter(|name| is_image_file(name))
        .collect()
}
