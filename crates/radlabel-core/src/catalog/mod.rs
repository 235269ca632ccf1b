//! Item catalog and report lookup.
//!
//! This module provides:
//! - Catalog types (modality, bucket, item, item key)
//! - Deterministic directory scanning in review order
//! - Report resolution with a not-found sentinel

mod report;
mod scanner;
mod types;

pub use report::{ReportResolver, ReportText};
pub use scanner::{is_image_file, ItemCatalog};
pub use types::{Bucket, Item, ItemKey, Modality};
