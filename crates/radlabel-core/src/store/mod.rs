//! Label storage.
//!
//! This module provides:
//! - The canonical label record and normalization of older persisted shapes
//! - The ordered per-reviewer, per-modality mapping
//! - Locked, atomic load-modify-save against the label files

mod label_store;
mod record;
mod reviewer_store;

pub use label_store::LabelStore;
pub use record::{parse_timestamp, Category, LabelRecord, RawLabelRecord};
pub use reviewer_store::ReviewerStore;
