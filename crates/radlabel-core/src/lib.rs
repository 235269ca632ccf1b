//! radlabel core - Headless library for reviewer labeling sessions.
//!
//! Reviewers sign in with an identifier from a static allow-list, work through
//! a catalog of images (each with an optional text report) and record one
//! categorical judgment per image. Labels are kept per reviewer and per
//! modality in JSON files that are reloaded on every operation. There is no
//! HTTP layer here; see the `radlabel-rpc` crate for that.
//!
//! # Example
//!
//! ```rust,ignore
//! use radlabel_core::{Category, LabelApi, Submission};
//!
//! fn main() -> radlabel_core::Result<()> {
//!     let api = LabelApi::new("/srv/labeling")?;
//!
//!     let session = api.open_session("DOC1042", "retina")?;
//!     let state = api.submit_label(&session, Submission::new(Category::High))?;
//!     println!("{:?}", state.progress());
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod persistence;
pub mod session;
pub mod store;

mod api;

// Re-export commonly used types
pub use auth::{
    AllowList, AllowListBuilder, AllowListFile, AllowListStatus, AuthGate, AuthOutcome, Reviewer,
    ReviewerHandle,
};
pub use catalog::{Bucket, Item, ItemCatalog, ItemKey, Modality, ReportResolver, ReportText};
pub use config::{LabelScheme, LabelingConfig};
pub use error::{LabelError, Result};
pub use session::{
    CategorySummary, CurrentItem, HistoryEntry, LabelUpdate, Progress, Session, SessionController,
    SessionState, Submission, ViewMode,
};
pub use store::{Category, LabelRecord, LabelStore, ReviewerStore};

// Re-export builder from api module
pub use api::LabelApiBuilder;

use std::path::{Path, PathBuf};

/// Main API struct for labeling operations.
///
/// Owns one auth gate and one session controller for a labeling root. Holds
/// no per-reviewer state, so a single instance can be shared by every request.
pub struct LabelApi {
    root: PathBuf,
    data_dir: PathBuf,
    auth: AuthGate,
    sessions: SessionController,
}

impl LabelApi {
    /// Create a builder for LabelApi.
    ///
    /// Use the builder for more control over initialization options:
    /// - `auto_create_dirs`: Create required directories automatically
    /// - `default_scheme` / `with_scheme`: Category vocabulary per modality
    /// - `history_window`: Records shown on the history page
    pub fn builder(root: impl Into<PathBuf>) -> LabelApiBuilder {
        LabelApiBuilder::new(root)
    }

    /// Create a LabelApi with the configuration found under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        LabelApiBuilder::new(root).build()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn labels_dir(&self) -> &Path {
        self.sessions.store().labels_dir()
    }

    pub fn allowlist_path(&self) -> &Path {
        self.auth.allowlist_path()
    }

    pub fn sessions(&self) -> &SessionController {
        &self.sessions
    }

    // ========================================
    // Authentication
    // ========================================

    pub fn authenticate(&self, identifier: &str) -> AuthOutcome {
        self.auth.authenticate(identifier)
    }

    pub fn allowlist_status(&self) -> AllowListStatus {
        self.auth.status()
    }

    // ========================================
    // Catalog
    // ========================================

    pub fn list_modalities(&self) -> Vec<Modality> {
        self.sessions.catalog().list_modalities()
    }

    pub fn scheme_for(&self, modality: &Modality) -> LabelScheme {
        self.sessions.scheme_for(modality)
    }
}
