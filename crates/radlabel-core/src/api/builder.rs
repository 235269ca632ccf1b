//! Builder for configuring LabelApi initialization.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::auth::AuthGate;
use crate::catalog::{ItemCatalog, ReportResolver};
use crate::config::{LabelingConfig, LabelScheme, PathsConfig, SessionConfig};
use crate::error::{LabelError, Result};
use crate::session::SessionController;
use crate::store::LabelStore;
use crate::LabelApi;

/// Builder for configuring LabelApi initialization.
///
/// Values set on the builder take precedence over the `radlabel.json` file,
/// which takes precedence over the built-in defaults.
///
/// # Example
///
/// ```rust,ignore
/// use radlabel_core::{LabelApi, LabelScheme};
///
/// let api = LabelApi::builder("./labeling")
///     .auto_create_dirs(true)
///     .with_scheme("retina", LabelScheme::Difficulty)
///     .build()?;
/// ```
pub struct LabelApiBuilder {
    root: PathBuf,
    config_file: Option<PathBuf>,
    default_scheme: Option<LabelScheme>,
    schemes: HashMap<String, LabelScheme>,
    history_window: Option<usize>,
    auto_create_dirs: bool,
    keep_backup: bool,
}

impl LabelApiBuilder {
    /// Create a new builder with the labeling root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config_file: None,
            default_scheme: None,
            schemes: HashMap::new(),
            history_window: None,
            auto_create_dirs: false,
            keep_backup: true,
        }
    }

    /// Read configuration from this file instead of `<root>/radlabel.json`.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Scheme for modalities without their own entry.
    pub fn default_scheme(mut self, scheme: LabelScheme) -> Self {
        self.default_scheme = Some(scheme);
        self
    }

    pub fn with_scheme(mut self, modality: impl Into<String>, scheme: LabelScheme) -> Self {
        self.schemes.insert(modality.into(), scheme);
        self
    }

    /// Number of records shown on the history page.
    ///
    /// Default: 10
    pub fn history_window(mut self, window: usize) -> Self {
        self.history_window = Some(window);
        self
    }

    /// Auto-create the root, data and labels directories if they don't exist.
    ///
    /// Default: `false` (the root must exist)
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Keep a `.bak` copy of each label file on save.
    ///
    /// Default: `true`
    pub fn keep_backup(mut self, enable: bool) -> Self {
        self.keep_backup = enable;
        self
    }

    fn create_dir(dir: &Path) -> Result<()> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| LabelError::Io {
                message: format!("Failed to create directory: {}", dir.display()),
                path: Some(dir.to_path_buf()),
                source: Some(e),
            })?;
        }
        Ok(())
    }

    /// Build the LabelApi instance.
    pub fn build(self) -> Result<LabelApi> {
        if self.auto_create_dirs {
            Self::create_dir(&self.root)?;
        } else if !self.root.is_dir() {
            return Err(LabelError::Config {
                message: format!("Labeling root does not exist: {}", self.root.display()),
            });
        }

        let config = match &self.config_file {
            Some(path) => LabelingConfig::load_from(path)?,
            None => LabelingConfig::load(&self.root)?,
        };

        let data_dir = LabelingConfig::resolve(
            &self.root,
            config.data_dir.as_deref(),
            PathsConfig::DATA_DIR_NAME,
        );
        let labels_dir = LabelingConfig::resolve(
            &self.root,
            config.labels_dir.as_deref(),
            PathsConfig::LABELS_DIR_NAME,
        );
        let allowlist_path = LabelingConfig::resolve(
            &self.root,
            config.allowlist_file.as_deref(),
            PathsConfig::ALLOWLIST_FILENAME,
        );

        if self.auto_create_dirs {
            Self::create_dir(&data_dir)?;
            Self::create_dir(&labels_dir)?;
        }
        if !data_dir.is_dir() {
            warn!("Data directory not found: {}", data_dir.display());
        }
        if !allowlist_path.is_file() {
            warn!(
                "Allow-list not found at {}; reviewers cannot sign in until it is created",
                allowlist_path.display()
            );
        }

        let default_scheme = self
            .default_scheme
            .or(config.default_scheme)
            .unwrap_or_default();
        let history_window = self
            .history_window
            .or(config.history_window)
            .unwrap_or(SessionConfig::HISTORY_WINDOW);

        let mut schemes = config.schemes;
        schemes.extend(self.schemes);

        let mut sessions = SessionController::new(
            ItemCatalog::new(&data_dir),
            ReportResolver::new(&data_dir),
            LabelStore::new(&labels_dir).with_backup(self.keep_backup),
        )
        .with_default_scheme(default_scheme)
        .with_history_window(history_window);
        for (modality, scheme) in schemes {
            debug!("Modality {} uses the {} scheme", modality, scheme);
            sessions = sessions.with_scheme(modality, scheme);
        }

        info!(
            "Labeling root {} (data: {}, labels: {})",
            self.root.display(),
            data_dir.display(),
            labels_dir.display()
        );

        Ok(LabelApi {
            root: self.root,
            data_dir,
            auth: AuthGate::new(allowlist_path),
            sessions,
        })
    }
}
