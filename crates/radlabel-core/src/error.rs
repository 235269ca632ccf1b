//! Error types for radlabel.
//!
//! The variants follow the labeling tool's failure taxonomy: configuration
//! absence, missing content, store corruption and authentication problems are
//! all distinguishable so the presentation layer can render different guidance.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the radlabel library.
#[derive(Debug, Error)]
pub enum LabelError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Failed to lock {path}: {message}")]
    Lock { path: PathBuf, message: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A persisted label store could not be parsed. Never treated as empty.
    #[error("Label store at {path} is corrupted: {message}")]
    StoreCorrupted { path: PathBuf, message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Allow-list unavailable: {message}")]
    AllowListUnavailable { message: String },

    // Validation errors
    #[error("Invalid modality: {0}")]
    InvalidModality(String),

    #[error("Category '{category}' is not valid for the {scheme} scheme")]
    InvalidCategory { category: String, scheme: String },

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    // Authentication errors
    #[error("Not authenticated: an identifier is required")]
    NotAuthenticated,

    #[error("Identifier is not on the allow-list")]
    Rejected,

    // Session errors
    #[error("Item {expected} is not the current item (current: {current:?})")]
    StaleItem {
        expected: String,
        current: Option<String>,
    },

    #[error("No item is currently awaiting review")]
    NoCurrentItem,

    #[error("No label recorded for {key}")]
    LabelNotFound { key: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for radlabel operations.
pub type Result<T> = std::result::Result<T, LabelError>;

impl From<std::io::Error> for LabelError {
    fn from(err: std::io::Error) -> Self {
        LabelError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for LabelError {
    fn from(err: serde_json::Error) -> Self {
        LabelError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl LabelError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        LabelError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Standard codes:
    /// - -32602: Invalid params
    /// - -32603: Internal error
    ///
    /// Application-defined codes:
    /// - -32010: Not authenticated
    /// - -32011: Rejected by the allow-list
    /// - -32012: Allow-list unavailable
    /// - -32020: Stale or missing current item
    /// - -32021: Label not found
    /// - -32030: Label store corrupted
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            LabelError::InvalidParams { .. }
            | LabelError::InvalidCategory { .. }
            | LabelError::InvalidModality(_) => -32602,

            LabelError::NotAuthenticated => -32010,
            LabelError::Rejected => -32011,
            LabelError::AllowListUnavailable { .. } => -32012,

            LabelError::StaleItem { .. } | LabelError::NoCurrentItem => -32020,
            LabelError::LabelNotFound { .. } => -32021,

            LabelError::StoreCorrupted { .. } => -32030,

            _ => -32603,
        }
    }

    /// Whether the reviewer can fix this by changing their input.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            LabelError::NotAuthenticated
                | LabelError::Rejected
                | LabelError::InvalidCategory { .. }
                | LabelError::InvalidParams { .. }
                | LabelError::StaleItem { .. }
        )
    }
}
