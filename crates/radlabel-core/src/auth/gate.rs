//! Reviewer authentication against the static allow-list.

use crate::auth::allowlist::AllowList;
use crate::config::AuthConfig;
use crate::{LabelError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Non-reversible display form of a reviewer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewerHandle(String);

impl ReviewerHandle {
    /// First [`AuthConfig::HANDLE_LEN`] hex characters of the SHA-256 digest.
    pub fn derive(identifier: &str) -> Self {
        let digest = hex::encode(Sha256::digest(identifier.as_bytes()));
        Self(digest[..AuthConfig::HANDLE_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReviewerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated reviewer.
///
/// Only [`AuthGate`] hands these out, so holding one proves the identifier
/// passed the allow-list. Serializes to the handle alone.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Reviewer {
    #[serde(skip)]
    id: String,
    handle: ReviewerHandle,
}

impl Reviewer {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let handle = ReviewerHandle::derive(&id);
        Self { id, handle }
    }

    /// Raw identifier. Used to name the reviewer's label files; never logged.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn handle(&self) -> &ReviewerHandle {
        &self.handle
    }
}

impl fmt::Debug for Reviewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reviewer")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Result of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthOutcome {
    Authenticated { reviewer: Reviewer },
    /// No identifier was submitted yet.
    NotAuthenticated,
    /// The identifier is not on the allow-list.
    Rejected,
    /// The allow-list is missing, empty or unreadable.
    Unavailable { message: String },
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated { .. })
    }

    /// Convert into the reviewer or the matching error.
    pub fn into_result(self) -> Result<Reviewer> {
        match self {
            AuthOutcome::Authenticated { reviewer } => Ok(reviewer),
            AuthOutcome::NotAuthenticated => Err(LabelError::NotAuthenticated),
            AuthOutcome::Rejected => Err(LabelError::Rejected),
            AuthOutcome::Unavailable { message } => {
                Err(LabelError::AllowListUnavailable { message })
            }
        }
    }
}

/// Summary of the allow-list for the login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowListStatus {
    pub available: bool,
    pub reviewer_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Validates identifiers against the allow-list file.
///
/// The file is re-read on every attempt; it is owned by the admin tool and may
/// change while the server runs.
#[derive(Debug, Clone)]
pub struct AuthGate {
    allowlist_path: PathBuf,
}

impl AuthGate {
    pub fn new(allowlist_path: impl Into<PathBuf>) -> Self {
        Self {
            allowlist_path: allowlist_path.into(),
        }
    }

    pub fn allowlist_path(&self) -> &Path {
        &self.allowlist_path
    }

    pub fn authenticate(&self, identifier: &str) -> AuthOutcome {
        if identifier.is_empty() {
            return AuthOutcome::NotAuthenticated;
        }

        let allowlist = match self.load_allowlist() {
            Ok(list) => list,
            Err(message) => return AuthOutcome::Unavailable { message },
        };

        if allowlist.contains(identifier) {
            let reviewer = Reviewer::new(identifier);
            info!("Reviewer {} authenticated", reviewer.handle());
            AuthOutcome::Authenticated { reviewer }
        } else {
            warn!("Rejected identifier not on the allow-list");
            AuthOutcome::Rejected
        }
    }

    pub fn status(&self) -> AllowListStatus {
        match self.load_allowlist() {
            Ok(list) => AllowListStatus {
                available: true,
                reviewer_count: list.len(),
                message: None,
            },
            Err(message) => AllowListStatus {
                available: false,
                reviewer_count: 0,
                message: Some(message),
            },
        }
    }

    fn load_allowlist(&self) -> std::result::Result<AllowList, String> {
        match AllowList::load(&self.allowlist_path) {
            Ok(Some(list)) if !list.is_empty() => Ok(list),
            Ok(Some(_)) => {
                warn!("Allow-list {} is empty", self.allowlist_path.display());
                Err("Allow-list is empty. Please contact the administrator.".to_string())
            }
            Ok(None) => {
                warn!("Allow-list not found at {}", self.allowlist_path.display());
                Err("Allow-list not found. Please contact the administrator.".to_string())
            }
            Err(e) => {
                error!("Failed to load allow-list: {}", e);
                Err(format!("Allow-list could not be read: {}", e))
            }
        }
    }
}
