//! Reviewer authentication.
//!
//! This module provides:
//! - The allow-list file format and its administrative builder
//! - The auth gate that turns an identifier into a [`Reviewer`]
//! - Non-reversible reviewer handles

mod allowlist;
mod gate;

pub use allowlist::{AllowList, AllowListBuilder, AllowListFile};
pub use gate::{AllowListStatus, AuthGate, AuthOutcome, Reviewer, ReviewerHandle};
