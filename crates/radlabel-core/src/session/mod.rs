//! Review sessions.
//!
//! This module provides:
//! - The [`Session`] value a caller passes back on each request
//! - The state machine that selects the next item and applies edits
//! - Progress, summary and history views

mod controller;
mod types;

pub use controller::SessionController;
pub use types::{
    CategorySummary, CurrentItem, HistoryEntry, LabelUpdate, Progress, Session, SessionState,
    Submission, ViewMode,
};
