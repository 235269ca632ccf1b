//! Session values and the views the controller returns.

use crate::auth::Reviewer;
use crate::catalog::{Item, ItemKey, Modality, ReportText};
use crate::store::{Category, LabelRecord, ReviewerStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Which page the reviewer is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Current,
    History,
}

impl ViewMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "current" => Some(ViewMode::Current),
            "history" => Some(ViewMode::History),
            _ => None,
        }
    }
}

/// One reviewer working through one modality.
///
/// Carries no labels; every operation reloads the store. The caller passes
/// the session back on each request, view mode included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    reviewer: Reviewer,
    modality: Modality,
    view: ViewMode,
}

impl Session {
    pub fn new(reviewer: Reviewer, modality: Modality) -> Self {
        Self {
            reviewer,
            modality,
            view: ViewMode::Current,
        }
    }

    pub fn with_view(mut self, view: ViewMode) -> Self {
        self.view = view;
        self
    }

    pub fn reviewer(&self) -> &Reviewer {
        &self.reviewer
    }

    pub fn modality(&self) -> &Modality {
        &self.modality
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn enter_history(&mut self) {
        self.view = ViewMode::History;
    }

    pub fn exit_history(&mut self) {
        self.view = ViewMode::Current;
    }
}

/// The item awaiting review, with everything needed to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentItem {
    pub key: ItemKey,
    pub item: Item,
    pub report: ReportText,
    pub image_path: PathBuf,
    /// False when the image vanished after discovery; render a placeholder.
    pub image_available: bool,
}

/// Review progress over the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub labeled: usize,
    pub total: usize,
    pub remaining: usize,
    /// Records whose item is no longer in the catalog.
    pub stale: usize,
    pub percent: f64,
}

impl Progress {
    pub fn compute(items: &[Item], store: &ReviewerStore) -> Self {
        let live: HashSet<ItemKey> = items.iter().map(Item::key).collect();
        let labeled = live.iter().filter(|key| store.contains_key(key.as_str())).count();
        let total = live.len();
        let stale = store.keys().filter(|key| !live.contains(*key)).count();
        let percent = if total == 0 {
            0.0
        } else {
            labeled as f64 * 100.0 / total as f64
        };

        Self {
            labeled,
            total,
            remaining: total - labeled,
            stale,
            percent,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Per-category counts over every stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    /// Substantive judgments by category name.
    pub judgments: BTreeMap<String, usize>,
    pub skipped: usize,
    pub dropped: usize,
    pub total: usize,
}

impl CategorySummary {
    pub fn from_store(store: &ReviewerStore) -> Self {
        let mut summary = Self::default();
        for (category, count) in store.category_counts() {
            summary.total += count;
            match category {
                Category::Skipped => summary.skipped += count,
                Category::Dropped => summary.dropped += count,
                other => {
                    *summary.judgments.entry(other.to_string()).or_insert(0) += count;
                }
            }
        }
        summary
    }
}

/// A stored record as shown on the history page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub key: ItemKey,
    pub record: LabelRecord,
}

/// A judgment for the current item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Submission {
    pub category: Category,
    /// Edited report text; the resolved report when absent.
    #[serde(default)]
    pub report_text: Option<String>,
    #[serde(default)]
    pub reasoning: String,
    /// Key of the item the client was shown.
    #[serde(default)]
    pub item_key: Option<ItemKey>,
}

impl Submission {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            report_text: None,
            reasoning: String::new(),
            item_key: None,
        }
    }

    pub fn with_report_text(mut self, text: impl Into<String>) -> Self {
        self.report_text = Some(text.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn for_item(mut self, key: ItemKey) -> Self {
        self.item_key = Some(key);
        self
    }
}

/// Replacement values for a previously stored record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelUpdate {
    pub category: Category,
    pub report_text: String,
    #[serde(default)]
    pub reasoning: String,
}

/// What the reviewer should see next.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Reviewing {
        current: CurrentItem,
        progress: Progress,
    },
    /// History page. `current` is where review resumes on exit.
    ViewingHistory {
        current: Option<CurrentItem>,
        progress: Progress,
        history: Vec<HistoryEntry>,
    },
    AllLabeled {
        progress: Progress,
        summary: CategorySummary,
    },
}

impl SessionState {
    pub fn progress(&self) -> &Progress {
        match self {
            SessionState::Reviewing { progress, .. }
            | SessionState::ViewingHistory { progress, .. }
            | SessionState::AllLabeled { progress, .. } => progress,
        }
    }

    pub fn current(&self) -> Option<&CurrentItem> {
        match self {
            SessionState::Reviewing { current, .. } => Some(current),
            SessionState::ViewingHistory { current, .. } => current.as_ref(),
            SessionState::AllLabeled { .. } => None,
        }
    }

    pub fn current_key(&self) -> Option<&ItemKey> {
        self.current().map(|current| &current.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Bucket;
    use crate::config::LabelScheme;
    use chrono::Utc;

    fn item(bucket: Bucket, filename: &str) -> Item {
        Item {
            filename: filename.into(),
            modality: Modality::new("ct").unwrap(),
            bucket,
        }
    }

    fn record(category: Category) -> LabelRecord {
        LabelRecord {
            category,
            scheme: LabelScheme::Confidence,
            timestamp: Utc::now(),
            modality: "ct".into(),
            bucket: Some(Bucket::Easy),
            filename: "x.png".into(),
            report_text: String::new(),
            reasoning: String::new(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_progress_empty_catalog() {
        let progress = Progress::compute(&[], &ReviewerStore::new());
        assert_eq!(progress.total, 0);
        assert_eq!(progress.labeled, 0);
        assert_eq!(progress.percent, 0.0);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_progress_counts_stale_separately() {
        let items = vec![item(Bucket::Easy, "a.png"), item(Bucket::Easy, "b.png")];
        let mut store = ReviewerStore::new();
        store.upsert("easy/a.png".into(), record(Category::Low));
        store.upsert("hard/gone.png".into(), record(Category::High));

        let progress = Progress::compute(&items, &store);
        assert_eq!(progress.labeled, 1);
        assert_eq!(progress.total, 2);
        assert_eq!(progress.remaining, 1);
        assert_eq!(progress.stale, 1);
        assert_eq!(progress.percent, 50.0);
    }

    #[test]
    fn test_summary_splits_reserved_categories() {
        let mut store = ReviewerStore::new();
        store.upsert("easy/a.png".into(), record(Category::Low));
        store.upsert("easy/b.png".into(), record(Category::Low));
        store.upsert("easy/c.png".into(), record(Category::Skipped));
        store.upsert("easy/d.png".into(), record(Category::Dropped));
        store.upsert("easy/e.png".into(), record(Category::Other("very_hard".into())));

        let summary = CategorySummary::from_store(&store);
        assert_eq!(summary.judgments.get("low"), Some(&2));
        assert_eq!(summary.judgments.get("very_hard"), Some(&1));
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.total, 5);
    }

    #[test]
    fn test_view_mode_toggle() {
        let mut session = Session::new(Reviewer::new("DOC1"), Modality::new("ct").unwrap());
        assert_eq!(session.view(), ViewMode::Current);
        session.enter_history();
        assert_eq!(session.view(), ViewMode::History);
        session.exit_history();
        assert_eq!(session.view(), ViewMode::Current);
    }

    #[test]
    fn test_submission_deserializes_with_defaults() {
        let submission: Submission = serde_json::from_str(r#"{"category": "high"}"#).unwrap();
        assert_eq!(submission, Submission::new(Category::High));
    }
}
