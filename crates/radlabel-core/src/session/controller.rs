//! The labeling state machine.
//!
//! Every answer is a pure function of the catalog and the reviewer's store as
//! read from disk at the start of the call, so a refresh or a retry never
//! skips or duplicates an item. Mutations that depend on the current item
//! re-derive it under the store lock.

use crate::catalog::{Item, ItemCatalog, ItemKey, Modality, ReportResolver};
use crate::config::{LabelScheme, SessionConfig};
use crate::session::types::{
    CategorySummary, CurrentItem, HistoryEntry, LabelUpdate, Progress, Session, SessionState,
    Submission, ViewMode,
};
use crate::store::{Category, LabelRecord, LabelStore, ReviewerStore};
use crate::{LabelError, Result};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Drives review sessions over a catalog and a label store.
#[derive(Debug)]
pub struct SessionController {
    catalog: ItemCatalog,
    resolver: ReportResolver,
    store: LabelStore,
    default_scheme: LabelScheme,
    schemes: HashMap<String, LabelScheme>,
    history_window: usize,
}

impl SessionController {
    pub fn new(catalog: ItemCatalog, resolver: ReportResolver, store: LabelStore) -> Self {
        Self {
            catalog,
            resolver,
            store,
            default_scheme: LabelScheme::default(),
            schemes: HashMap::new(),
            history_window: SessionConfig::HISTORY_WINDOW,
        }
    }

    pub fn with_default_scheme(mut self, scheme: LabelScheme) -> Self {
        self.default_scheme = scheme;
        self
    }

    pub fn with_scheme(mut self, modality: impl Into<String>, scheme: LabelScheme) -> Self {
        self.schemes.insert(modality.into(), scheme);
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &LabelStore {
        &self.store
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    pub fn scheme_for(&self, modality: &Modality) -> LabelScheme {
        self.schemes
            .get(modality.as_str())
            .copied()
            .unwrap_or(self.default_scheme)
    }

    /// First catalog item without a record, if any.
    pub fn current_item(&self, session: &Session) -> Result<Option<CurrentItem>> {
        let items = self.catalog.list_items(session.modality());
        let store = self.load(session)?;
        Ok(first_unlabeled(&items, &store).map(|item| self.describe(item)))
    }

    pub fn state(&self, session: &Session) -> Result<SessionState> {
        let items = self.catalog.list_items(session.modality());
        let store = self.load(session)?;
        let progress = Progress::compute(&items, &store);
        let current = first_unlabeled(&items, &store).map(|item| self.describe(item));

        Ok(match (session.view(), current) {
            (ViewMode::History, current) => SessionState::ViewingHistory {
                current,
                progress,
                history: self.history_from(&store),
            },
            (ViewMode::Current, Some(current)) => SessionState::Reviewing { current, progress },
            (ViewMode::Current, None) => SessionState::AllLabeled {
                progress,
                summary: CategorySummary::from_store(&store),
            },
        })
    }

    /// Label the current item and advance.
    pub fn submit(&self, session: &Session, submission: Submission) -> Result<SessionState> {
        let scheme = self.scheme_for(session.modality());
        check_category(&submission.category, scheme)?;

        let items = self.catalog.list_items(session.modality());
        let key = self.store.modify(session.reviewer(), session.modality(), |store| {
            let current = first_unlabeled(&items, store);
            let item = match (current, &submission.item_key) {
                (Some(item), Some(expected)) if item.key() != *expected => {
                    return Err(LabelError::StaleItem {
                        expected: expected.to_string(),
                        current: Some(item.key().to_string()),
                    })
                }
                (None, Some(expected)) => {
                    return Err(LabelError::StaleItem {
                        expected: expected.to_string(),
                        current: None,
                    })
                }
                (None, None) => return Err(LabelError::NoCurrentItem),
                (Some(item), _) => item,
            };

            let report_text = match submission.report_text {
                Some(text) => text,
                None => self.resolver.resolve_report(item).text().to_string(),
            };
            let key = item.key();
            store.upsert(
                key.clone(),
                LabelRecord {
                    category: submission.category.clone(),
                    scheme,
                    timestamp: Utc::now(),
                    modality: session.modality().to_string(),
                    bucket: Some(item.bucket),
                    filename: item.filename.clone(),
                    report_text,
                    reasoning: submission.reasoning,
                    extra: Default::default(),
                },
            );
            Ok(key)
        })?;

        info!(
            "Reviewer {} labeled {} as {}",
            session.reviewer().handle(),
            key,
            submission.category
        );
        self.state(session)
    }

    pub fn skip(&self, session: &Session, item_key: Option<ItemKey>) -> Result<SessionState> {
        self.submit(session, reserved(Category::Skipped, item_key))
    }

    pub fn drop_item(&self, session: &Session, item_key: Option<ItemKey>) -> Result<SessionState> {
        self.submit(session, reserved(Category::Dropped, item_key))
    }

    /// The most recent records, oldest first, within the history window.
    pub fn history(&self, session: &Session) -> Result<Vec<HistoryEntry>> {
        Ok(self.history_from(&self.load(session)?))
    }

    /// Replace the category, report text and reasoning of a stored record.
    pub fn update(&self, session: &Session, key: &ItemKey, update: LabelUpdate) -> Result<HistoryEntry> {
        let scheme = self.scheme_for(session.modality());
        check_category(&update.category, scheme)?;

        let entry = self.rewrite(session, key, |record| {
            record.category = update.category;
            record.scheme = scheme;
            record.report_text = update.report_text;
            record.reasoning = update.reasoning;
        })?;
        info!(
            "Reviewer {} updated {} to {}",
            session.reviewer().handle(),
            key,
            entry.record.category
        );
        Ok(entry)
    }

    /// Replace the report text, and the reasoning when given, keeping the category.
    pub fn update_report_text(
        &self,
        session: &Session,
        key: &ItemKey,
        report_text: String,
        reasoning: Option<String>,
    ) -> Result<HistoryEntry> {
        let entry = self.rewrite(session, key, |record| {
            record.report_text = report_text;
            if let Some(reasoning) = reasoning {
                record.reasoning = reasoning;
            }
        })?;
        info!(
            "Reviewer {} updated report text of {}",
            session.reviewer().handle(),
            key
        );
        Ok(entry)
    }

    /// Remove a stored record. Returns false if there was none.
    pub fn delete(&self, session: &Session, key: &ItemKey) -> Result<bool> {
        self.store.delete(session.reviewer(), session.modality(), key)
    }

    pub fn progress(&self, session: &Session) -> Result<Progress> {
        let items = self.catalog.list_items(session.modality());
        Ok(Progress::compute(&items, &self.load(session)?))
    }

    pub fn summary(&self, session: &Session) -> Result<CategorySummary> {
        Ok(CategorySummary::from_store(&self.load(session)?))
    }

    /// Remove records whose item is no longer in the catalog.
    ///
    /// Refuses when the modality has no images directory: an unmounted data
    /// dir would otherwise make every record look stale.
    pub fn prune_stale(&self, session: &Session) -> Result<Vec<ItemKey>> {
        if !self.catalog.has_images_dir(session.modality()) {
            warn!(
                "Not pruning {}: no images directory under {}",
                session.modality(),
                self.catalog.data_dir().display()
            );
            return Err(LabelError::Config {
                message: format!(
                    "Images for modality '{}' not found; refusing to prune labels",
                    session.modality()
                ),
            });
        }

        let live: HashSet<ItemKey> = self
            .catalog
            .list_items(session.modality())
            .iter()
            .map(Item::key)
            .collect();
        self.store
            .prune_stale(session.reviewer(), session.modality(), &live)
    }

    fn load(&self, session: &Session) -> Result<ReviewerStore> {
        self.store.load(session.reviewer(), session.modality())
    }

    fn rewrite(
        &self,
        session: &Session,
        key: &ItemKey,
        edit: impl FnOnce(&mut LabelRecord),
    ) -> Result<HistoryEntry> {
        self.store.modify(session.reviewer(), session.modality(), |store| {
            let mut record = store
                .get(key.as_str())
                .cloned()
                .ok_or_else(|| LabelError::LabelNotFound {
                    key: key.to_string(),
                })?;
            edit(&mut record);
            record.timestamp = Utc::now();
            store.upsert(key.clone(), record.clone());
            Ok(HistoryEntry {
                key: key.clone(),
                record,
            })
        })
    }

    fn history_from(&self, store: &ReviewerStore) -> Vec<HistoryEntry> {
        store
            .recent(self.history_window)
            .map(|(key, record)| HistoryEntry {
                key: key.clone(),
                record: record.clone(),
            })
            .collect()
    }

    fn describe(&self, item: &Item) -> CurrentItem {
        let image_path = self.catalog.image_path(item);
        let image_available = image_path.is_file();
        if !image_available {
            debug!("Image missing for {}: {}", item.key(), image_path.display());
        }
        CurrentItem {
            key: item.key(),
            item: item.clone(),
            report: self.resolver.resolve_report(item),
            image_path,
            image_available,
        }
    }
}

fn first_unlabeled<'a>(items: &'a [Item], store: &ReviewerStore) -> Option<&'a Item> {
    items
        .iter()
        .find(|item| !store.contains_key(item.key().as_str()))
}

fn check_category(category: &Category, scheme: LabelScheme) -> Result<()> {
    if category.is_valid_for(scheme) {
        Ok(())
    } else {
        Err(LabelError::InvalidCategory {
            category: category.to_string(),
            scheme: scheme.to_string(),
        })
    }
}

fn reserved(category: Category, item_key: Option<ItemKey>) -> Submission {
    Submission {
        category,
        report_text: None,
        reasoning: String::new(),
        item_key,
    }
}
