//! In-memory view of one reviewer's labels for one modality.

use crate::catalog::ItemKey;
use crate::store::record::{Category, LabelRecord};
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Ordered mapping from item key to label record.
///
/// Order is first-write order: updating an existing key keeps its position,
/// so iteration order is the order items were first labeled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewerStore {
    records: IndexMap<ItemKey, LabelRecord>,
}

impl ReviewerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&LabelRecord> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Insert or overwrite in place. Returns the previous record.
    pub fn upsert(&mut self, key: ItemKey, record: LabelRecord) -> Option<LabelRecord> {
        self.records.insert(key, record)
    }

    /// Remove a record, preserving the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<LabelRecord> {
        self.records.shift_remove(key)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&ItemKey, &LabelRecord) -> bool) {
        self.records.retain(|key, record| keep(key, record));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemKey, &LabelRecord)> {
        self.records.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.records.keys()
    }

    /// The last `n` records in store order.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = (&ItemKey, &LabelRecord)> {
        self.records.iter().skip(self.records.len().saturating_sub(n))
    }

    /// Number of records per category.
    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.values() {
            *counts.entry(record.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<(ItemKey, LabelRecord)> for ReviewerStore {
    fn from_iter<I: IntoIterator<Item = (ItemKey, LabelRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelScheme;
    use chrono::Utc;

    fn record(category: Category) -> LabelRecord {
        LabelRecord {
            category,
            scheme: LabelScheme::Confidence,
            timestamp: Utc::now(),
            modality: "ct".into(),
            bucket: None,
            filename: "x.png".into(),
            report_text: String::new(),
            reasoning: String::new(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_upsert_keeps_first_write_position() {
        let mut store = ReviewerStore::new();
        store.upsert("easy/a.png".into(), record(Category::Low));
        store.upsert("easy/b.png".into(), record(Category::Low));
        store.upsert("easy/a.png".into(), record(Category::High));

        let keys: Vec<&str> = store.keys().map(ItemKey::as_str).collect();
        assert_eq!(keys, vec!["easy/a.png", "easy/b.png"]);
        assert_eq!(store.get("easy/a.png").unwrap().category, Category::High);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut store = ReviewerStore::new();
        for key in ["easy/a.png", "easy/b.png", "easy/c.png"] {
            store.upsert(key.into(), record(Category::Low));
        }
        assert!(store.remove("easy/b.png").is_some());
        assert!(store.remove("easy/b.png").is_none());

        let keys: Vec<&str> = store.keys().map(ItemKey::as_str).collect();
        assert_eq!(keys, vec!["easy/a.png", "easy/c.png"]);
    }

    #[test]
    fn test_recent_window() {
        let mut store = ReviewerStore::new();
        for i in 0..5 {
            store.upsert(format!("easy/{}.png", i).into(), record(Category::Low));
        }
        let recent: Vec<&str> = store.recent(2).map(|(k, _)| k.as_str()).collect();
        assert_eq!(recent, vec!["easy/3.png", "easy/4.png"]);
        assert_eq!(store.recent(10).count(), 5);
    }

    #[test]
    fn test_category_counts() {
        let mut store = ReviewerStore::new();
        store.upsert("easy/a.png".into(), record(Category::Low));
        store.upsert("easy/b.png".into(), record(Category::Skipped));
        store.upsert("easy/c.png".into(), record(Category::Low));

        let counts = store.category_counts();
        assert_eq!(counts.get(&Category::Low), Some(&2));
        assert_eq!(counts.get(&Category::Skipped), Some(&1));
        assert_eq!(counts.get(&Category::High), None);
    }
}
