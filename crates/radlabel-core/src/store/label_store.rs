//! Durable per-reviewer, per-modality label files.
//!
//! Files live at `<labels>/<modality>/doctor_<reviewer>.json` and hold a JSON
//! object mapping item keys to records in first-write order. Every mutation is
//! a locked load-modify-save; the file on disk is the source of truth and
//! nothing is cached between calls.

use crate::auth::Reviewer;
use crate::catalog::{ItemKey, Modality};
use crate::config::PathsConfig;
use crate::persistence::{atomic_read_json, atomic_write_json, KeyedLocks};
use crate::store::record::{LabelRecord, RawLabelRecord};
use crate::store::reviewer_store::ReviewerStore;
use crate::{LabelError, Result};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Persisted label store.
#[derive(Debug)]
pub struct LabelStore {
    labels_dir: PathBuf,
    locks: KeyedLocks,
    keep_backup: bool,
}

impl LabelStore {
    pub fn new(labels_dir: impl Into<PathBuf>) -> Self {
        Self {
            labels_dir: labels_dir.into(),
            locks: KeyedLocks::new(),
            keep_backup: true,
        }
    }

    /// Keep a `.bak` copy of the previous file on every save. Default: on.
    pub fn with_backup(mut self, keep_backup: bool) -> Self {
        self.keep_backup = keep_backup;
        self
    }

    pub fn labels_dir(&self) -> &Path {
        &self.labels_dir
    }

    /// Ids are percent-encoded, so distinct reviewers never share a file.
    pub fn store_path(&self, reviewer: &Reviewer, modality: &Modality) -> PathBuf {
        let safe_id = urlencoding::encode(reviewer.id());
        self.labels_dir.join(modality.as_str()).join(format!(
            "{}{}.json",
            PathsConfig::LABEL_FILE_PREFIX,
            safe_id
        ))
    }

    /// Load the store, or an empty one if the reviewer has no file yet.
    pub fn load(&self, reviewer: &Reviewer, modality: &Modality) -> Result<ReviewerStore> {
        let path = self.store_path(reviewer, modality);
        debug!("Loading labels from {}", path.display());
        read_store(&path, modality)
    }

    /// Overwrite the file with `store`.
    pub fn save(&self, reviewer: &Reviewer, modality: &Modality, store: &ReviewerStore) -> Result<()> {
        let path = self.store_path(reviewer, modality);
        self.locks
            .with_exclusive(&path, || write_store(&path, store, self.keep_backup))
    }

    /// Locked load-modify-save. The file is only rewritten when `f` changed it.
    pub fn modify<T>(
        &self,
        reviewer: &Reviewer,
        modality: &Modality,
        f: impl FnOnce(&mut ReviewerStore) -> Result<T>,
    ) -> Result<T> {
        let path = self.store_path(reviewer, modality);
        self.locks.with_exclusive(&path, || {
            let original = read_store(&path, modality)?;
            let mut store = original.clone();
            let value = f(&mut store)?;
            if store != original {
                write_store(&path, &store, self.keep_backup)?;
            }
            Ok(value)
        })
    }

    /// Insert or overwrite one record. Last writer wins.
    pub fn upsert(
        &self,
        reviewer: &Reviewer,
        modality: &Modality,
        key: ItemKey,
        record: LabelRecord,
    ) -> Result<()> {
        info!(
            "Saving label {} = {} for reviewer {}",
            key,
            record.category,
            reviewer.handle()
        );
        self.modify(reviewer, modality, |store| {
            store.upsert(key, record);
            Ok(())
        })
    }

    /// Remove one record. Returns false if the key was not present.
    pub fn delete(&self, reviewer: &Reviewer, modality: &Modality, key: &ItemKey) -> Result<bool> {
        let removed = self.modify(reviewer, modality, |store| Ok(store.remove(key.as_str()).is_some()))?;
        if removed {
            info!("Deleted label {} for reviewer {}", key, reviewer.handle());
        } else {
            debug!("No label {} to delete for reviewer {}", key, reviewer.handle());
        }
        Ok(removed)
    }

    /// Remove records whose key is not in `live_keys`. Returns the removed keys.
    pub fn prune_stale(
        &self,
        reviewer: &Reviewer,
        modality: &Modality,
        live_keys: &HashSet<ItemKey>,
    ) -> Result<Vec<ItemKey>> {
        let removed = self.modify(reviewer, modality, |store| {
            let stale: Vec<ItemKey> = store
                .keys()
                .filter(|key| !live_keys.contains(*key))
                .cloned()
                .collect();
            store.retain(|key, _| live_keys.contains(key));
            Ok(stale)
        })?;
        if !removed.is_empty() {
            info!(
                "Pruned {} stale labels for reviewer {}",
                removed.len(),
                reviewer.handle()
            );
        }
        Ok(removed)
    }
}

fn read_store(path: &Path, modality: &Modality) -> Result<ReviewerStore> {
    let raw: IndexMap<String, RawLabelRecord> = match atomic_read_json(path) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Ok(ReviewerStore::new()),
        Err(LabelError::Json { message, .. }) => {
            return Err(LabelError::StoreCorrupted {
                path: path.to_path_buf(),
                message,
            })
        }
        Err(e) => return Err(e),
    };

    let legacy_keys: HashSet<&str> = raw.keys().map(String::as_str).collect();
    let mut store = ReviewerStore::new();

    for (key, raw_record) in &raw {
        let key = ItemKey::from(key.as_str());
        let record = LabelRecord::from_raw(&key, raw_record.clone(), modality).map_err(|message| {
            LabelError::StoreCorrupted {
                path: path.to_path_buf(),
                message,
            }
        })?;

        let is_canonical = key.parts().is_some();
        let key = match record.canonical_key() {
            _ if is_canonical => key,
            Some(canonical) if !legacy_keys.contains(canonical.as_str()) => {
                debug!("Re-keyed legacy label {} as {}", key, canonical);
                canonical
            }
            _ => {
                warn!("Keeping non-canonical label key {} in {}", key, path.display());
                key
            }
        };
        store.upsert(key, record);
    }

    Ok(store)
}

fn write_store(path: &Path, store: &ReviewerStore, keep_backup: bool) -> Result<()> {
    let raw: IndexMap<String, RawLabelRecord> = store
        .iter()
        .map(|(key, record)| (key.to_string(), record.to_raw()))
        .collect();
    debug!("Writing {} labels to {}", raw.len(), path.display());
    atomic_write_json(path, &raw, keep_backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Bucket;
    use crate::config::LabelScheme;
    use crate::persistence::backup_path_for;
    use crate::store::record::Category;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn ct() -> Modality {
        Modality::new("ct").unwrap()
    }

    fn record(filename: &str, category: Category) -> LabelRecord {
        LabelRecord {
            category,
            scheme: LabelScheme::Confidence,
            timestamp: Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap(),
            modality: "ct".into(),
            bucket: Some(Bucket::Easy),
            filename: filename.into(),
            report_text: "report".into(),
            reasoning: "because".into(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_load_without_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = LabelStore::new(temp_dir.path());
        let loaded = store.load(&Reviewer::new("DOC1"), &ct()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = LabelStore::new(temp_dir.path());
        let reviewer = Reviewer::new("DOC1");

        let mut labels = ReviewerStore::new();
        labels.upsert("easy/b.png".into(), record("b.png", Category::High));
        labels.upsert("easy/a.png".into(), record("a.png", Category::Skipped));

        store.save(&reviewer, &ct(), &labels).unwrap();
        assert_eq!(store.load(&reviewer, &ct()).unwrap(), labels);
    }

    #[test]
    fn test_store_path_layout() {
        let store = LabelStore::new("/labels");
        let path = store.store_path(&Reviewer::new("DOC1"), &ct());
        assert_eq!(path, PathBuf::from("/labels/ct/doctor_DOC1.json"));

        let path = store.store_path(&Reviewer::new("../etc/x"), &ct());
        assert_eq!(path, PathBuf::from("/labels/ct/doctor_..%2Fetc%2Fx.json"));
    }

    #[test]
    fn test_persisted_shape() {
        let temp_dir = TempDir::new().unwrap();
        let store = LabelStore::new(temp_dir.path());
        let reviewer = Reviewer::new("DOC1");

        store
            .upsert(&reviewer, &ct(), "easy/a.png".into(), record("a.png", Category::Low))
            .unwrap();

        let raw: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(store.store_path(&reviewer, &ct())).unwrap(),
        )
        .unwrap();
        assert_eq!(
            raw,
            json!({
                "easy/a.png": {
                    "doctor_confidence": "low",
                    "timestamp": "2026-10-14T09:30:00+00:00",
                    "modality": "ct",
                    "difficulty": "easy",
                    "filename": "a.png",
                    "ehr_text": "report",
                    "reasoning": "because"
                }
            })
        );
    }

    #[test]
    fn test_delete_reports_absent_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = LabelStore::new(temp_dir.path());
        let reviewer = Reviewer::new("DOC1");
        let key = ItemKey::from("easy/a.png");

        assert!(!store.delete(&reviewer, &ct(), &key).unwrap());
        store
            .upsert(&reviewer, &ct(), key.clone(), record("a.png", Category::Low))
            .unwrap();
        assert!(store.delete(&reviewer, &ct(), &key).unwrap());
        assert!(store.load(&reviewer, &ct()).unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_file_is_reported_and_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store = LabelStore::new(temp_dir.path());
        let reviewer = Reviewer::new("DOC1");
        let path = store.store_path(&reviewer, &ct());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{\"easy/a.png\": {\"doctor_confidence\": ").unwrap();

        assert!(matches!(
            store.load(&reviewer, &ct()),
            Err(LabelError::StoreCorrupted { .. })
        ));
        let upsert = store.upsert(&reviewer, &ct(), "easy/b.png".into(), record("b.png", Category::Low));
        assert!(matches!(upsert, Err(LabelError::StoreCorrupted { .. })));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"easy/a.png\": {\"doctor_confidence\": "
        );
    }

    #[test]
    fn test_non_object_file_is_corrupted() {
        let temp_dir = TempDir::new().unwrap();
        let store = LabelStore::new(temp_dir.path());
        let reviewer = Reviewer::new("DOC1");
        let path = store.store_path(&reviewer, &ct());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[]").unwrap();

        assert!(matches!(
            store.load(&reviewer, &ct()),
            Err(LabelError::StoreCorrupted { .. })
        ));
    }

    #[test]
    fn test_legacy_file_is_normalized_and_rekeyed() {
        let temp_dir = TempDir::new().unwrap();
        let store = LabelStore::new(temp_dir.path());
        let reviewer = Reviewer::new("DOC1");
        let path = store.store_path(&reviewer, &ct());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            json!({
                "scan1.png": {
                    "doctor_difficulty": "hard",
                    "timestamp": "2025-03-01T12:00:00.123456",
                    "original_difficulty": "medium",
                    "seed": 42,
                    "ehr_text": "legacy"
                },
                "mystery.png": {
                    "doctor_difficulty": "easy",
                    "timestamp": "2025-03-01T12:01:00"
                }
            })
            .to_string(),
        )
        .unwrap();

        let loaded = store.load(&reviewer, &ct()).unwrap();
        let keys: Vec<&str> = loaded.keys().map(ItemKey::as_str).collect();
        assert_eq!(keys, vec!["medium/scan1.png", "mystery.png"]);

        // Any write persists the normalized shape with extra fields intact.
        store
            .upsert(&reviewer, &ct(), "easy/new.png".into(), record("new.png", Category::Low))
            .unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["medium/scan1.png"]["seed"], 42);
        assert_eq!(raw["medium/scan1.png"]["doctor_difficulty"], "hard");
        assert_eq!(raw["medium/scan1.png"]["difficulty"], "medium");
    }

    #[test]
    fn test_save_keeps_backup() {
        let temp_dir = TempDir::new().unwrap();
        let store = LabelStore::new(temp_dir.path());
        let reviewer = Reviewer::new("DOC1");

        store
            .upsert(&reviewer, &ct(), "easy/a.png".into(), record("a.png", Category::Low))
            .unwrap();
        store
            .upsert(&reviewer, &ct(), "easy/b.png".into(), record("b.png", Category::Low))
            .unwrap();

        let backup = backup_path_for(&store.store_path(&reviewer, &ct()));
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(backup).unwrap()).unwrap();
        assert_eq!(raw.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_prune_stale() {
        let temp_dir = TempDir::new().unwrap();
        let store = LabelStore::new(temp_dir.path());
        let reviewer = Reviewer::new("DOC1");
        for name in ["a.png", "b.png", "c.png"] {
            store
                .upsert(&reviewer, &ct(), ItemKey::new(Bucket::Easy, name), record(name, Category::Low))
                .unwrap();
        }

        let live: HashSet<ItemKey> = [ItemKey::new(Bucket::Easy, "b.png")].into_iter().collect();
        let removed = store.prune_stale(&reviewer, &ct(), &live).unwrap();
        assert_eq!(
            removed,
            vec![ItemKey::from("easy/a.png"), ItemKey::from("easy/c.png")]
        );
        assert_eq!(store.load(&reviewer, &ct()).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_upserts_lose_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(LabelStore::new(temp_dir.path()).with_backup(false));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let reviewer = Reviewer::new("DOC1");
                    let name = format!("{}.png", i);
                    store
                        .upsert(&reviewer, &ct(), ItemKey::new(Bucket::Easy, &name), record(&name, Category::Low))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.load(&Reviewer::new("DOC1"), &ct()).unwrap().len(), 8);
    }

    #[test]
    fn test_stores_are_scoped_by_reviewer_and_modality() {
        let temp_dir = TempDir::new().unwrap();
        let store = LabelStore::new(temp_dir.path());
        let doc1 = Reviewer::new("DOC1");
        let doc2 = Reviewer::new("DOC2");
        let retina = Modality::new("retina").unwrap();

        store
            .upsert(&doc1, &ct(), "easy/a.png".into(), record("a.png", Category::Low))
            .unwrap();

        assert!(store.load(&doc2, &ct()).unwrap().is_empty());
        assert!(store.load(&doc1, &retina).unwrap().is_empty());
    }

    #[test]
    fn test_similar_ids_get_separate_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = LabelStore::new(temp_dir.path());
        let ids = ["DR/1", "DR-1", "DR%2F1", "DR:1", "DR\\1"];

        let paths: HashSet<PathBuf> = ids
            .iter()
            .map(|id| store.store_path(&Reviewer::new(*id), &ct()))
            .collect();
        assert_eq!(paths.len(), ids.len());

        store
            .upsert(
                &Reviewer::new("DR/1"),
                &ct(),
                "easy/a.png".into(),
                record("a.png", Category::Low),
            )
            .unwrap();
        assert!(store.load(&Reviewer::new("DR-1"), &ct()).unwrap().is_empty());
        assert_eq!(store.load(&Reviewer::new("DR/1"), &ct()).unwrap().len(), 1);
    }
}
