//! Result store.
//!
//! An ordered list of analysis records, newest first, kept as one JSON
//! array under a single storage key. Mutations only touch memory;
//! callers flush with [`ResultStore::persist`] after each one.

pub mod storage;

pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

use crate::error::StoreError;
use crate::models::{sample_records, AnalysisRecord};
use tracing::{debug, info, warn};

/// Storage key used when none is configured.
pub const DEFAULT_STORE_KEY: &str = "chickenAnalysisResults";

pub struct ResultStore<S: KeyValueStorage> {
    storage: S,
    key: String,
    records: Vec<AnalysisRecord>,
}

impl<S: KeyValueStorage> ResultStore<S> {
    /// Load the records stored under `key`.
    ///
    /// Missing, unreadable or corrupt data is replaced by the sample
    /// records; nothing is reported to the caller.
    pub fn load(storage: S, key: impl Into<String>) -> Self {
        let key = key.into();

        let records = match storage.get(&key) {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<AnalysisRecord>>(&blob) {
                Ok(records) => {
                    info!("Loaded {} stored analyses", records.len());
                    records
                }
                Err(e) => {
                    warn!("Stored analyses under '{}' are corrupt ({}), using sample data", key, e);
                    sample_records()
                }
            },
            Ok(None) => {
                debug!("No stored analyses under '{}', using sample data", key);
                sample_records()
            }
            Err(e) => {
                warn!("Failed to read stored analyses ({}), using sample data", e);
                sample_records()
            }
        };

        Self {
            storage,
            key,
            records,
        }
    }

    /// Prepend a record. Does not persist.
    pub fn insert_front(&mut self, record: AnalysisRecord) -> Result<(), StoreError> {
        if self.find_by_id(&record.id).is_some() {
            return Err(StoreError::DuplicateId(record.id));
        }
        debug!("Inserting analysis {}", record.id);
        self.records.insert(0, record);
        Ok(())
    }

    /// Remove the record with `id`, returning it. Does not persist.
    pub fn remove_by_id(&mut self, id: &str) -> Option<AnalysisRecord> {
        let index = self.position(id)?;
        debug!("Removing analysis {}", id);
        Some(self.records.remove(index))
    }

    /// Put a record back at `index` after a failed flush.
    pub(crate) fn restore(&mut self, index: usize, record: AnalysisRecord) {
        let index = index.min(self.records.len());
        self.records.insert(index, record);
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Overwrite the stored blob with the current records.
    pub fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.records)?;
        self.storage.set(&self.key, &json)?;
        debug!("Persisted {} analyses under '{}'", self.records.len(), self.key);
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> Option<&AnalysisRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> &[AnalysisRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Diagnosis;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(id: &str) -> AnalysisRecord {
        AnalysisRecord::new(
            id.to_string(),
            Utc::now(),
            Diagnosis::Coccidiosis,
            87.6,
            "data:image/png;base64,AAAA".to_string(),
        )
    }

    fn ids<S: KeyValueStorage>(store: &ResultStore<S>) -> Vec<&str> {
        store.records().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_load_empty_storage_uses_samples() {
        let store = ResultStore::load(MemoryStorage::new(), DEFAULT_STORE_KEY);
        assert_eq!(store.len(), 5);
        assert_eq!(store.records()[0].id, "sample_1");
    }

    #[test]
    fn test_load_corrupt_blob_uses_samples() {
        let storage = MemoryStorage::new();
        storage.set(DEFAULT_STORE_KEY, "{not valid json").unwrap();

        let store = ResultStore::load(storage, DEFAULT_STORE_KEY);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_load_keeps_empty_list() {
        let storage = MemoryStorage::new();
        storage.set(DEFAULT_STORE_KEY, "[]").unwrap();

        let store = ResultStore::load(storage, DEFAULT_STORE_KEY);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_tolerates_unknown_diagnosis() {
        let storage = MemoryStorage::new();
        storage
            .set(
                DEFAULT_STORE_KEY,
                r#"[{"id":"old","date":"2025-06-29T14:30:00.000Z","diagnosis":"Fowl Pox",
                    "confidence":50,"image":"images/a.jpg","recommendations":[]}]"#,
            )
            .unwrap();

        let store = ResultStore::load(storage, DEFAULT_STORE_KEY);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.records()[0].diagnosis,
            Diagnosis::Other("Fowl Pox".to_string())
        );
    }

    #[test]
    fn test_insert_front_and_find() {
        let mut store = ResultStore::load(MemoryStorage::new(), DEFAULT_STORE_KEY);
        let r = record("x");
        store.insert_front(r.clone()).unwrap();

        assert_eq!(store.records()[0], r);
        assert_eq!(store.find_by_id("x"), Some(&r));
    }

    #[test]
    fn test_insert_duplicate_id_rejected() {
        let mut store = ResultStore::load(MemoryStorage::new(), DEFAULT_STORE_KEY);
        let err = store.insert_front(record("sample_3")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == "sample_3"));
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut store = ResultStore::load(MemoryStorage::new(), DEFAULT_STORE_KEY);
        let removed = store.remove_by_id("sample_3").unwrap();
        assert_eq!(removed.id, "sample_3");
        assert_eq!(
            ids(&store),
            vec!["sample_1", "sample_2", "sample_4", "sample_5"]
        );

        assert!(store.remove_by_id("sample_3").is_none());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_insert_then_delete_scenario() {
        let mut store = ResultStore::load(MemoryStorage::new(), DEFAULT_STORE_KEY);
        assert_eq!(store.len(), 5);

        store.insert_front(record("x")).unwrap();
        assert_eq!(store.len(), 6);
        assert!(store.find_by_id("x").is_some());

        store.remove_by_id("x");
        assert_eq!(store.len(), 5);
        assert!(store.find_by_id("x").is_none());
    }

    #[test]
    fn test_persist_does_not_happen_implicitly() {
        let storage = MemoryStorage::new();
        let mut store = ResultStore::load(&storage, DEFAULT_STORE_KEY);
        store.insert_front(record("x")).unwrap();
        assert_eq!(storage.get(DEFAULT_STORE_KEY).unwrap(), None);

        store.persist().unwrap();
        assert!(storage.get(DEFAULT_STORE_KEY).unwrap().is_some());
    }

    #[test]
    fn test_persist_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coopcheck_store.json");

        let mut store = ResultStore::load(FileStorage::new(&path), DEFAULT_STORE_KEY);
        store.insert_front(record("x")).unwrap();
        store.remove_by_id("sample_2");
        store.persist().unwrap();

        let reloaded = ResultStore::load(FileStorage::new(&path), DEFAULT_STORE_KEY);
        assert_eq!(reloaded.records(), store.records());
    }

    #[test]
    fn test_binary_store_file_recovers_on_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coopcheck_store.json");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x7b]).unwrap();

        let mut store = ResultStore::load(FileStorage::new(&path), DEFAULT_STORE_KEY);
        assert_eq!(store.len(), 5);
        store.insert_front(record("x")).unwrap();
        store.persist().unwrap();

        let reloaded = ResultStore::load(FileStorage::new(&path), DEFAULT_STORE_KEY);
        assert_eq!(reloaded.len(), 6);
        assert_eq!(reloaded.records()[0].id, "x");
    }

    #[test]
    fn test_separate_keys_are_independent() {
        let storage = MemoryStorage::new();
        let mut first = ResultStore::load(&storage, "first");
        first.remove_by_id("sample_1");
        first.persist().unwrap();

        let second = ResultStore::load(&storage, "second");
        assert_eq!(second.len(), 5);
        assert_eq!(ResultStore::load(&storage, "first").len(), 4);
    }
}
