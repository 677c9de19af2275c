//! In-memory dataset store.
//!
//! Maps identifiers to fully built [`Table`]s. Tables are shared as `Arc<Table>`: a query holds
//! its own handle for the whole evaluation, so a concurrent remove never tears a table out from
//! under it. Insertion checks and inserts under one write lock, which makes two adds of the same
//! identifier resolve to exactly one winner.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{InsightError, InsightResult};
use crate::types::{DatasetSummary, Table};

/// Check that `id` can name a dataset: not blank and free of `_`, which separates the
/// identifier from the field name in query keys.
pub fn validate_id(id: &str) -> InsightResult<()> {
    let reason = if id.trim().is_empty() {
        "id must not be blank"
    } else if id.contains('_') {
        "id must not contain an underscore"
    } else {
        return Ok(());
    };
    Err(InsightError::InvalidId {
        id: id.to_string(),
        reason: reason.to_string(),
    })
}

/// Owned, injectable registry of loaded datasets.
#[derive(Debug, Default)]
pub struct DatasetStore {
    tables: RwLock<BTreeMap<String, Arc<Table>>>,
}

impl DatasetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `table` under its own identifier.
    ///
    /// Fails with [`InsightError::DuplicateId`] if the identifier is already loaded, whatever the
    /// kind of the existing dataset.
    pub fn insert(&self, table: Table) -> InsightResult<Arc<Table>> {
        let mut tables = self.write();
        if tables.contains_key(table.id()) {
            return Err(InsightError::DuplicateId {
                id: table.id().to_string(),
            });
        }
        let table = Arc::new(table);
        tables.insert(table.id().to_string(), Arc::clone(&table));
        Ok(table)
    }

    /// Remove and return the table loaded under `id`.
    pub fn remove(&self, id: &str) -> InsightResult<Arc<Table>> {
        self.write()
            .remove(id)
            .ok_or_else(|| InsightError::NotFound { id: id.to_string() })
    }

    /// Handle to the table loaded under `id`.
    pub fn get(&self, id: &str) -> InsightResult<Arc<Table>> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| InsightError::NotFound { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Loaded identifiers, sorted.
    pub fn list_ids(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Summaries of every loaded dataset, sorted by identifier.
    pub fn summaries(&self) -> Vec<DatasetSummary> {
        self.read().values().map(|t| t.summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Every critical section leaves the map consistent, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<Table>>> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<Table>>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{DatasetStore, validate_id};
    use crate::error::InsightError;
    use crate::schema::schema_for;
    use crate::types::{DatasetKind, Table};

    fn table(id: &str, kind: DatasetKind) -> Table {
        Table::new(id, kind, vec![schema_for(kind).blank_row()]).unwrap()
    }

    #[test]
    fn ids_must_be_non_blank_and_underscore_free() {
        assert!(validate_id("courses").is_ok());
        assert!(validate_id("my courses").is_ok());
        for bad in ["", "   ", "\t", "my_courses", "_"] {
            assert!(
                matches!(validate_id(bad), Err(InsightError::InvalidId { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn insert_get_remove_lifecycle() {
        let store = DatasetStore::new();
        assert!(store.is_empty());

        store.insert(table("courses", DatasetKind::Courses)).unwrap();
        assert!(store.contains("courses"));
        assert_eq!(store.get("courses").unwrap().kind(), DatasetKind::Courses);

        let removed = store.remove("courses").unwrap();
        assert_eq!(removed.id(), "courses");
        assert_eq!(
            store.remove("courses").unwrap_err(),
            InsightError::NotFound {
                id: "courses".to_string()
            }
        );
        assert!(matches!(
            store.get("courses"),
            Err(InsightError::NotFound { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected_regardless_of_kind() {
        let store = DatasetStore::new();
        store.insert(table("data", DatasetKind::Courses)).unwrap();
        let err = store.insert(table("data", DatasetKind::Rooms)).unwrap_err();
        assert_eq!(
            err,
            InsightError::DuplicateId {
                id: "data".to_string()
            }
        );
        assert_eq!(store.get("data").unwrap().kind(), DatasetKind::Courses);
    }

    #[test]
    fn ids_and_summaries_are_sorted() {
        let store = DatasetStore::new();
        store.insert(table("rooms", DatasetKind::Rooms)).unwrap();
        store.insert(table("alpha", DatasetKind::Courses)).unwrap();
        store.insert(table("courses", DatasetKind::Courses)).unwrap();

        assert_eq!(store.list_ids(), vec!["alpha", "courses", "rooms"]);
        let kinds: Vec<_> = store.summaries().into_iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![DatasetKind::Courses, DatasetKind::Courses, DatasetKind::Rooms]
        );
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn handle_outlives_removal() {
        let store = DatasetStore::new();
        store.insert(table("courses", DatasetKind::Courses)).unwrap();
        let handle = store.get("courses").unwrap();
        store.remove("courses").unwrap();
        assert_eq!(handle.row_count(), 1);
        assert_eq!(Arc::strong_count(&handle), 1);
    }

    #[test]
    fn concurrent_inserts_of_one_id_have_one_winner() {
        let store = DatasetStore::new();
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| store.insert(table("courses", DatasetKind::Courses))))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, InsightError::DuplicateId { .. }))
        );
        assert_eq!(store.len(), 1);
    }
}
