//! Record store seams and an in-memory store
//!
//! The validator only reads from the store (external id lookup). Writes go
//! through `RecordsBulkWriter`, which validates each batch and persists it under
//! one write lock.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::bulk::{resolve_existing, ExistingRecords, RecordKey, RecordsBulkCreateValidator, RecordsBulkUpsertValidator};
use super::errors::{RecordError, RecordResult};
use super::types::{Dataset, RecordsBulkCreate, RecordsBulkUpsert, Suggestion};

/// A persisted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: Uuid,
    pub dataset_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    pub inserted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read access used by bulk create validation
#[async_trait]
pub trait RecordsLookup: Send + Sync {
    /// Returns the stored records of `dataset` whose external id is in `external_ids`,
    /// keyed by external id.
    async fn fetch_records_by_external_ids(
        &self,
        dataset: &Dataset,
        external_ids: &[String],
    ) -> RecordResult<HashMap<String, RecordRef>>;
}

/// Validated bulk writes
#[async_trait]
pub trait RecordsBulkWriter: Send + Sync {
    async fn create_records_bulk(
        &self,
        dataset: &Dataset,
        records: RecordsBulkCreate,
    ) -> RecordResult<Vec<RecordRef>>;

    async fn upsert_records_bulk(
        &self,
        dataset: &Dataset,
        records: RecordsBulkUpsert,
    ) -> RecordResult<Vec<RecordRef>>;
}

/// In-memory record store, one record list per dataset
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<Uuid, Vec<RecordRef>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored for the dataset
    pub fn count(&self, dataset: &Dataset) -> RecordResult<usize> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(&dataset.id).map_or(0, Vec::len))
    }

    /// Snapshot of the records stored for the dataset, in insertion order
    pub fn records(&self, dataset: &Dataset) -> RecordResult<Vec<RecordRef>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(&dataset.id).cloned().unwrap_or_default())
    }

    /// Existing records referenced by the upsert items, keyed by id and by external id
    pub fn existing_records(
        &self,
        dataset: &Dataset,
        upsert: &RecordsBulkUpsert,
    ) -> RecordResult<ExistingRecords> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let stored = records.get(&dataset.id).map(Vec::as_slice).unwrap_or_default();
        Ok(index_existing(stored, upsert))
    }

    /// Validates and applies a bulk upsert.
    ///
    /// Matched records get their metadata and suggestions replaced when the item
    /// carries them; fields of existing records are left untouched.
    pub fn upsert_records(
        &self,
        dataset: &Dataset,
        upsert: RecordsBulkUpsert,
    ) -> RecordResult<Vec<RecordRef>> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let stored = records.entry(dataset.id).or_default();

        let existing = index_existing(stored, &upsert);
        RecordsBulkUpsertValidator::new(&upsert, &existing).validate_for(dataset)?;

        let now = Utc::now();
        let mut result = Vec::with_capacity(upsert.items.len());
        for item in upsert.items {
            match resolve_existing(&existing, &item) {
                Some(found) => {
                    let record = stored
                        .iter_mut()
                        .find(|r| r.id == found.id)
                        .ok_or_else(|| RecordError::Store(format!("record {} vanished", found.id)))?;
                    if item.metadata.is_some() {
                        record.metadata = item.metadata;
                    }
                    if let Some(suggestions) = item.suggestions {
                        record.suggestions = suggestions;
                    }
                    record.updated_at = now;
                    result.push(record.clone());
                }
                None => {
                    let record = RecordRef {
                        id: item.id.unwrap_or_else(Uuid::new_v4),
                        dataset_id: dataset.id,
                        external_id: item.external_id,
                        fields: item.fields.unwrap_or_default(),
                        metadata: item.metadata,
                        suggestions: item.suggestions.unwrap_or_default(),
                        inserted_at: now,
                        updated_at: now,
                    };
                    stored.push(record.clone());
                    result.push(record);
                }
            }
        }

        Ok(result)
    }
}

#[async_trait]
impl RecordsLookup for MemoryRecordStore {
    async fn fetch_records_by_external_ids(
        &self,
        dataset: &Dataset,
        external_ids: &[String],
    ) -> RecordResult<HashMap<String, RecordRef>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let stored = records.get(&dataset.id).map(Vec::as_slice).unwrap_or_default();
        Ok(find_by_external_ids(stored, external_ids))
    }
}

#[async_trait]
impl RecordsBulkWriter for MemoryRecordStore {
    async fn create_records_bulk(
        &self,
        dataset: &Dataset,
        create: RecordsBulkCreate,
    ) -> RecordResult<Vec<RecordRef>> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let stored = records.entry(dataset.id).or_default();

        let validator = RecordsBulkCreateValidator::new(&create);
        let found = find_by_external_ids(stored, &validator.external_ids());
        validator.validate_with_existing(dataset, &found)?;

        let now = Utc::now();
        let created: Vec<RecordRef> = create
            .items
            .into_iter()
            .map(|item| RecordRef {
                id: Uuid::new_v4(),
                dataset_id: dataset.id,
                external_id: item.external_id,
                fields: item.fields,
                metadata: item.metadata,
                suggestions: item.suggestions.unwrap_or_default(),
                inserted_at: now,
                updated_at: now,
            })
            .collect();

        stored.extend(created.iter().cloned());
        Ok(created)
    }

    async fn upsert_records_bulk(
        &self,
        dataset: &Dataset,
        upsert: RecordsBulkUpsert,
    ) -> RecordResult<Vec<RecordRef>> {
        self.upsert_records(dataset, upsert)
    }
}

fn find_by_external_ids(stored: &[RecordRef], external_ids: &[String]) -> HashMap<String, RecordRef> {
    stored
        .iter()
        .filter_map(|r| {
            let ext = r.external_id.as_ref()?;
            external_ids.contains(ext).then(|| (ext.clone(), r.clone()))
        })
        .collect()
}

fn index_existing(stored: &[RecordRef], upsert: &RecordsBulkUpsert) -> ExistingRecords {
    let mut existing = ExistingRecords::new();
    for item in &upsert.items {
        if let Some(id) = item.id {
            if let Some(record) = stored.iter().find(|r| r.id == id) {
                existing.insert(RecordKey::Id(id), record.clone());
            }
        }
        if let Some(ext) = &item.external_id {
            if let Some(record) = stored.iter().find(|r| r.external_id.as_ref() == Some(ext)) {
                existing.insert(RecordKey::ExternalId(ext.clone()), record.clone());
            }
        }
    }
    existing
}

fn poisoned() -> RecordError {
    RecordError::Store("record store lock poisoned".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::types::Field;
    use serde_json::json;
    use std::sync::Arc;

    fn dataset() -> Dataset {
        Dataset::new("reviews").with_field(Field::text("text", true))
    }

    fn upsert(items: Value) -> RecordsBulkUpsert {
        serde_json::from_value(json!({ "items": items })).unwrap()
    }

    #[tokio::test]
    async fn test_create_records_bulk() {
        let ds = dataset();
        let store = MemoryRecordStore::new();
        let create: RecordsBulkCreate = serde_json::from_value(json!({
            "items": [{"fields": {"text": "a"}, "external_id": "1"}]
        }))
        .unwrap();

        let created = store.create_records_bulk(&ds, create.clone()).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(store.count(&ds).unwrap(), 1);

        // Same external id again is rejected.
        let err = store.create_records_bulk(&ds, create).await.unwrap_err();
        assert_eq!(err.to_string(), "found records with same external ids: 1");
        assert_eq!(store.count(&ds).unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_keep_external_ids_unique() {
        let ds = Arc::new(dataset());
        let store = Arc::new(MemoryRecordStore::new());
        let create: RecordsBulkCreate = serde_json::from_value(json!({
            "items": [{"fields": {"text": "a"}, "external_id": "same"}]
        }))
        .unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let (ds, store, create) = (ds.clone(), store.clone(), create.clone());
                tokio::spawn(async move { store.create_records_bulk(&ds, create).await })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(err) => assert_eq!(err.to_string(), "found records with same external ids: same"),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(store.count(&ds).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lookup_by_external_ids() {
        let ds = dataset();
        let store = MemoryRecordStore::new();
        store
            .upsert_records(&ds, upsert(json!([
                {"fields": {"text": "a"}, "external_id": "1"},
                {"fields": {"text": "b"}, "external_id": "2"},
                {"fields": {"text": "c"}}
            ])))
            .unwrap();

        let found = store
            .fetch_records_by_external_ids(&ds, &["2".to_string(), "9".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["2"].fields["text"], "b");
    }

    #[test]
    fn test_upsert_is_idempotent_by_external_id() {
        let ds = dataset();
        let store = MemoryRecordStore::new();
        let items = json!([
            {"fields": {"text": "a"}, "external_id": "1"},
            {"fields": {"text": "b"}, "external_id": "2"}
        ]);

        store.upsert_records(&ds, upsert(items.clone())).unwrap();
        store.upsert_records(&ds, upsert(items)).unwrap();
        assert_eq!(store.count(&ds).unwrap(), 2);
    }

    #[test]
    fn test_upsert_updates_metadata_only() {
        let ds = dataset().with_extra_metadata(true);
        let store = MemoryRecordStore::new();
        let created = store
            .upsert_records(&ds, upsert(json!([{"fields": {"text": "a"}, "external_id": "1"}])))
            .unwrap();

        let updated = store
            .upsert_records(&ds, upsert(json!([{"id": created[0].id, "metadata": {"k": "v"}}])))
            .unwrap();
        assert_eq!(updated[0].id, created[0].id);
        assert_eq!(updated[0].fields["text"], "a");
        assert_eq!(updated[0].metadata.as_ref().unwrap()["k"], "v");
        assert_eq!(store.count(&ds).unwrap(), 1);
    }

    #[test]
    fn test_invalid_upsert_writes_nothing() {
        let ds = dataset();
        let store = MemoryRecordStore::new();
        let err = store
            .upsert_records(&ds, upsert(json!([
                {"fields": {"text": "a"}},
                {"fields": {"nope": "b"}}
            ])))
            .unwrap_err();
        assert!(err.to_string().starts_with("record at position 1 is not valid because"));
        assert_eq!(store.count(&ds).unwrap(), 0);
    }

    #[test]
    fn test_records_are_scoped_per_dataset() {
        let first = dataset();
        let second = dataset();
        let store = MemoryRecordStore::new();
        store
            .upsert_records(&first, upsert(json!([{"fields": {"text": "a"}}])))
            .unwrap();
        assert_eq!(store.count(&first).unwrap(), 1);
        assert_eq!(store.count(&second).unwrap(), 0);
        assert!(store.records(&second).unwrap().is_empty());
    }
}
