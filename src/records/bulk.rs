//! Bulk create and bulk upsert validators
//!
//! Both reject unpublished datasets before looking at any item, and report
//! per-item failures with the zero-based position of the failing item.

use std::collections::HashMap;

use uuid::Uuid;

use super::errors::{RecordError, RecordResult};
use super::store::{RecordRef, RecordsLookup};
use super::types::{Dataset, RecordsBulkCreate, RecordsBulkUpsert, RecordUpsert};
use super::validator::{validate_create, validate_update};

/// Key used to match upsert items against existing records
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Id(Uuid),
    ExternalId(String),
}

/// Existing records indexed by both record id and external id
pub type ExistingRecords = HashMap<RecordKey, RecordRef>;

/// Validates a bulk creation, including external id uniqueness against the store.
pub struct RecordsBulkCreateValidator<'a> {
    records: &'a RecordsBulkCreate,
}

impl<'a> RecordsBulkCreateValidator<'a> {
    pub fn new(records: &'a RecordsBulkCreate) -> Self {
        Self { records }
    }

    /// Validates every item for the dataset, looking up submitted external ids.
    ///
    /// # Errors
    ///
    /// - dataset not published
    /// - any submitted external id already stored for the dataset
    /// - the first invalid item, prefixed with its position
    /// - lookup failures, unchanged
    pub async fn validate_for(&self, dataset: &Dataset, lookup: &dyn RecordsLookup) -> RecordResult<()> {
        check_create_ready(dataset)?;

        let external_ids = self.external_ids();
        let found = if external_ids.is_empty() {
            HashMap::new()
        } else {
            lookup.fetch_records_by_external_ids(dataset, &external_ids).await?
        };

        self.validate_items(dataset, &found)
    }

    /// Same rules as [`validate_for`](Self::validate_for), against records the
    /// caller already fetched (keyed by external id).
    pub fn validate_with_existing(
        &self,
        dataset: &Dataset,
        found: &HashMap<String, RecordRef>,
    ) -> RecordResult<()> {
        check_create_ready(dataset)?;
        self.validate_items(dataset, found)
    }

    /// Submitted external ids, in submission order
    pub fn external_ids(&self) -> Vec<String> {
        self.records
            .items
            .iter()
            .filter_map(|r| r.external_id.clone())
            .collect()
    }

    fn validate_items(&self, dataset: &Dataset, found: &HashMap<String, RecordRef>) -> RecordResult<()> {
        let duplicated: Vec<String> = self
            .external_ids()
            .into_iter()
            .filter(|id| found.contains_key(id))
            .collect();
        if !duplicated.is_empty() {
            return Err(RecordError::unprocessable(format!(
                "found records with same external ids: {}",
                duplicated.join(", ")
            )));
        }

        for (idx, record) in self.records.items.iter().enumerate() {
            validate_create(record, dataset).map_err(|err| rejected(idx, err))?;
        }

        tracing::debug!(
            event = "RECORDS_BULK_VALIDATED",
            dataset_id = %dataset.id,
            items = self.records.items.len(),
            "bulk create validated"
        );
        Ok(())
    }
}

fn check_create_ready(dataset: &Dataset) -> RecordResult<()> {
    if dataset.is_ready() {
        Ok(())
    } else {
        Err(RecordError::unprocessable(
            "records cannot be created for a non published dataset",
        ))
    }
}

/// Validates a bulk upsert, routing each item to create or update rules.
pub struct RecordsBulkUpsertValidator<'a> {
    records: &'a RecordsBulkUpsert,
    existing: &'a ExistingRecords,
}

impl<'a> RecordsBulkUpsertValidator<'a> {
    pub fn new(records: &'a RecordsBulkUpsert, existing: &'a ExistingRecords) -> Self {
        Self { records, existing }
    }

    /// Validates every item for the dataset.
    ///
    /// Items matching an existing record (by id, then by external id) follow
    /// update rules; all others follow create rules.
    pub fn validate_for(&self, dataset: &Dataset) -> RecordResult<()> {
        if !dataset.is_ready() {
            return Err(RecordError::unprocessable(
                "records cannot be created or updated for a non published dataset",
            ));
        }

        for (idx, record) in self.records.items.iter().enumerate() {
            let result = match self.existing_record(record) {
                Some(_) => validate_update(&record.as_update(), dataset),
                None => validate_create(&record.as_create(), dataset),
            };
            result.map_err(|err| rejected(idx, err))?;
        }

        tracing::debug!(
            event = "RECORDS_BULK_VALIDATED",
            dataset_id = %dataset.id,
            items = self.records.items.len(),
            "bulk upsert validated"
        );
        Ok(())
    }

    /// Returns the existing record an upsert item resolves to, if any.
    pub fn existing_record(&self, record: &RecordUpsert) -> Option<&'a RecordRef> {
        resolve_existing(self.existing, record)
    }
}

/// Resolves an upsert item against existing records: by id first, then by external id.
pub fn resolve_existing<'e>(existing: &'e ExistingRecords, record: &RecordUpsert) -> Option<&'e RecordRef> {
    record
        .id
        .and_then(|id| existing.get(&RecordKey::Id(id)))
        .or_else(|| {
            record
                .external_id
                .as_ref()
                .and_then(|ext| existing.get(&RecordKey::ExternalId(ext.clone())))
        })
}

fn rejected(idx: usize, err: RecordError) -> RecordError {
    tracing::debug!(event = "RECORD_REJECTED", position = idx, reason = %err);
    err.at_position(idx)
}
