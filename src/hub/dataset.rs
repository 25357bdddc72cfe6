//! Hub dataset import
//!
//! Rows are pulled in sequential batches, converted to upsert items and handed
//! to the bulk writer. A batch is fully written before the next one is read.

use serde_json::{Map, Value};

use crate::records::{python_str, Dataset, RecordUpsert, RecordsBulkUpsert, RecordsBulkWriter};

use super::errors::{HubError, HubResult};
use super::source::{HubSource, Row};

/// Rows per imported batch
pub const BATCH_SIZE: usize = 100;

/// Column whose value becomes the record external id
const EXTERNAL_ID_COLUMN: &str = "id";

/// Outcome of an import run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub rows: usize,
    pub batches: usize,
}

/// A hub split ready to be imported into a dataset
pub struct HubDataset<S: HubSource> {
    source: S,
    limit: Option<usize>,
    batch_size: usize,
}

impl<S: HubSource> HubDataset<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            limit: None,
            batch_size: BATCH_SIZE,
        }
    }

    /// Overrides the batch size. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Total rows in the source split, regardless of `take`
    pub fn num_rows(&self) -> usize {
        self.source.num_rows()
    }

    /// Limits the import to the first `n` rows.
    pub fn take(mut self, n: usize) -> Self {
        self.limit = Some(self.limit.map_or(n, |limit| limit.min(n)));
        self
    }

    /// Imports the rows into `dataset` through `writer`.
    ///
    /// # Errors
    ///
    /// - `HubError::DatasetNotReady` if the dataset is not published
    /// - `HubError::MissingColumn` if a dataset field or metadata property has no column
    /// - any writer failure, including per-record validation failures
    ///
    /// Batches written before a failure stay written.
    pub async fn import_to(
        &self,
        writer: &dyn RecordsBulkWriter,
        dataset: &Dataset,
    ) -> HubResult<ImportSummary> {
        if !dataset.is_ready() {
            return Err(HubError::DatasetNotReady);
        }

        let total = self
            .limit
            .map_or(self.num_rows(), |limit| limit.min(self.num_rows()));
        tracing::info!(
            event = "HUB_IMPORT_START",
            dataset_id = %dataset.id,
            rows = total,
            batch_size = self.batch_size,
            "importing hub rows"
        );

        let mut summary = ImportSummary::default();
        while summary.rows < total {
            let limit = self.batch_size.min(total - summary.rows);
            let rows = self.source.read_batch(summary.rows, limit)?;
            if rows.is_empty() {
                break;
            }

            let items = rows
                .iter()
                .map(|row| row_to_record(row, dataset))
                .collect::<HubResult<Vec<_>>>()?;
            writer
                .upsert_records_bulk(dataset, RecordsBulkUpsert { items })
                .await?;

            summary.rows += rows.len();
            summary.batches += 1;
            tracing::debug!(
                event = "HUB_BATCH_IMPORTED",
                batch = summary.batches,
                rows = rows.len()
            );
        }

        tracing::info!(
            event = "HUB_IMPORT_COMPLETE",
            dataset_id = %dataset.id,
            rows = summary.rows,
            batches = summary.batches,
            "hub import complete"
        );
        Ok(summary)
    }
}

/// Converts one hub row into an upsert item for the dataset.
///
/// Responses, suggestions and vectors are never taken from hub rows.
pub fn row_to_record(row: &Row, dataset: &Dataset) -> HubResult<RecordUpsert> {
    Ok(RecordUpsert {
        id: None,
        fields: Some(row_fields(row, dataset)?),
        metadata: Some(row_metadata(row, dataset)?),
        external_id: row_external_id(row),
        responses: None,
        suggestions: None,
        vectors: None,
    })
}

fn row_external_id(row: &Row) -> Option<String> {
    match row.get(EXTERNAL_ID_COLUMN)? {
        Value::Null => None,
        other => Some(python_str(other)),
    }
}

fn row_fields(row: &Row, dataset: &Dataset) -> HubResult<Map<String, Value>> {
    let mut fields = Map::new();
    for field in &dataset.fields {
        let value = column(row, &field.name)?;
        let value = if field.is_text() {
            Value::String(python_str(value))
        } else {
            value.clone()
        };
        fields.insert(field.name.clone(), value);
    }
    Ok(fields)
}

fn row_metadata(row: &Row, dataset: &Dataset) -> HubResult<Map<String, Value>> {
    let mut metadata = Map::new();
    for property in &dataset.metadata_properties {
        metadata.insert(property.name.clone(), column(row, &property.name)?.clone());
    }
    Ok(metadata)
}

fn column<'r>(row: &'r Row, name: &str) -> HubResult<&'r Value> {
    row.get(name)
        .ok_or_else(|| HubError::MissingColumn(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::source::JsonlHubSource;
    use crate::records::{DatasetStatus, Field, MemoryRecordStore, MetadataProperty};
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row fixtures must be objects"),
        }
    }

    fn dataset() -> Dataset {
        Dataset::new("apps")
            .with_field(Field::text("package_name", true))
            .with_field(Field::text("star", false))
            .with_metadata_property(MetadataProperty::integer("version_id", None, None))
    }

    fn source(n: usize) -> JsonlHubSource {
        JsonlHubSource::from_rows(
            (0..n)
                .map(|i| {
                    row(json!({
                        "id": format!("row-{}", i),
                        "package_name": format!("com.example.app{}", i),
                        "star": 4,
                        "version_id": i,
                        "unused": "ignored"
                    }))
                })
                .collect(),
        )
    }

    #[test]
    fn test_row_conversion() {
        let record = row_to_record(
            &row(json!({"id": "abc", "package_name": "com.x", "star": 4, "version_id": 7})),
            &dataset(),
        )
        .unwrap();

        assert_eq!(record.external_id.as_deref(), Some("abc"));
        assert!(record.id.is_none());
        let fields = record.fields.unwrap();
        assert_eq!(fields["package_name"], "com.x");
        assert_eq!(fields["star"], "4");
        assert!(!fields.contains_key("id"));
        assert_eq!(record.metadata.unwrap()["version_id"], 7);
        assert!(record.suggestions.is_none());
    }

    #[test]
    fn test_row_without_id_column() {
        let record = row_to_record(
            &row(json!({"package_name": "com.x", "star": "5", "version_id": 1})),
            &dataset(),
        )
        .unwrap();
        assert!(record.external_id.is_none());
    }

    #[test]
    fn test_numeric_id_is_rendered() {
        let record = row_to_record(
            &row(json!({"id": 42, "package_name": "com.x", "star": "5", "version_id": 1})),
            &dataset(),
        )
        .unwrap();
        assert_eq!(record.external_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_text_cells_render_like_python() {
        let ds = Dataset::new("cells")
            .with_field(Field::text("t", true))
            .with_field(Field::text("b", true))
            .with_field(Field::text("l", false));
        let record = row_to_record(&row(json!({"t": null, "b": true, "l": ["a", 1]})), &ds).unwrap();
        let fields = record.fields.unwrap();
        assert_eq!(fields["t"], "None");
        assert_eq!(fields["b"], "True");
        assert_eq!(fields["l"], "['a', 1]");
    }

    #[tokio::test]
    async fn test_null_text_cell_is_imported() {
        let ds = dataset();
        let store = MemoryRecordStore::new();
        let rows = vec![row(json!({"id": "n", "package_name": null, "star": null, "version_id": 1}))];

        HubDataset::new(JsonlHubSource::from_rows(rows))
            .import_to(&store, &ds)
            .await
            .unwrap();
        let records = store.records(&ds).unwrap();
        assert_eq!(records[0].fields["package_name"], "None");
    }

    #[test]
    fn test_non_text_fields_keep_their_shape() {
        let ds = Dataset::new("chats").with_field(Field::chat("conversation", true));
        let record = row_to_record(
            &row(json!({"conversation": [{"role": "user", "content": "hi"}]})),
            &ds,
        )
        .unwrap();
        assert!(record.fields.unwrap()["conversation"].is_array());
    }

    #[test]
    fn test_missing_column() {
        let err = row_to_record(&row(json!({"package_name": "com.x"})), &dataset()).unwrap_err();
        assert!(matches!(err, HubError::MissingColumn(ref c) if c == "star"));
    }

    #[test]
    fn test_take_keeps_smallest_limit() {
        let hub = HubDataset::new(source(10)).take(5).take(8);
        assert_eq!(hub.limit, Some(5));
        assert_eq!(hub.num_rows(), 10);
    }

    #[tokio::test]
    async fn test_import_in_batches() {
        let ds = dataset();
        let store = MemoryRecordStore::new();
        let hub = HubDataset::new(source(250));

        let summary = hub.import_to(&store, &ds).await.unwrap();
        assert_eq!(summary, ImportSummary { rows: 250, batches: 3 });
        assert_eq!(store.count(&ds).unwrap(), 250);
    }

    #[tokio::test]
    async fn test_import_take() {
        let ds = dataset();
        let store = MemoryRecordStore::new();
        let summary = HubDataset::new(source(5))
            .take(1)
            .import_to(&store, &ds)
            .await
            .unwrap();
        assert_eq!(summary.rows, 1);

        let records = store.records(&ds).unwrap();
        assert_eq!(records[0].external_id.as_deref(), Some("row-0"));
        assert_eq!(records[0].fields["star"], "4");
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let ds = dataset();
        let store = MemoryRecordStore::new();
        let hub = HubDataset::new(source(5)).with_batch_size(2);

        hub.import_to(&store, &ds).await.unwrap();
        hub.import_to(&store, &ds).await.unwrap();
        assert_eq!(store.count(&ds).unwrap(), 5);
    }

    #[tokio::test]
    async fn test_import_rejects_unpublished_dataset() {
        let ds = dataset().with_status(DatasetStatus::Draft);
        let store = MemoryRecordStore::new();
        let err = HubDataset::new(source(3)).import_to(&store, &ds).await.unwrap_err();
        assert!(matches!(err, HubError::DatasetNotReady));
        assert_eq!(store.count(&ds).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_batch_stops_import() {
        let ds = dataset();
        let store = MemoryRecordStore::new();
        let mut rows: Vec<Row> = (0..3)
            .map(|i| row(json!({"id": i, "package_name": "com.x", "star": "1", "version_id": 1})))
            .collect();
        rows.push(row(json!({"id": 3, "package_name": "com.y", "star": "1", "version_id": "x"})));

        let err = HubDataset::new(JsonlHubSource::from_rows(rows))
            .with_batch_size(2)
            .import_to(&store, &ds)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "record at position 1 is not valid because metadata is not valid: \
             'version_id' metadata property validation failed because 'x' is not an integer"
        );
        // The first batch was already written.
        assert_eq!(store.count(&ds).unwrap(), 2);
    }
}
