//! Record validation subsystem
//!
//! Decides whether a proposed record mutation (create, update, upsert) is
//! acceptable for a dataset, given the dataset's fields, metadata properties,
//! extra-metadata policy and publication state.
//!
//! Every rejection is a `RecordError::UnprocessableEntity` with a human-readable
//! message. Nested failures are wrapped outward-in: the outermost context names
//! the failing bulk position, the innermost the violated field or property.

mod bulk;
mod errors;
mod fields;
mod render;
mod store;
mod types;
mod validator;

pub use bulk::{
    resolve_existing, ExistingRecords, RecordKey, RecordsBulkCreateValidator,
    RecordsBulkUpsertValidator,
};
pub use errors::{RecordError, RecordResult};
pub use fields::{
    guess_data_url_mime_type, split_url, validate_chat_field, validate_image_field, UrlParts,
    CHAT_FIELD_MAX_LENGTH, IMAGE_FIELD_DATA_URL_MAX_LENGTH, IMAGE_FIELD_DATA_URL_VALID_MIME_TYPES,
    IMAGE_FIELD_WEB_URL_MAX_LENGTH,
};
pub use render::{python_repr, python_repr_str, python_str};
pub use store::{MemoryRecordStore, RecordRef, RecordsBulkWriter, RecordsLookup};
pub use types::{
    Dataset, DatasetStatus, Field, FieldSettings, MetadataProperty, MetadataPropertySettings,
    MetadataValueCheck, RecordCreate, RecordUpdate, RecordUpsert, RecordsBulkCreate,
    RecordsBulkUpsert, Suggestion, Vectors,
};
pub use validator::{validate_create, validate_update, RecordChange};
