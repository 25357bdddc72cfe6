//! Record validator for create and update mutations
//!
//! Create rules:
//! - Every required field is present and non-null
//! - No values for fields the dataset does not declare
//! - Image and chat fields hold well-formed values
//! - Metadata passes each declared property's own check
//!
//! Update rules:
//! - Metadata passes each declared property's own check
//! - Suggestions reference distinct questions
//!
//! Validation is a pure function of (mutation, dataset) and never mutates either.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::errors::{RecordError, RecordResult};
use super::fields::{quoted_list, validate_chat_field, validate_image_field};
use super::types::{Dataset, MetadataValueCheck, RecordCreate, RecordUpdate, Suggestion};

/// A record mutation to validate against a dataset.
#[derive(Debug, Clone, Copy)]
pub enum RecordChange<'a> {
    Create(&'a RecordCreate),
    Update(&'a RecordUpdate),
}

impl<'a> RecordChange<'a> {
    /// Validates this mutation against the dataset.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::UnprocessableEntity` describing the first violation found.
    pub fn validate_for(&self, dataset: &Dataset) -> RecordResult<()> {
        match self {
            RecordChange::Create(create) => {
                validate_fields(dataset, &create.fields)?;
                validate_metadata(dataset, create.metadata.as_ref())
            }
            RecordChange::Update(update) => {
                validate_metadata(dataset, update.metadata.as_ref())?;
                validate_duplicated_suggestions(update.suggestions.as_deref())
            }
        }
    }
}

/// Validates a record creation against the dataset.
pub fn validate_create(record: &RecordCreate, dataset: &Dataset) -> RecordResult<()> {
    RecordChange::Create(record).validate_for(dataset)
}

/// Validates a record update against the dataset.
pub fn validate_update(record: &RecordUpdate, dataset: &Dataset) -> RecordResult<()> {
    RecordChange::Update(record).validate_for(dataset)
}

fn validate_fields(dataset: &Dataset, fields: &Map<String, Value>) -> RecordResult<()> {
    validate_required_fields(dataset, fields)?;
    validate_extra_fields(dataset, fields)?;

    for field in dataset.fields.iter().filter(|f| f.is_image()) {
        validate_image_field(&field.name, fields.get(&field.name))?;
    }
    for field in dataset.fields.iter().filter(|f| f.is_chat()) {
        validate_chat_field(&field.name, fields.get(&field.name))?;
    }

    Ok(())
}

fn validate_required_fields(dataset: &Dataset, fields: &Map<String, Value>) -> RecordResult<()> {
    for field in dataset.fields.iter().filter(|f| f.required) {
        let present = fields.get(&field.name).map_or(false, |v| !v.is_null());
        if !present {
            return Err(RecordError::unprocessable(format!(
                "missing required value for field: '{}'",
                field.name
            )));
        }
    }
    Ok(())
}

fn validate_extra_fields(dataset: &Dataset, fields: &Map<String, Value>) -> RecordResult<()> {
    let extra: Vec<&str> = fields
        .keys()
        .filter(|name| dataset.field_by_name(name).is_none())
        .map(String::as_str)
        .collect();

    if !extra.is_empty() {
        return Err(RecordError::unprocessable(format!(
            "found fields values for non configured fields: {}",
            quoted_list(&extra)
        )));
    }
    Ok(())
}

fn validate_metadata(dataset: &Dataset, metadata: Option<&Map<String, Value>>) -> RecordResult<()> {
    let Some(metadata) = metadata else {
        return Ok(());
    };

    for (name, value) in metadata {
        match dataset.metadata_property_by_name(name) {
            Some(property) => {
                if value.is_null() {
                    continue;
                }
                property.settings.check_metadata(value).map_err(|reason| {
                    RecordError::unprocessable(format!(
                        "metadata is not valid: '{}' metadata property validation failed because {}",
                        name, reason
                    ))
                })?;
            }
            None if !dataset.allow_extra_metadata => {
                return Err(RecordError::unprocessable(format!(
                    "metadata is not valid: '{}' metadata property does not exists for dataset '{}' \
                     and extra metadata is not allowed for this dataset",
                    name, dataset.id
                )));
            }
            None => {}
        }
    }

    Ok(())
}

fn validate_duplicated_suggestions(suggestions: Option<&[Suggestion]>) -> RecordResult<()> {
    let Some(suggestions) = suggestions else {
        return Ok(());
    };

    let mut seen = HashSet::with_capacity(suggestions.len());
    if suggestions.iter().any(|s| !seen.insert(s.question_id)) {
        return Err(RecordError::unprocessable("found duplicate suggestions question IDs"));
    }
    Ok(())
}
