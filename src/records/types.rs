//! Dataset schema and record payload types
//!
//! A dataset declares:
//! - fields: named, typed content slots (text, image, chat, custom)
//! - metadata properties: named auxiliary attributes with per-type rules
//! - whether undeclared metadata keys are tolerated
//! - whether it is published (ready) and may receive records

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::render::python_str;

/// Publication state of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    #[default]
    Draft,
    Ready,
}

/// Field settings, tagged by field type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldSettings {
    /// Free text
    Text {
        #[serde(default)]
        use_markdown: bool,
    },
    /// Web URL or data URL pointing at an image
    Image,
    /// List of `{role, content}` messages
    Chat {
        #[serde(default = "default_use_markdown")]
        use_markdown: bool,
    },
    /// Arbitrary structured value rendered through a template
    Custom {
        #[serde(default)]
        template: String,
    },
}

fn default_use_markdown() -> bool {
    true
}

/// A named content slot declared on a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub settings: FieldSettings,
}

impl Field {
    pub fn text(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, required, FieldSettings::Text { use_markdown: false })
    }

    pub fn image(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, required, FieldSettings::Image)
    }

    pub fn chat(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, required, FieldSettings::Chat { use_markdown: true })
    }

    pub fn custom(name: impl Into<String>, required: bool) -> Self {
        Self::new(
            name,
            required,
            FieldSettings::Custom {
                template: String::new(),
            },
        )
    }

    fn new(name: impl Into<String>, required: bool, settings: FieldSettings) -> Self {
        Self {
            name: name.into(),
            title: None,
            required,
            settings,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.settings, FieldSettings::Text { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self.settings, FieldSettings::Image)
    }

    pub fn is_chat(&self) -> bool {
        matches!(self.settings, FieldSettings::Chat { .. })
    }
}

/// Capability to check a metadata value against a property's own rules.
///
/// The error string is the bare reason; callers add the property context.
pub trait MetadataValueCheck {
    fn check_metadata(&self, value: &Value) -> Result<(), String>;
}

/// Metadata property settings, tagged by property type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataPropertySettings {
    Terms {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        values: Option<Vec<String>>,
    },
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Float {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
}

impl MetadataValueCheck for MetadataPropertySettings {
    fn check_metadata(&self, value: &Value) -> Result<(), String> {
        match self {
            MetadataPropertySettings::Terms { values } => {
                let terms: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for term in terms {
                    let term_str = term
                        .as_str()
                        .ok_or_else(|| format!("'{}' is not a valid term", python_str(term)))?;
                    if let Some(allowed) = values {
                        if !allowed.iter().any(|v| v == term_str) {
                            return Err(format!("'{}' is not an allowed term.", term_str));
                        }
                    }
                }
                Ok(())
            }
            MetadataPropertySettings::Integer { min, max } => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| format!("'{}' is not an integer", python_str(value)))?;
                if min.map_or(false, |min| n < min) || max.map_or(false, |max| n > max) {
                    return Err(format!("'{}' is out of range", n));
                }
                Ok(())
            }
            MetadataPropertySettings::Float { min, max } => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| format!("'{}' is not a float", python_str(value)))?;
                if min.map_or(false, |min| n < min) || max.map_or(false, |max| n > max) {
                    return Err(format!("'{}' is out of range", python_str(value)));
                }
                Ok(())
            }
        }
    }
}

/// A named, independently validated auxiliary attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataProperty {
    pub name: String,
    pub settings: MetadataPropertySettings,
}

impl MetadataProperty {
    pub fn terms(name: impl Into<String>, values: Option<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            settings: MetadataPropertySettings::Terms { values },
        }
    }

    pub fn integer(name: impl Into<String>, min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            name: name.into(),
            settings: MetadataPropertySettings::Integer { min, max },
        }
    }

    pub fn float(name: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            name: name.into(),
            settings: MetadataPropertySettings::Float { min, max },
        }
    }
}

/// Dataset schema and readiness governing which records are acceptable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: DatasetStatus,
    #[serde(default)]
    pub allow_extra_metadata: bool,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub metadata_properties: Vec<MetadataProperty>,
}

impl Dataset {
    /// Create a published dataset with no fields or metadata properties
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: DatasetStatus::Ready,
            allow_extra_metadata: false,
            fields: Vec::new(),
            metadata_properties: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_metadata_property(mut self, property: MetadataProperty) -> Self {
        self.metadata_properties.push(property);
        self
    }

    pub fn with_status(mut self, status: DatasetStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_extra_metadata(mut self, allow: bool) -> Self {
        self.allow_extra_metadata = allow;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.status == DatasetStatus::Ready
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn metadata_property_by_name(&self, name: &str) -> Option<&MetadataProperty> {
        self.metadata_properties.iter().find(|p| p.name == name)
    }
}

/// A model or annotator proposal for one question of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub question_id: Uuid,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Vectors keyed by vector settings name
pub type Vectors = HashMap<String, Vec<f64>>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordCreate {
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<Suggestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vectors: Option<Vectors>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<Suggestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vectors: Option<Vectors>,
}

/// Create-or-update payload, resolved against existing records by id or external id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordUpsert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<Suggestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vectors: Option<Vectors>,
}

impl RecordUpsert {
    /// Create-shaped view of this item
    pub fn as_create(&self) -> RecordCreate {
        RecordCreate {
            fields: self.fields.clone().unwrap_or_default(),
            metadata: self.metadata.clone(),
            external_id: self.external_id.clone(),
            responses: self.responses.clone(),
            suggestions: self.suggestions.clone(),
            vectors: self.vectors.clone(),
        }
    }

    /// Update-shaped view of this item
    pub fn as_update(&self) -> RecordUpdate {
        RecordUpdate {
            metadata: self.metadata.clone(),
            suggestions: self.suggestions.clone(),
            vectors: self.vectors.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordsBulkCreate {
    pub items: Vec<RecordCreate>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordsBulkUpsert {
    pub items: Vec<RecordUpsert>,
}
