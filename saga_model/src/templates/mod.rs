//! Entity templates - named field schemas that entity types refer to.

mod builtin;

pub use builtin::*;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

use crate::entities::EntityData;
use crate::error::{require_non_empty, KnowledgeError, Result};

/// Unique identifier for templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub Uuid);

impl TemplateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of field types a template may declare.
///
/// Every consumer matches on this exhaustively, so adding a type is a
/// compile error everywhere it needs handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Single-line string.
    String,
    /// Multi-line prose.
    Text,
    Number,
    /// RFC 3339 timestamp or `YYYY-MM-DD` calendar date.
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
        }
    }

    /// Check whether a JSON value fits this field type. `null` always fits.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            FieldType::String | FieldType::Text => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Date => value.as_str().is_some_and(is_date),
        }
    }
}

fn is_date(raw: &str) -> bool {
    DateTime::parse_from_rfc3339(raw).is_ok() || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named field of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// A stored template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<Field>,
}

impl Template {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check entity data against this template's fields.
    ///
    /// Rejects keys the template does not declare and values whose JSON type
    /// does not fit the declared field type.
    pub fn validate_data(&self, data: &EntityData) -> Result<()> {
        for (key, value) in data {
            let field = self.field(key).ok_or_else(|| {
                KnowledgeError::validation(format!(
                    "field '{}' is not defined by template '{}'",
                    key, self.name
                ))
            })?;
            if !field.field_type.accepts(value) {
                return Err(KnowledgeError::validation(format!(
                    "field '{}' expects a {} value",
                    key, field.field_type
                )));
            }
        }
        Ok(())
    }
}

/// Check the structural invariants of a field list.
pub fn validate_fields(fields: &[Field]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        require_non_empty("field name", &field.name)?;
        if !seen.insert(field.name.as_str()) {
            return Err(KnowledgeError::validation(format!(
                "duplicate field name '{}'",
                field.name
            )));
        }
    }
    Ok(())
}

/// Payload for creating a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl NewTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(Field::new(name, field_type));
        self
    }

    /// Name uniqueness is checked by the registry, not here.
    pub fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        validate_fields(&self.fields)
    }

    pub fn into_template(self) -> Template {
        Template {
            id: TemplateId::new(),
            name: self.name,
            description: self.description,
            fields: self.fields,
        }
    }
}

/// Partial update for a template. Absent fields are left unchanged.
///
/// `description` distinguishes an absent key (`None`) from an explicit
/// `null` (`Some(None)`), which clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub fields: Option<Vec<Field>>,
}

/// Any value that is present, `null` included, becomes `Some`.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl TemplatePatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(fields) = &self.fields {
            validate_fields(fields)?;
        }
        Ok(())
    }

    pub fn apply_to(self, template: &mut Template) {
        if let Some(name) = self.name {
            template.name = name;
        }
        if let Some(description) = self.description {
            template.description = description;
        }
        if let Some(fields) = self.fields {
            template.fields = fields;
        }
    }
}
