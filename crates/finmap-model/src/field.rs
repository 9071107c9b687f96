//! Canonical field definitions.
//!
//! A [`Field`] is one typed slot of the target business-input schema. Fields
//! are grouped into sections (`services`, `wacc`, ...) and addressed by a
//! qualified id of the form `section.key`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Declared value type of a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Currency,
    Percentage,
    Boolean,
}

impl FieldType {
    /// Number, currency and percentage fields feed calculations and are
    /// coerced to floating point.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Number | FieldType::Currency | FieldType::Percentage
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Currency => "currency",
            FieldType::Percentage => "percentage",
            FieldType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(FieldType::Text),
            "number" | "numeric" => Ok(FieldType::Number),
            "currency" => Ok(FieldType::Currency),
            "percentage" | "percent" => Ok(FieldType::Percentage),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            other => Err(format!("unknown field type: {other}")),
        }
    }
}

/// A canonical field of the target schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Qualified id, `section.key`.
    pub id: String,
    /// Owning section.
    pub section: String,
    /// Key used inside canonical records and the business input.
    pub key: String,
    /// Human-readable name shown on the review surface.
    pub display_name: String,
    pub is_required: bool,
    pub data_type: FieldType,
    /// Synonym catalog lookup key. Falls back to `id` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonym_key: Option<String>,
}

impl Field {
    pub fn new(
        section: impl Into<String>,
        key: impl Into<String>,
        display_name: impl Into<String>,
        data_type: FieldType,
    ) -> Self {
        let section = section.into();
        let key = key.into();
        Self {
            id: qualified_id(&section, &key),
            section,
            key,
            display_name: display_name.into(),
            is_required: false,
            data_type,
            synonym_key: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.is_required = required;
        self
    }

    pub fn with_synonym_key(mut self, key: impl Into<String>) -> Self {
        self.synonym_key = Some(key.into());
        self
    }

    /// Key under which this field's aliases are stored in the synonym catalog.
    pub fn lookup_key(&self) -> &str {
        self.synonym_key.as_deref().unwrap_or(&self.id)
    }
}

/// Builds the `section.key` id of a field.
pub fn qualified_id(section: &str, key: &str) -> String {
    format!("{section}.{key}")
}

/// Splits a `section.key` id. The key may not contain further dots.
pub fn split_field_id(id: &str) -> Result<(&str, &str), ModelError> {
    match id.split_once('.') {
        Some((section, key))
            if !section.trim().is_empty() && !key.trim().is_empty() && !key.contains('.') =>
        {
            Ok((section, key))
        }
        _ => Err(ModelError::InvalidFieldId(id.to_string())),
    }
}
