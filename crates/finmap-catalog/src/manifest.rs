#![deny(unsafe_code)]

//! On-disk shape of a catalog TOML file, before validation.

use std::collections::BTreeMap;

use finmap_model::{CellValue, FieldType};
use serde::{Deserialize, Serialize};

pub const CATALOG_SCHEMA: &str = "finmap.field-catalog";
pub const CATALOG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub catalog: CatalogHeader,
    #[serde(default)]
    pub sections: Vec<SectionEntry>,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogHeader {
    pub schema: String,
    pub schema_version: u32,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKindName {
    #[default]
    Repeatable,
    Singleton,
    Nested,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionEntry {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: SectionKindName,
    /// Top-level key of the nested object (`kind = "nested"` only).
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberEntry {
    /// Key inside the nested object.
    pub name: String,
    /// Field key within the section supplying the value.
    pub field: String,
    /// Used when the first record has no value for `field`.
    #[serde(default)]
    pub default: CellValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldEntry {
    pub section: String,
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub data_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub synonym_key: Option<String>,
}
