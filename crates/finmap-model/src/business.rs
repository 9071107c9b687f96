//! Canonical records and the final business-input structure.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::CellValue;

/// One coerced row of a section, keyed by field key.
pub type CanonicalRecord = BTreeMap<String, CellValue>;

/// The structure handed to the external calculation service.
///
/// Serializes as a single JSON object: scalar keys promoted from singleton
/// sections, nested objects such as `globalInterestRates`, and one array of
/// records per repeatable section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BusinessInput {
    pub scalars: BTreeMap<String, CellValue>,
    pub nested: BTreeMap<String, BTreeMap<String, CellValue>>,
    pub sections: BTreeMap<String, Vec<CanonicalRecord>>,
}

impl BusinessInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(&self, key: &str) -> Option<&CellValue> {
        self.scalars.get(key)
    }

    pub fn nested(&self, key: &str) -> Option<&BTreeMap<String, CellValue>> {
        self.nested.get(key)
    }

    pub fn section(&self, key: &str) -> Option<&[CanonicalRecord]> {
        self.sections.get(key).map(Vec::as_slice)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.scalars.len() + self.nested.len() + self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.scalars.contains_key(key)
            || self.nested.contains_key(key)
            || self.sections.contains_key(key)
    }
}

impl Serialize for BusinessInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in &self.scalars {
            map.serialize_entry(key, value)?;
        }
        for (key, value) in &self.nested {
            map.serialize_entry(key, value)?;
        }
        for (key, records) in &self.sections {
            map.serialize_entry(key, records)?;
        }
        map.end()
    }
}
