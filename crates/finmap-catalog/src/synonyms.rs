#![deny(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Alternate human phrasings per field lookup key.
///
/// Keys are matched exactly; only the alias values take part in fuzzy
/// scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynonymCatalog {
    entries: BTreeMap<String, Vec<String>>,
}

impl SynonymCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends aliases for `key`, keeping their order.
    pub fn insert<I, S>(&mut self, key: impl Into<String>, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .entry(key.into())
            .or_default()
            .extend(aliases.into_iter().map(Into::into));
    }

    /// Aliases registered under `key`, in catalog order. Empty when unknown.
    pub fn aliases(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<BTreeMap<String, Vec<String>>> for SynonymCatalog {
    fn from(entries: BTreeMap<String, Vec<String>>) -> Self {
        Self { entries }
    }
}
