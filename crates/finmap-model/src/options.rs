//! Configuration options for column mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Minimum similarity score for an automatic mapping to be accepted.
pub const CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Header fragments that mark a time-period column. Such columns are never
/// treated as data attributes.
pub const TEMPORAL_KEYWORDS: &[&str] = &[
    "year", "period", "date", "month", "quarter", "fiscal", "time",
];

/// Number of columns a chunked resolver task handles per step by default.
pub const DEFAULT_CHUNK_SIZE: usize = 16;

/// What happens when a second column in the same mapping set targets a field
/// that is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateTargetPolicy {
    /// Both columns keep the target.
    #[default]
    Allow,
    /// The column that took the field first keeps it; later requests are ignored.
    FirstWins,
    /// The latest request takes the field; the previous holder is cleared.
    LastWins,
    /// Later requests fail with an error.
    Reject,
}

/// Which catalog fields are offered as candidates for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateScope {
    /// Every field of the catalog, in catalog order.
    #[default]
    Catalog,
    /// Only fields belonging to the column's own section.
    Section,
}

/// How numeric text is read when a cell is coerced to a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    /// Only the leading numeric prefix counts: `"1,200"` reads as 1 and
    /// `"$1,200"` has no number at all.
    #[default]
    Plain,
    /// Thousands separators and `$` are dropped before the prefix is read.
    Formatted,
}

/// Options controlling automatic and manual mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOptions {
    /// Scores at or above this value are accepted.
    pub confidence_threshold: f64,
    /// Substrings of the normalized header that force a column to stay unmapped.
    pub temporal_keywords: Vec<String>,
    pub duplicate_policy: DuplicateTargetPolicy,
    pub candidate_scope: CandidateScope,
    /// Exact raw header -> field id, applied to unmapped columns when they are
    /// first observed.
    pub header_presets: BTreeMap<String, String>,
    /// Columns handled per step by a chunked resolver task.
    pub chunk_size: usize,
    pub number_format: NumberFormat,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: CONFIDENCE_THRESHOLD,
            temporal_keywords: TEMPORAL_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            duplicate_policy: DuplicateTargetPolicy::default(),
            candidate_scope: CandidateScope::default(),
            header_presets: default_header_presets(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            number_format: NumberFormat::default(),
        }
    }
}

impl MappingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ModelError> {
        let options: Self = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ModelError::InvalidThreshold(self.confidence_threshold));
        }
        if self.chunk_size == 0 {
            return Err(ModelError::InvalidChunkSize);
        }
        Ok(())
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicateTargetPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_candidate_scope(mut self, scope: CandidateScope) -> Self {
        self.candidate_scope = scope;
        self
    }

    pub fn with_header_presets(mut self, presets: BTreeMap<String, String>) -> Self {
        self.header_presets = presets;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_number_format(mut self, format: NumberFormat) -> Self {
        self.number_format = format;
        self
    }

    /// True when `score` clears the confidence threshold.
    pub fn accepts(&self, score: f64) -> bool {
        score >= self.confidence_threshold
    }
}

/// Service-sheet headers produced by the bundled import template.
fn default_header_presets() -> BTreeMap<String, String> {
    [
        ("Service Name", "services.name"),
        ("Price/Client", "services.price"),
        ("Clients/Month", "services.clients"),
        ("Growth %", "services.growth"),
        ("Delivery Cost", "services.cost"),
    ]
    .into_iter()
    .map(|(header, field)| (header.to_string(), field.to_string()))
    .collect()
}
