#![deny(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog {origin}: {source}")]
    Toml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported catalog schema: {schema}")]
    UnsupportedSchema { schema: String },

    #[error("unsupported catalog schema_version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("invalid section id {section:?}")]
    InvalidSectionId { section: String },

    #[error("duplicate section in catalog: {section}")]
    DuplicateSection { section: String },

    #[error("duplicate field in catalog: {field}")]
    DuplicateField { field: String },

    #[error("field {field} references unknown section {section}")]
    UnknownSection { field: String, section: String },

    #[error("invalid field key {key:?} in section {section}")]
    InvalidFieldKey { section: String, key: String },

    #[error("synonym entry {key} does not belong to any field")]
    OrphanSynonyms { key: String },

    #[error("nested section {section}: {message}")]
    InvalidNested { section: String, message: String },

    #[error("failed to fingerprint catalog: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
