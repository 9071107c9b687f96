use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid field id: {0:?} (expected \"section.key\")")]
    InvalidFieldId(String),
    #[error("invalid section name: {0:?}")]
    InvalidSection(String),
    #[error("confidence threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    #[error("failed to parse mapping options: {0}")]
    OptionsToml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
