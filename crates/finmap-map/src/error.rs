//! Error types for mapping edits.

/// Errors from explicit edits of the mapping state.
///
/// Automatic resolution never fails; these only surface when a caller asks
/// for something the state or catalog cannot honour.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("no section is active")]
    NoActiveSection,

    #[error("column not found in section {section}: {column}")]
    UnknownColumn { section: String, column: String },

    #[error("field not found in catalog: {0}")]
    UnknownField(String),

    #[error("field {field} is already mapped from column '{column}'")]
    TargetAlreadyMapped { field: String, column: String },
}
