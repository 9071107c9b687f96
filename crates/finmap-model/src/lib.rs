#![deny(unsafe_code)]

pub mod business;
pub mod error;
pub mod field;
pub mod mapping;
pub mod options;
pub mod table;

pub use business::{BusinessInput, CanonicalRecord};
pub use error::{ModelError, Result};
pub use field::{Field, FieldType, qualified_id, split_field_id};
pub use mapping::ColumnMapping;
pub use options::{
    CONFIDENCE_THRESHOLD, CandidateScope, DEFAULT_CHUNK_SIZE, DuplicateTargetPolicy,
    MappingOptions, NumberFormat, TEMPORAL_KEYWORDS,
};
pub use table::{CellValue, RawRow};
