//! Business-input transformation.
//!
//! - **extract**: mapped cells of matching rows become canonical records
//! - **coerce**: per-cell coercion by target field type, with status
//! - **numeric**: number and boolean parsing
//! - **flatten**: singleton, nested and repeatable section shaping

pub mod coerce;
pub mod extract;
pub mod flatten;
pub mod numeric;

pub use coerce::{Coerced, CoercionStatus, coerce, coerce_with};
pub use extract::{CoercionIssue, Extraction, extract, extract_with};
pub use flatten::flatten;
pub use numeric::{Parsed, parse_bool, parse_number};
