//! Import orchestration for business inputs.
//!
//! Ties the catalog, the mapping state and the transform stages into one
//! pipeline, and defines the seam to the calculation service.

pub mod logging;
pub mod pipeline;
pub mod sink;

pub use pipeline::{
    ImportInput, ImportOutcome, ImportSummary, Prepared, build_input, prepare, reconcile,
};
pub use sink::{BusinessInputSink, CollectingSink, JsonLinesSink};
