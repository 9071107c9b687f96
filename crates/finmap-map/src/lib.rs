#![deny(unsafe_code)]

//! Header-to-field mapping: normalization, scoring, the resolver and the
//! editable mapping state.

pub mod engine;
pub mod error;
pub mod normalize;
pub mod score;
pub mod state;

pub use engine::{
    BestMatch, CandidateSource, ColumnResolution, MappingEngine, Progress, ResolveReport,
    ResolveTask, Resolution,
};
pub use error::MappingError;
pub use normalize::normalize;
pub use score::{ScoreTier, Similarity, edit_distance, edit_similarity, score, similarity};
pub use state::{MappingState, MappingSummary, TargetChange};
