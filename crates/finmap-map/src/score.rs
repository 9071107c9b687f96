//! Similarity scoring between a source header and a candidate phrase.
//!
//! Scores follow a strict priority ladder over the normalized strings:
//!
//! 1. identical: `1.0`
//! 2. one contains the other: `0.8`
//! 3. shared whitespace tokens: `shared / max(tokens) * 0.6`
//! 4. otherwise edit similarity: `(1 - levenshtein / max(len)) * 0.4`
//!
//! The first rule that applies wins. Rules 2 and 3 are evaluated from the
//! first argument's side, so `score(a, b)` and `score(b, a)` may differ when
//! tokens repeat.

use std::fmt;

use rapidfuzz::distance::levenshtein;
use serde::{Deserialize, Serialize};

use crate::normalize::{normalize, tokens};

pub const EXACT_SCORE: f64 = 1.0;
pub const CONTAINS_SCORE: f64 = 0.8;
pub const TOKEN_WEIGHT: f64 = 0.6;
pub const EDIT_WEIGHT: f64 = 0.4;

/// Which rung of the ladder produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Exact,
    Contains,
    SharedTokens,
    EditDistance,
    /// One side normalized to nothing.
    Blank,
}

impl ScoreTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreTier::Exact => "exact",
            ScoreTier::Contains => "contains",
            ScoreTier::SharedTokens => "shared tokens",
            ScoreTier::EditDistance => "edit distance",
            ScoreTier::Blank => "blank",
        }
    }
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A score in `[0, 1]` together with the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Similarity {
    pub score: f64,
    pub tier: ScoreTier,
}

impl Similarity {
    /// Human-readable explanation of the score.
    pub fn explain(&self) -> String {
        format!("{}: {:.0}%", self.tier, self.score * 100.0)
    }
}

/// Scores two raw strings. See the module docs for the rules.
pub fn score(a: &str, b: &str) -> f64 {
    similarity(a, b).score
}

/// Scores two raw strings and reports which rule applied.
pub fn similarity(a: &str, b: &str) -> Similarity {
    similarity_normalized(&normalize(a), &normalize(b))
}

/// Scores two strings that are already normalized.
pub fn similarity_normalized(a: &str, b: &str) -> Similarity {
    if a.is_empty() || b.is_empty() {
        return Similarity {
            score: 0.0,
            tier: ScoreTier::Blank,
        };
    }
    if a == b {
        return Similarity {
            score: EXACT_SCORE,
            tier: ScoreTier::Exact,
        };
    }
    if a.contains(b) || b.contains(a) {
        return Similarity {
            score: CONTAINS_SCORE,
            tier: ScoreTier::Contains,
        };
    }

    let tokens_a = tokens(a);
    let tokens_b = tokens(b);
    let shared = tokens_a.iter().filter(|t| tokens_b.contains(t)).count();
    if shared > 0 {
        let longest = tokens_a.len().max(tokens_b.len());
        return Similarity {
            score: shared as f64 / longest as f64 * TOKEN_WEIGHT,
            tier: ScoreTier::SharedTokens,
        };
    }

    Similarity {
        score: edit_ratio(a, b) * EDIT_WEIGHT,
        tier: ScoreTier::EditDistance,
    }
}

/// Levenshtein distance between two strings, counted in characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    levenshtein::distance(a.chars(), b.chars())
}

/// The edit-distance rung on its own, over the normalized strings.
///
/// Symmetric. Returns `0.0` when either side normalizes to nothing.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    edit_ratio(&a, &b) * EDIT_WEIGHT
}

fn edit_ratio(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let distance = edit_distance(a, b);
    (1.0 - distance as f64 / longest as f64).max(0.0)
}
