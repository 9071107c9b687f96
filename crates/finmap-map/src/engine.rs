//! Mapping resolver.
//!
//! The engine scores every unmapped column of a mapping set against the
//! catalog candidates and accepts the best one when it clears the confidence
//! threshold. Resolution is additive: mapped and excluded columns are left
//! alone, so running the engine twice changes nothing.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use finmap_catalog::Catalog;
use finmap_model::{
    CandidateScope, ColumnMapping, DuplicateTargetPolicy, FieldType, MappingOptions,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::normalize::normalize;
use crate::score::{ScoreTier, similarity_normalized};

/// Which property of a field a candidate phrase came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    DisplayName,
    Id,
    Synonym,
}

/// One phrase a column can be compared against.
///
/// The position of a candidate in the engine's list is its ordinal: fields in
/// catalog order, and per field the display name, then the id, then each
/// synonym in catalog order.
#[derive(Debug, Clone)]
struct Candidate {
    field: usize,
    source: CandidateSource,
    phrase: String,
    normalized: String,
}

/// The winning candidate for a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestMatch {
    pub field: String,
    pub score: f64,
    pub tier: ScoreTier,
    pub source: CandidateSource,
    pub phrase: String,
    pub ordinal: usize,
}

impl BestMatch {
    /// Total order used to pick a winner: higher score first, then the
    /// earlier candidate.
    fn rank(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.ordinal.cmp(&self.ordinal))
    }
}

/// What the resolver did with one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    /// The best candidate cleared the threshold and was applied.
    Mapped { field: String, score: f64 },
    /// The header names a time period; left unmapped as text.
    Temporal,
    /// No candidate cleared the threshold.
    BelowThreshold { best: Option<BestMatch> },
    /// The column already had a target.
    Kept { field: String },
    /// The user excluded the column.
    Excluded,
    /// The winning field is already taken in this mapping set and the
    /// duplicate policy forbids sharing it.
    TargetTaken { best: BestMatch },
}

impl Resolution {
    pub fn is_mapped(&self) -> bool {
        matches!(self, Resolution::Mapped { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnResolution {
    pub section: String,
    pub column: String,
    pub resolution: Resolution,
}

/// Per-column outcomes of a resolver pass, in mapping order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolveReport {
    pub columns: Vec<ColumnResolution>,
}

impl ResolveReport {
    /// Columns newly mapped by this pass.
    pub fn mapped(&self) -> usize {
        self.count(Resolution::is_mapped)
    }

    pub fn temporal(&self) -> usize {
        self.count(|r| matches!(r, Resolution::Temporal))
    }

    /// Columns the pass looked at but could not map.
    pub fn unresolved(&self) -> Vec<&ColumnResolution> {
        self.columns
            .iter()
            .filter(|c| {
                matches!(
                    c.resolution,
                    Resolution::BelowThreshold { .. } | Resolution::TargetTaken { .. }
                )
            })
            .collect()
    }

    pub fn get(&self, section: &str, column: &str) -> Option<&Resolution> {
        self.columns
            .iter()
            .find(|c| c.section == section && c.column == column)
            .map(|c| &c.resolution)
    }

    fn count(&self, pred: impl Fn(&Resolution) -> bool) -> usize {
        self.columns.iter().filter(|c| pred(&c.resolution)).count()
    }
}

/// Fields already targeted per mapping set. Only tracked when the duplicate
/// policy forbids sharing a target.
#[derive(Debug, Clone, Default)]
struct TakenTargets {
    enabled: bool,
    by_section: BTreeMap<String, BTreeSet<String>>,
}

impl TakenTargets {
    fn seed(mappings: &[ColumnMapping], policy: DuplicateTargetPolicy) -> Self {
        let mut taken = Self {
            enabled: policy != DuplicateTargetPolicy::Allow,
            by_section: BTreeMap::new(),
        };
        for mapping in mappings.iter().filter(|m| !m.excluded) {
            if let Some(field) = &mapping.mapped_to {
                taken.insert(&mapping.section, field);
            }
        }
        taken
    }

    fn insert(&mut self, section: &str, field: &str) {
        if self.enabled {
            self.by_section
                .entry(section.to_string())
                .or_default()
                .insert(field.to_string());
        }
    }

    fn contains(&self, section: &str, field: &str) -> bool {
        self.enabled
            && self
                .by_section
                .get(section)
                .is_some_and(|fields| fields.contains(field))
    }
}

/// Resolves columns against a catalog.
///
/// Cloning is cheap; the catalog and the candidate list are shared.
#[derive(Debug, Clone)]
pub struct MappingEngine {
    catalog: Arc<Catalog>,
    options: MappingOptions,
    candidates: Arc<[Candidate]>,
    temporal_keywords: Vec<String>,
}

impl MappingEngine {
    pub fn new(catalog: impl Into<Arc<Catalog>>, options: MappingOptions) -> Self {
        let catalog = catalog.into();
        let candidates = build_candidates(&catalog);
        let temporal_keywords = options
            .temporal_keywords
            .iter()
            .map(String::as_str)
            .map(normalize)
            .filter(|k| !k.is_empty())
            .collect();
        debug!(
            catalog = %catalog.name(),
            fields = catalog.fields().len(),
            candidates = candidates.len(),
            "built mapping engine"
        );
        Self {
            catalog,
            options,
            candidates,
            temporal_keywords,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &MappingOptions {
        &self.options
    }

    /// True when the normalized header contains a temporal keyword.
    pub fn is_temporal(&self, column: &str) -> bool {
        let normalized = normalize(column);
        self.is_temporal_normalized(&normalized)
    }

    fn is_temporal_normalized(&self, normalized: &str) -> bool {
        self.temporal_keywords
            .iter()
            .any(|k| normalized.contains(k.as_str()))
    }

    /// Best candidate for `column` within the given section's scope,
    /// ignoring thresholds and duplicate policy.
    pub fn best_match(&self, column: &str, section: &str) -> Option<BestMatch> {
        let normalized = normalize(column);
        self.scored(&normalized, section).max_by(BestMatch::rank)
    }

    /// Every in-scope field with its best candidate, best first.
    pub fn rank_fields(&self, column: &str, section: &str) -> Vec<BestMatch> {
        let normalized = normalize(column);
        let mut per_field: BTreeMap<String, BestMatch> = BTreeMap::new();
        for candidate in self.scored(&normalized, section) {
            match per_field.get(&candidate.field) {
                Some(existing) if existing.rank(&candidate) != Ordering::Less => {}
                _ => {
                    per_field.insert(candidate.field.clone(), candidate);
                }
            }
        }
        let mut ranked: Vec<BestMatch> = per_field.into_values().collect();
        ranked.sort_by(|a, b| b.rank(a));
        ranked
    }

    /// Runs one pass over `mappings`, mutating unmapped columns in place.
    pub fn resolve(&self, mappings: &mut [ColumnMapping]) -> ResolveReport {
        let mut taken = TakenTargets::seed(mappings, self.options.duplicate_policy);
        let columns = mappings
            .iter_mut()
            .map(|mapping| self.resolve_one(mapping, &mut taken))
            .collect();
        let report = ResolveReport { columns };
        info!(
            columns = report.columns.len(),
            mapped = report.mapped(),
            temporal = report.temporal(),
            unresolved = report.unresolved().len(),
            "resolved column mappings"
        );
        report
    }

    /// Wraps `mappings` in a task that resolves `chunk_size` columns per step.
    pub fn task(&self, mappings: Vec<ColumnMapping>) -> ResolveTask {
        ResolveTask::new(self.clone(), mappings)
    }

    fn resolve_one(&self, mapping: &mut ColumnMapping, taken: &mut TakenTargets) -> ColumnResolution {
        let resolution = self.decide(mapping, taken);
        debug!(
            section = %mapping.section,
            column = %mapping.source_column,
            ?resolution,
            "column resolution"
        );
        ColumnResolution {
            section: mapping.section.clone(),
            column: mapping.source_column.clone(),
            resolution,
        }
    }

    fn decide(&self, mapping: &mut ColumnMapping, taken: &mut TakenTargets) -> Resolution {
        if mapping.excluded {
            return Resolution::Excluded;
        }
        if let Some(field) = &mapping.mapped_to {
            return Resolution::Kept {
                field: field.clone(),
            };
        }

        let normalized = normalize(&mapping.source_column);
        if self.is_temporal_normalized(&normalized) {
            mapping.mapped_to = None;
            mapping.data_type = FieldType::Text;
            mapping.is_required = false;
            return Resolution::Temporal;
        }

        let mut best_any: Option<BestMatch> = None;
        let mut best_free: Option<BestMatch> = None;
        for candidate in self.scored(&normalized, &mapping.section) {
            if !taken.contains(&mapping.section, &candidate.field)
                && best_free
                    .as_ref()
                    .is_none_or(|b| candidate.rank(b) == Ordering::Greater)
            {
                best_free = Some(candidate.clone());
            }
            if best_any
                .as_ref()
                .is_none_or(|b| candidate.rank(b) == Ordering::Greater)
            {
                best_any = Some(candidate);
            }
        }

        if let Some(best) = best_free.filter(|b| self.options.accepts(b.score))
            && let Some(field) = self.catalog.field(&best.field)
        {
            mapping.assign(field);
            taken.insert(&mapping.section, &field.id);
            return Resolution::Mapped {
                field: best.field,
                score: best.score,
            };
        }

        match best_any {
            Some(best) if self.options.accepts(best.score) => Resolution::TargetTaken { best },
            best => Resolution::BelowThreshold { best },
        }
    }

    fn scored<'a>(
        &'a self,
        normalized: &'a str,
        section: &'a str,
    ) -> impl Iterator<Item = BestMatch> + 'a {
        let fields = self.catalog.fields();
        self.candidates
            .iter()
            .enumerate()
            .filter(move |(_, c)| match self.options.candidate_scope {
                CandidateScope::Catalog => true,
                CandidateScope::Section => fields[c.field].section == section,
            })
            .map(move |(ordinal, c)| {
                let similarity = similarity_normalized(normalized, &c.normalized);
                BestMatch {
                    field: fields[c.field].id.clone(),
                    score: similarity.score,
                    tier: similarity.tier,
                    source: c.source,
                    phrase: c.phrase.clone(),
                    ordinal,
                }
            })
    }
}

fn build_candidates(catalog: &Catalog) -> Arc<[Candidate]> {
    let mut candidates = Vec::new();
    for (idx, field) in catalog.fields().iter().enumerate() {
        let mut push = |source: CandidateSource, phrase: &str| {
            candidates.push(Candidate {
                field: idx,
                source,
                phrase: phrase.to_string(),
                normalized: normalize(phrase),
            });
        };
        push(CandidateSource::DisplayName, &field.display_name);
        push(CandidateSource::Id, &field.id);
        for alias in catalog.aliases_for(field) {
            push(CandidateSource::Synonym, alias);
        }
    }
    candidates.into()
}

/// How far a [`ResolveTask`] has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_finished(&self) -> bool {
        self.done >= self.total
    }
}

/// A resolver pass split into bounded steps.
///
/// Each [`step`](Self::step) handles at most `chunk_size` columns, so a host
/// can interleave resolution with other work or drive it from a worker
/// thread. Driving a task to completion yields exactly the result of
/// [`MappingEngine::resolve`] on the same input.
#[derive(Debug, Clone)]
pub struct ResolveTask {
    engine: MappingEngine,
    mappings: Vec<ColumnMapping>,
    taken: TakenTargets,
    cursor: usize,
    report: ResolveReport,
}

impl ResolveTask {
    fn new(engine: MappingEngine, mappings: Vec<ColumnMapping>) -> Self {
        let taken = TakenTargets::seed(&mappings, engine.options.duplicate_policy);
        Self {
            engine,
            mappings,
            taken,
            cursor: 0,
            report: ResolveReport::default(),
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            done: self.cursor,
            total: self.mappings.len(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.progress().is_finished()
    }

    /// Resolves the next chunk of columns.
    pub fn step(&mut self) -> Progress {
        let chunk = self.engine.options.chunk_size.max(1);
        let end = (self.cursor + chunk).min(self.mappings.len());
        for idx in self.cursor..end {
            let resolved = self
                .engine
                .resolve_one(&mut self.mappings[idx], &mut self.taken);
            self.report.columns.push(resolved);
        }
        self.cursor = end;
        let progress = self.progress();
        debug!(done = progress.done, total = progress.total, "resolver step");
        progress
    }

    /// Steps until every column is resolved and returns the results.
    pub fn run(mut self) -> (Vec<ColumnMapping>, ResolveReport) {
        while !self.is_finished() {
            self.step();
        }
        self.into_parts()
    }

    /// Current mappings and report, whether or not the task has finished.
    pub fn into_parts(self) -> (Vec<ColumnMapping>, ResolveReport) {
        (self.mappings, self.report)
    }
}

#[cfg(test)]
mod tests {
    use finmap_catalog::CatalogBuilder;
    use finmap_model::Field;

    use super::*;

    fn catalog() -> Catalog {
        CatalogBuilder::new("test")
            .repeatable("income")
            .repeatable("costs")
            .field(Field::new("income", "revenue", "Total Revenue", FieldType::Currency).required(true))
            .field(Field::new("costs", "cogs", "Cost of Goods Sold", FieldType::Currency))
            .synonyms("income.revenue", ["sales", "turnover"])
            .synonyms("costs.cogs", ["cogs", "cost of sales"])
            .build()
            .unwrap()
    }

    #[test]
    fn candidates_follow_catalog_order() {
        let engine = MappingEngine::new(catalog(), MappingOptions::default());
        let phrases: Vec<&str> = engine.candidates.iter().map(|c| c.phrase.as_str()).collect();
        assert_eq!(
            phrases,
            [
                "Total Revenue",
                "income.revenue",
                "sales",
                "turnover",
                "Cost of Goods Sold",
                "costs.cogs",
                "cogs",
                "cost of sales",
            ]
        );
    }

    #[test]
    fn earliest_candidate_wins_ties() {
        // "cost" is contained in both "cost of goods sold" and "cost of sales".
        let engine = MappingEngine::new(catalog(), MappingOptions::default());
        let best = engine.best_match("cost", "costs").unwrap();
        assert_eq!(best.score, 0.8);
        assert_eq!(best.phrase, "Cost of Goods Sold");
        assert_eq!(best.source, CandidateSource::DisplayName);
    }

    #[test]
    fn rank_fields_keeps_best_candidate_per_field() {
        let engine = MappingEngine::new(catalog(), MappingOptions::default());
        let ranked = engine.rank_fields("Sales", "income");
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].field, "income.revenue");
        assert_eq!(ranked[0].phrase, "sales");
        assert_eq!(ranked[0].score, 1.0);
    }

    #[test]
    fn section_scope_limits_candidates() {
        let options = MappingOptions::default().with_candidate_scope(CandidateScope::Section);
        let engine = MappingEngine::new(catalog(), options);
        let mut mappings = vec![ColumnMapping::new("costs", "Turnover", FieldType::Text)];
        let report = engine.resolve(&mut mappings);
        assert!(!mappings[0].is_mapped());
        assert!(matches!(
            report.columns[0].resolution,
            Resolution::BelowThreshold { best: Some(ref b) } if b.field == "costs.cogs"
        ));

        let engine = MappingEngine::new(catalog(), MappingOptions::default());
        let report = engine.resolve(&mut mappings);
        assert!(mappings[0].targets("income.revenue"));
        assert_eq!(report.mapped(), 1);
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MappingEngine>();
        assert_send_sync::<ResolveTask>();
    }
}
