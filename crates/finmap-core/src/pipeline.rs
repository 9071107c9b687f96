//! The import pipeline.
//!
//! Stages, in order:
//!
//! 1. **prepare** - bind the state to the catalog, assign sheets, observe the
//!    columns of every section, seed header presets, run the resolver
//! 2. **build** - extract canonical records and flatten them into the
//!    business input
//!
//! A host running the interactive review calls [`prepare`], lets the user
//! edit the returned [`MappingState`], then calls [`build_input`].
//! [`reconcile`] runs both back to back. All of them are pure: the same
//! catalog, options, rows and prior state always give the same result.

use std::time::Instant;

use anyhow::{Context, Result};
use finmap_catalog::Catalog;
use finmap_map::{MappingEngine, MappingState, ResolveReport};
use finmap_model::{BusinessInput, MappingOptions, RawRow};
use finmap_transform::{Extraction, extract_with, flatten};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::logging::redact_value;

/// Everything the pipeline reads besides the prior mapping state.
#[derive(Debug, Clone, Copy)]
pub struct ImportInput<'a> {
    pub catalog: &'a Catalog,
    pub options: &'a MappingOptions,
    pub rows: &'a [RawRow],
    /// Sheet names of the source workbook, used for sheet auto-assignment.
    pub sheet_names: &'a [String],
}

/// Result of the mapping stage.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub state: MappingState,
    pub resolution: ResolveReport,
    pub sheets_assigned: usize,
    pub presets_applied: usize,
    /// Prior targets cleared because the catalog no longer has the field.
    pub stale_cleared: usize,
}

/// Result of a full import.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub state: MappingState,
    pub input: BusinessInput,
    pub resolution: ResolveReport,
    pub extraction: Extraction,
}

/// Counts for a host to show after an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub columns: usize,
    pub mapped: usize,
    pub temporal: usize,
    pub unresolved: usize,
    pub records: usize,
    pub coercion_issues: usize,
    pub dropped_rows: usize,
}

impl ImportOutcome {
    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            columns: self.state.mappings().len(),
            mapped: self.state.mappings().iter().filter(|m| m.is_mapped()).count(),
            temporal: self.resolution.temporal(),
            unresolved: self.resolution.unresolved().len(),
            records: self.extraction.records.values().map(Vec::len).sum(),
            coercion_issues: self.extraction.issues.len(),
            dropped_rows: self.extraction.dropped_rows,
        }
    }
}

/// Runs the mapping stage.
///
/// `prior` carries user edits from an earlier review; resolution is additive
/// so those edits survive. A prior state built against a different catalog
/// is kept, but targets the catalog no longer has are cleared and resolved
/// again.
pub fn prepare(input: &ImportInput<'_>, prior: Option<MappingState>) -> Result<Prepared> {
    input
        .options
        .validate()
        .context("validate mapping options")?;
    let catalog = input.catalog;
    let span = info_span!(
        "prepare",
        catalog = %catalog.name(),
        catalog_version = %catalog.version(),
        rows = input.rows.len()
    );
    let _guard = span.enter();
    let start = Instant::now();

    let mut state = prior.unwrap_or_else(|| MappingState::new(input.options.duplicate_policy));
    state.set_duplicate_policy(input.options.duplicate_policy);
    let stale_cleared = rebind(&mut state, catalog);

    let sheets_assigned = state.auto_assign_sheets(input.sheet_names, catalog);
    let observed = state.observe_all(catalog, input.rows);
    let presets_applied = state.apply_presets(&input.options.header_presets, catalog);

    let engine = MappingEngine::new(catalog.clone(), input.options.clone());
    let resolution = info_span!("resolve").in_scope(|| state.auto_map(&engine));

    info!(
        sheets_assigned,
        observed,
        presets_applied,
        mapped = resolution.mapped(),
        temporal = resolution.temporal(),
        unresolved = resolution.unresolved().len(),
        duration_ms = start.elapsed().as_millis(),
        "mapping complete"
    );
    Ok(Prepared {
        state,
        resolution,
        sheets_assigned,
        presets_applied,
        stale_cleared,
    })
}

/// Runs the build stage over a reviewed mapping state.
pub fn build_input(input: &ImportInput<'_>, state: &MappingState) -> (BusinessInput, Extraction) {
    let ImportInput {
        catalog,
        options,
        rows,
        ..
    } = *input;
    let span = info_span!("build", catalog = %catalog.name(), rows = rows.len());
    let _guard = span.enter();
    let start = Instant::now();

    let extraction = info_span!("extract")
        .in_scope(|| extract_with(state, catalog, rows, options.number_format));
    for issue in &extraction.issues {
        debug!(
            section = %issue.section,
            row = issue.row,
            column = %issue.column,
            field = %issue.field,
            raw = %redact_value(&issue.raw),
            status = ?issue.status,
            "coercion issue"
        );
    }
    let input = info_span!("flatten").in_scope(|| flatten(catalog, extraction.records.clone()));

    info!(
        sections = extraction.records.len(),
        keys = input.len(),
        coercion_issues = extraction.issues.len(),
        dropped_rows = extraction.dropped_rows,
        duration_ms = start.elapsed().as_millis(),
        "business input built"
    );
    (input, extraction)
}

/// Runs the whole import: [`prepare`] followed by [`build_input`].
pub fn reconcile(input: &ImportInput<'_>, prior: Option<MappingState>) -> Result<ImportOutcome> {
    let Prepared {
        state, resolution, ..
    } = prepare(input, prior)?;
    let (business, extraction) = build_input(input, &state);
    Ok(ImportOutcome {
        state,
        input: business,
        resolution,
        extraction,
    })
}

/// Binds `state` to `catalog`, clearing targets the catalog does not know.
/// Returns the number of cleared targets.
fn rebind(state: &mut MappingState, catalog: &Catalog) -> usize {
    if state.is_built_against(catalog) {
        return 0;
    }
    if let Some(previous) = state.catalog_fingerprint() {
        warn!(
            previous = %previous,
            current = %catalog.fingerprint(),
            "mapping state was built against a different catalog"
        );
    }

    let mut mappings = state.mappings().to_vec();
    let mut cleared = 0;
    for mapping in &mut mappings {
        let stale = mapping
            .mapped_to
            .as_deref()
            .is_some_and(|target| catalog.field(target).is_none());
        if stale {
            debug!(
                section = %mapping.section,
                column = %mapping.source_column,
                "cleared target missing from catalog"
            );
            mapping.clear();
            cleared += 1;
        }
    }
    if cleared > 0 {
        state.replace_mappings(mappings);
    }
    state.bind_catalog(catalog);
    cleared
}
