//! Row extraction: mapped cells of matching rows become canonical records.

use std::collections::BTreeMap;

use finmap_catalog::Catalog;
use finmap_map::MappingState;
use finmap_model::{CanonicalRecord, CellValue, ColumnMapping, Field, NumberFormat, RawRow};
use serde::Serialize;
use tracing::{debug, warn};

use crate::coerce::{CoercionStatus, coerce_with};

/// A cell that did not coerce exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoercionIssue {
    pub section: String,
    /// Index of the row in the extractor's input.
    pub row: usize,
    pub column: String,
    pub field: String,
    pub raw: CellValue,
    pub status: CoercionStatus,
}

/// Records per section plus everything a caller may want to warn about.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    /// Section id -> one record per matching row, in row order.
    pub records: BTreeMap<String, Vec<CanonicalRecord>>,
    pub issues: Vec<CoercionIssue>,
    /// Rows that matched none of the extracted sections.
    pub dropped_rows: usize,
}

impl Extraction {
    pub fn records(&self, section: &str) -> &[CanonicalRecord] {
        self.records
            .get(section)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn issues_in<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a CoercionIssue> + 'a {
        self.issues.iter().filter(move |issue| issue.section == section)
    }
}

/// An active column of one section with its resolved target field.
struct Binding<'a> {
    column: &'a str,
    field: &'a Field,
}

/// Extracts canonical records from `rows` using the mappings in `state`.
///
/// A section takes part when at least one of its columns is mapped and not
/// excluded. Each row belonging to it yields one record keyed by target
/// field key; columns absent from the row are left out of the record. When
/// two columns target the same key the later mapping wins. The mappings
/// themselves are never modified. Numeric text is read with
/// [`NumberFormat::Plain`].
pub fn extract(state: &MappingState, catalog: &Catalog, rows: &[RawRow]) -> Extraction {
    extract_with(state, catalog, rows, NumberFormat::default())
}

/// [`extract`] with an explicit reading of numeric text.
pub fn extract_with(
    state: &MappingState,
    catalog: &Catalog,
    rows: &[RawRow],
    format: NumberFormat,
) -> Extraction {
    let mut extraction = Extraction::default();
    let sections = bindings_by_section(state, catalog);
    let mut used = vec![false; rows.len()];

    for (section, bindings) in &sections {
        let mut records = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            if !state.row_matches(row, section) {
                continue;
            }
            used[idx] = true;
            records.push(extract_row(
                section,
                (idx, row),
                bindings,
                format,
                &mut extraction.issues,
            ));
        }
        debug!(section = %section, records = records.len(), columns = bindings.len(), "extracted section");
        extraction.records.insert((*section).to_string(), records);
    }

    extraction.dropped_rows = used.iter().filter(|u| !**u).count();
    if extraction.dropped_rows > 0 {
        debug!(dropped = extraction.dropped_rows, "rows matched no extracted section");
    }
    log_issues(&extraction);
    extraction
}

fn extract_row(
    section: &str,
    (idx, row): (usize, &RawRow),
    bindings: &[Binding<'_>],
    format: NumberFormat,
    issues: &mut Vec<CoercionIssue>,
) -> CanonicalRecord {
    let mut record = CanonicalRecord::new();
    for binding in bindings {
        let Some(raw) = row.get(binding.column) else {
            continue;
        };
        let coerced = coerce_with(raw, binding.field.data_type, format);
        if !coerced.status.is_exact() {
            issues.push(CoercionIssue {
                section: section.to_string(),
                row: idx,
                column: binding.column.to_string(),
                field: binding.field.id.clone(),
                raw: raw.clone(),
                status: coerced.status,
            });
        }
        record.insert(binding.field.key.clone(), coerced.value);
    }
    record
}

/// Active bindings grouped by section, sections in first-observed order.
fn bindings_by_section<'a>(
    state: &'a MappingState,
    catalog: &'a Catalog,
) -> Vec<(&'a str, Vec<Binding<'a>>)> {
    let mut sections: Vec<(&str, Vec<Binding<'_>>)> = Vec::new();
    for mapping in state.mappings().iter().filter(|m| !m.excluded) {
        let Some(field) = target_field(mapping, catalog) else {
            continue;
        };
        let binding = Binding {
            column: &mapping.source_column,
            field,
        };
        match sections.iter_mut().find(|(s, _)| *s == mapping.section) {
            Some((_, bindings)) => bindings.push(binding),
            None => sections.push((mapping.section.as_str(), vec![binding])),
        }
    }
    sections
}

fn target_field<'a>(mapping: &ColumnMapping, catalog: &'a Catalog) -> Option<&'a Field> {
    let target = mapping.mapped_to.as_deref()?;
    let field = catalog.field(target);
    if field.is_none() {
        warn!(
            section = %mapping.section,
            column = %mapping.source_column,
            %target,
            "mapped field is not in the catalog; column skipped"
        );
    }
    field
}

fn log_issues(extraction: &Extraction) {
    for section in extraction.records.keys() {
        let (mut lenient, mut defaulted) = (0usize, 0usize);
        for issue in extraction.issues_in(section) {
            match issue.status {
                CoercionStatus::Lenient => lenient += 1,
                CoercionStatus::Defaulted => defaulted += 1,
                CoercionStatus::Exact => {}
            }
        }
        if defaulted > 0 {
            warn!(section = %section, defaulted, lenient, "cells fell back to type defaults");
        } else if lenient > 0 {
            debug!(section = %section, lenient, "cells coerced leniently");
        }
    }
}
