//! Mapping state for the interactive review workflow.
//!
//! The state owns every column mapping observed so far, grouped into mapping
//! sets by section, along with the section currently under review and the
//! sheet assigned to each section. It is plain serde data so a host can keep
//! it between imports; edits are single-writer and the last write wins.

use std::collections::{BTreeMap, BTreeSet};

use finmap_catalog::Catalog;
use finmap_model::{CellValue, ColumnMapping, DuplicateTargetPolicy, FieldType, RawRow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::{MappingEngine, ResolveReport, ResolveTask};
use crate::error::MappingError;

/// Outcome of an explicit target edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetChange {
    Assigned,
    Cleared,
    /// `FirstWins`: another column already holds the field; nothing changed.
    Ignored { holder: String },
    /// `LastWins`: the listed columns lost the field to this one.
    Displaced { previous: Vec<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingState {
    mappings: Vec<ColumnMapping>,
    active_section: Option<String>,
    /// Columns of the active section, in first-seen order.
    visible: Vec<String>,
    /// Section id -> sheet name.
    sheets: BTreeMap<String, String>,
    duplicate_policy: DuplicateTargetPolicy,
    catalog_fingerprint: Option<String>,
}

impl MappingState {
    pub fn new(duplicate_policy: DuplicateTargetPolicy) -> Self {
        Self {
            duplicate_policy,
            ..Self::default()
        }
    }

    /// A fresh state bound to `catalog`.
    pub fn for_catalog(catalog: &Catalog, duplicate_policy: DuplicateTargetPolicy) -> Self {
        let mut state = Self::new(duplicate_policy);
        state.bind_catalog(catalog);
        state
    }

    pub fn bind_catalog(&mut self, catalog: &Catalog) {
        self.catalog_fingerprint = Some(catalog.fingerprint().to_string());
    }

    pub fn catalog_fingerprint(&self) -> Option<&str> {
        self.catalog_fingerprint.as_deref()
    }

    /// True when this state was last bound to exactly `catalog`.
    pub fn is_built_against(&self, catalog: &Catalog) -> bool {
        self.catalog_fingerprint.as_deref() == Some(catalog.fingerprint())
    }

    pub fn duplicate_policy(&self) -> DuplicateTargetPolicy {
        self.duplicate_policy
    }

    pub fn set_duplicate_policy(&mut self, policy: DuplicateTargetPolicy) {
        self.duplicate_policy = policy;
    }

    pub fn mappings(&self) -> &[ColumnMapping] {
        &self.mappings
    }

    pub fn active_section(&self) -> Option<&str> {
        self.active_section.as_deref()
    }

    /// Mappings of one section, in the order their columns were observed.
    pub fn mapping_set<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a ColumnMapping> + 'a {
        self.mappings.iter().filter(move |m| m.section == section)
    }

    pub fn mapping(&self, section: &str, column: &str) -> Option<&ColumnMapping> {
        self.position(section, column).map(|idx| &self.mappings[idx])
    }

    /// Mappings of the active section's currently visible columns.
    pub fn visible(&self) -> Vec<&ColumnMapping> {
        let Some(section) = self.active_section.as_deref() else {
            return Vec::new();
        };
        self.visible
            .iter()
            .filter_map(|column| self.mapping(section, column))
            .collect()
    }

    // ----------------------------------------------------------------- sheets

    pub fn sheet_for(&self, section: &str) -> Option<&str> {
        self.sheets.get(section).map(String::as_str)
    }

    pub fn assign_sheet(&mut self, section: impl Into<String>, sheet: impl Into<String>) {
        let section = section.into();
        let sheet = sheet.into();
        debug!(%section, %sheet, "assigned sheet");
        self.sheets.insert(section, sheet);
    }

    /// Assigns a sheet to every catalog section that has none yet, picking
    /// the first sheet whose name contains the section id with underscores
    /// removed, ignoring case. Returns how many sections were assigned.
    pub fn auto_assign_sheets<S: AsRef<str>>(&mut self, sheet_names: &[S], catalog: &Catalog) -> usize {
        let mut assigned = 0;
        for section in catalog.sections() {
            if self.sheets.contains_key(&section.id) {
                continue;
            }
            let needle = section.id.replace('_', "").to_lowercase();
            let found = sheet_names
                .iter()
                .map(AsRef::as_ref)
                .find(|name| name.to_lowercase().contains(&needle));
            if let Some(sheet) = found {
                self.assign_sheet(section.id.clone(), sheet);
                assigned += 1;
            }
        }
        assigned
    }

    /// True when `row` belongs to `section` by tag or assigned sheet.
    pub fn row_matches(&self, row: &RawRow, section: &str) -> bool {
        row.matches_section(section, self.sheet_for(section))
    }

    // ------------------------------------------------------------ observation

    /// Makes `section` active and recomputes its visible columns from the
    /// rows that belong to it. Returns the number of newly observed columns.
    pub fn select_section(&mut self, section: &str, rows: &[RawRow]) -> usize {
        let (columns, added) = self.observe(section, rows);
        self.active_section = Some(section.to_string());
        self.visible = columns;
        debug!(
            section,
            visible = self.visible.len(),
            added,
            "selected section"
        );
        added
    }

    /// Observes the columns of every catalog section without changing the
    /// active section. Returns the number of newly observed columns.
    pub fn observe_all(&mut self, catalog: &Catalog, rows: &[RawRow]) -> usize {
        catalog
            .sections()
            .iter()
            .map(|section| self.observe(&section.id, rows).1)
            .sum()
    }

    fn observe(&mut self, section: &str, rows: &[RawRow]) -> (Vec<String>, usize) {
        let mut columns: Vec<String> = Vec::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut first_values: BTreeMap<&str, &CellValue> = BTreeMap::new();
        for row in rows.iter().filter(|r| self.row_matches(r, section)) {
            for (column, value) in &row.cells {
                if seen.insert(column.as_str()) {
                    columns.push(column.clone());
                }
                if !value.is_blank() {
                    first_values.entry(column.as_str()).or_insert(value);
                }
            }
        }

        let mut fresh = Vec::new();
        for column in &columns {
            if self.position(section, column).is_none() {
                let data_type = first_values
                    .get(column.as_str())
                    .map_or(FieldType::Text, |v| v.infer_type());
                fresh.push(ColumnMapping::new(section, column.clone(), data_type));
            }
        }
        let added = fresh.len();
        self.mappings.extend(fresh);
        (columns, added)
    }

    // ------------------------------------------------------------------ edits

    /// Points `column` of the active section at `target`, or clears it.
    ///
    /// When another column of the same mapping set already targets the field,
    /// the duplicate policy decides what happens.
    pub fn set_target(
        &mut self,
        column: &str,
        target: Option<&str>,
        catalog: &Catalog,
    ) -> Result<TargetChange, MappingError> {
        let section = self.require_active()?.to_string();
        let idx = self.require_column(&section, column)?;

        let Some(target) = target else {
            self.mappings[idx].clear();
            debug!(%section, column, "cleared target");
            return Ok(TargetChange::Cleared);
        };
        let field = catalog
            .field(target)
            .ok_or_else(|| MappingError::UnknownField(target.to_string()))?;

        let holders: Vec<usize> = self
            .mappings
            .iter()
            .enumerate()
            .filter(|(i, m)| *i != idx && m.section == section && !m.excluded && m.targets(&field.id))
            .map(|(i, _)| i)
            .collect();

        let change = match (self.duplicate_policy, holders.first()) {
            (DuplicateTargetPolicy::Allow, _) | (_, None) => {
                self.mappings[idx].assign(field);
                TargetChange::Assigned
            }
            (DuplicateTargetPolicy::FirstWins, Some(&holder)) => TargetChange::Ignored {
                holder: self.mappings[holder].source_column.clone(),
            },
            (DuplicateTargetPolicy::Reject, Some(&holder)) => {
                return Err(MappingError::TargetAlreadyMapped {
                    field: field.id.clone(),
                    column: self.mappings[holder].source_column.clone(),
                });
            }
            (DuplicateTargetPolicy::LastWins, Some(_)) => {
                let previous = holders
                    .iter()
                    .map(|&h| {
                        self.mappings[h].clear();
                        self.mappings[h].source_column.clone()
                    })
                    .collect();
                self.mappings[idx].assign(field);
                TargetChange::Displaced { previous }
            }
        };
        debug!(%section, column, field = %field.id, ?change, "set target");
        Ok(change)
    }

    /// Marks `column` of the active section as excluded from automatic
    /// resolution and extraction, or lifts the exclusion.
    pub fn set_excluded(&mut self, column: &str, excluded: bool) -> Result<(), MappingError> {
        let section = self.require_active()?.to_string();
        let idx = self.require_column(&section, column)?;
        self.mappings[idx].excluded = excluded;
        debug!(%section, column, excluded, "set excluded");
        Ok(())
    }

    /// Clears every target in every mapping set.
    pub fn clear_all(&mut self) {
        for mapping in &mut self.mappings {
            mapping.clear();
        }
        info!(columns = self.mappings.len(), "cleared all mappings");
    }

    /// Seeds unmapped columns whose exact header has a configured target in
    /// the same section. Returns the number of columns seeded.
    pub fn apply_presets(&mut self, presets: &BTreeMap<String, String>, catalog: &Catalog) -> usize {
        let mut applied = 0;
        for idx in 0..self.mappings.len() {
            let mapping = &self.mappings[idx];
            if mapping.excluded || mapping.is_mapped() {
                continue;
            }
            let Some(target) = presets.get(&mapping.source_column) else {
                continue;
            };
            let Some(field) = catalog.field(target) else {
                warn!(column = %mapping.source_column, %target, "header preset targets unknown field");
                continue;
            };
            if field.section != mapping.section {
                continue;
            }
            if self.duplicate_policy != DuplicateTargetPolicy::Allow
                && self
                    .mapping_set(&mapping.section)
                    .any(|m| !m.excluded && m.targets(&field.id))
            {
                continue;
            }
            self.mappings[idx].assign(field);
            applied += 1;
        }
        if applied > 0 {
            debug!(applied, "applied header presets");
        }
        applied
    }

    /// Runs the resolver over every mapping set.
    pub fn auto_map(&mut self, engine: &MappingEngine) -> ResolveReport {
        engine.resolve(&mut self.mappings)
    }

    /// A chunked resolver task over a snapshot of the current mappings.
    /// Hand the finished mappings back with [`Self::replace_mappings`].
    pub fn resolve_task(&self, engine: &MappingEngine) -> ResolveTask {
        engine.task(self.mappings.clone())
    }

    /// Replaces all mappings, e.g. with the output of a [`ResolveTask`].
    pub fn replace_mappings(&mut self, mappings: Vec<ColumnMapping>) {
        self.mappings = mappings;
    }

    // ---------------------------------------------------------------- summary

    /// Counts for one section's mapping set and the required fields of that
    /// section no column targets yet.
    pub fn summary(&self, section: &str, catalog: &Catalog) -> MappingSummary {
        let set: Vec<&ColumnMapping> = self.mapping_set(section).collect();
        let targeted: BTreeSet<&str> = set
            .iter()
            .filter(|m| !m.excluded)
            .filter_map(|m| m.mapped_to.as_deref())
            .collect();
        let required: Vec<&str> = catalog
            .fields_in(section)
            .filter(|f| f.is_required)
            .map(|f| f.id.as_str())
            .collect();
        let missing_required: Vec<String> = required
            .iter()
            .filter(|id| !targeted.contains(*id))
            .map(|id| (*id).to_string())
            .collect();

        MappingSummary {
            section: section.to_string(),
            columns: set.len(),
            mapped: set.iter().filter(|m| !m.excluded && m.is_mapped()).count(),
            excluded: set.iter().filter(|m| m.excluded).count(),
            required_total: required.len(),
            required_mapped: required.len() - missing_required.len(),
            missing_required,
        }
    }

    fn position(&self, section: &str, column: &str) -> Option<usize> {
        self.mappings
            .iter()
            .position(|m| m.section == section && m.source_column == column)
    }

    fn require_active(&self) -> Result<&str, MappingError> {
        self.active_section
            .as_deref()
            .ok_or(MappingError::NoActiveSection)
    }

    fn require_column(&self, section: &str, column: &str) -> Result<usize, MappingError> {
        self.position(section, column)
            .ok_or_else(|| MappingError::UnknownColumn {
                section: section.to_string(),
                column: column.to_string(),
            })
    }
}

/// Summary of one mapping set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingSummary {
    pub section: String,
    /// Observed columns.
    pub columns: usize,
    /// Columns with a target, excluded ones not counted.
    pub mapped: usize,
    pub excluded: usize,
    /// Required fields of the section.
    pub required_total: usize,
    pub required_mapped: usize,
    /// Required field ids no column targets yet.
    pub missing_required: Vec<String>,
}

impl MappingSummary {
    pub fn is_complete(&self) -> bool {
        self.missing_required.is_empty()
    }
}
