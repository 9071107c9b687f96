//! Section flattening into the business-input structure.

use std::collections::BTreeMap;

use finmap_catalog::{Catalog, NestedMember, SectionKind};
use finmap_model::{BusinessInput, CanonicalRecord, CellValue};
use tracing::debug;

/// Reshapes per-section records according to each catalog section's kind.
///
/// - singleton: the first record's keys move to the top level; the section
///   key is always removed, extra records are ignored;
/// - nested: when the section key is present, even with no records, one
///   object is built under the section's target from the first record, with
///   the member defaults filling anything missing;
/// - repeatable: the records stay as a sequence under the section key.
///
/// Sections unknown to the catalog are kept as record sequences.
pub fn flatten(catalog: &Catalog, mut records: BTreeMap<String, Vec<CanonicalRecord>>) -> BusinessInput {
    let mut input = BusinessInput::new();

    for section in catalog.sections() {
        match &section.kind {
            SectionKind::Repeatable => {}
            SectionKind::Singleton => {
                let Some(section_records) = records.remove(&section.id) else {
                    continue;
                };
                if section_records.len() > 1 {
                    debug!(
                        section = %section.id,
                        ignored = section_records.len() - 1,
                        "singleton section has extra records"
                    );
                }
                if let Some(first) = section_records.into_iter().next() {
                    input.scalars.extend(first);
                }
            }
            SectionKind::Nested { target, members } => {
                let Some(section_records) = records.remove(&section.id) else {
                    continue;
                };
                let nested = nested_object(section_records.first(), members);
                debug!(section = %section.id, %target, "built nested object");
                input.nested.insert(target.clone(), nested);
            }
        }
    }

    input.sections = records;
    input
}

fn nested_object(
    first: Option<&CanonicalRecord>,
    members: &[NestedMember],
) -> BTreeMap<String, CellValue> {
    members
        .iter()
        .map(|member| {
            let value = first
                .and_then(|record| record.get(&member.field))
                .filter(|value| **value != CellValue::Empty)
                .cloned()
                .unwrap_or_else(|| member.default.clone());
            (member.name.clone(), value)
        })
        .collect()
}
