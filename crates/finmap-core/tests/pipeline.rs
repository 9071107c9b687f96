//! Integration tests for the import pipeline.

use std::collections::BTreeMap;

use finmap_catalog::{Catalog, CatalogBuilder};
use finmap_core::{ImportInput, build_input, prepare, reconcile};
use finmap_model::{CandidateScope, CellValue, Field, FieldType, MappingOptions, RawRow};

fn business() -> Catalog {
    Catalog::business_input().expect("builtin catalog")
}

fn workbook() -> Vec<RawRow> {
    vec![
        RawRow::new("services")
            .with_cell("Service Name", "Coaching")
            .with_cell("Price/Client", "500")
            .with_cell("Clients/Month", "10")
            .with_cell("Growth %", "5")
            .with_cell("Delivery Cost", "100")
            .with_cell("Year", "2024"),
        RawRow::new("assumptions")
            .with_cell("Tax Rate %", 21.0)
            .with_cell("Forecast Horizon", 5.0),
    ]
}

fn import_input<'a>(
    catalog: &'a Catalog,
    options: &'a MappingOptions,
    rows: &'a [RawRow],
) -> ImportInput<'a> {
    ImportInput {
        catalog,
        options,
        rows,
        sheet_names: &[],
    }
}

#[test]
fn workbook_reconciles_into_business_input() {
    let catalog = business();
    let options = MappingOptions::default();
    let rows = workbook();

    let outcome = reconcile(&import_input(&catalog, &options, &rows), None).expect("reconcile");

    let json = serde_json::to_value(&outcome.input).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "taxRate": 21.0,
            "forecast": 5.0,
            "services": [{
                "name": "Coaching",
                "price": 500.0,
                "clients": 10.0,
                "growth": 5.0,
                "cost": 100.0
            }]
        })
    );
    assert!(outcome.state.is_built_against(&catalog));

    let summary = outcome.summary();
    assert_eq!(summary.columns, 8);
    assert_eq!(summary.mapped, 7);
    assert_eq!(summary.temporal, 1);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.coercion_issues, 0);
    assert_eq!(summary.dropped_rows, 0);
}

#[test]
fn without_presets_clients_column_is_left_unmapped() {
    let catalog = business();
    let options = MappingOptions::default().with_header_presets(BTreeMap::new());
    let rows = workbook();

    let outcome = reconcile(&import_input(&catalog, &options, &rows), None).expect("reconcile");
    let services = outcome.input.section("services").expect("services");
    let keys: Vec<&str> = services[0].keys().map(String::as_str).collect();
    assert_eq!(keys, ["cost", "growth", "name", "price"]);
    assert!(
        outcome
            .state
            .mapping("services", "Clients/Month")
            .is_some_and(|m| m.mapped_to.is_none())
    );
}

#[test]
fn reviewed_edits_survive_a_second_import() {
    let catalog = business();
    let options = MappingOptions::default().with_header_presets(BTreeMap::new());
    let rows = workbook();
    let input = import_input(&catalog, &options, &rows);

    let mut state = prepare(&input, None).expect("prepare").state;
    state.select_section("services", &rows);
    state
        .set_target("Clients/Month", Some("services.clients"), &catalog)
        .expect("manual edit");
    state.set_excluded("Delivery Cost", true).expect("exclude");

    let (business_input, _) = build_input(&input, &state);
    let record = &business_input.section("services").expect("services")[0];
    assert_eq!(record["clients"], CellValue::Number(10.0));
    assert!(!record.contains_key("cost"));

    let again = reconcile(&input, Some(state.clone())).expect("reconcile");
    assert_eq!(again.state.mappings(), state.mappings());
    assert_eq!(again.input, business_input);
}

#[test]
fn stale_targets_are_cleared_when_the_catalog_changes() {
    let legacy = CatalogBuilder::new("legacy")
        .repeatable("services")
        .field(Field::new("services", "title", "Service Name", FieldType::Text))
        .build()
        .expect("legacy catalog");
    let options = MappingOptions::default();
    let rows = workbook();

    let prior = prepare(&import_input(&legacy, &options, &rows), None)
        .expect("legacy prepare")
        .state;
    assert_eq!(
        prior
            .mapping("services", "Service Name")
            .and_then(|m| m.mapped_to.as_deref()),
        Some("services.title")
    );

    let catalog = business();
    let prepared = prepare(&import_input(&catalog, &options, &rows), Some(prior)).expect("prepare");
    assert_eq!(prepared.stale_cleared, 1);
    assert!(prepared.state.is_built_against(&catalog));
    assert_eq!(
        prepared
            .state
            .mapping("services", "Service Name")
            .and_then(|m| m.mapped_to.as_deref()),
        Some("services.name")
    );
}

#[test]
fn sheets_are_matched_by_name() {
    let catalog = business();
    // "Amount" is also a services synonym; keep candidates within the section.
    let options = MappingOptions::default().with_candidate_scope(CandidateScope::Section);
    let rows = vec![
        RawRow::new("Q3 Expenses")
            .with_cell("Category", "Rent")
            .with_cell("Amount", "1,500"),
    ];
    let sheet_names = vec!["Q3 Expenses".to_string()];
    let input = ImportInput {
        catalog: &catalog,
        options: &options,
        rows: &rows,
        sheet_names: &sheet_names,
    };

    let prepared = prepare(&input, None).expect("prepare");
    assert_eq!(prepared.sheets_assigned, 1);
    assert_eq!(prepared.state.sheet_for("expenses"), Some("Q3 Expenses"));

    let outcome = reconcile(&input, None).expect("reconcile");
    let expenses = outcome.input.section("expenses").expect("expenses");
    assert_eq!(expenses[0]["category"], CellValue::text("Rent"));
    assert_eq!(expenses[0]["amount"], CellValue::Number(1500.0));
    assert_eq!(outcome.extraction.issues.len(), 1);
}

#[test]
fn invalid_options_are_rejected() {
    let catalog = business();
    let options = MappingOptions::default().with_threshold(1.5);
    let rows = workbook();
    let err = reconcile(&import_input(&catalog, &options, &rows), None).unwrap_err();
    assert!(format!("{err:#}").contains("validate mapping options"));
}

#[test]
fn empty_workbook_gives_empty_input() {
    let catalog = business();
    let options = MappingOptions::default();
    let outcome = reconcile(&import_input(&catalog, &options, &[]), None).expect("reconcile");
    assert!(outcome.input.is_empty());
    assert_eq!(outcome.summary().columns, 0);
}
