//! Tests for row extraction and coercion reporting.

use finmap_catalog::Catalog;
use finmap_map::{MappingEngine, MappingState};
use finmap_model::{CellValue, MappingOptions, NumberFormat, RawRow};
use finmap_transform::{CoercionStatus, extract, extract_with};

fn business() -> Catalog {
    Catalog::business_input().expect("builtin catalog")
}

fn coaching() -> RawRow {
    RawRow::new("services")
        .with_cell("Service Name", "Coaching")
        .with_cell("Price/Client", "500")
        .with_cell("Clients/Month", "10")
        .with_cell("Growth %", "5")
        .with_cell("Delivery Cost", "100")
        .with_cell("Year", "2024")
}

/// Observes and auto-maps the services section, presets included.
fn mapped_services(catalog: &Catalog, rows: &[RawRow]) -> MappingState {
    let options = MappingOptions::default();
    let engine = MappingEngine::new(catalog.clone(), options.clone());
    let mut state = MappingState::for_catalog(catalog, options.duplicate_policy);
    state.select_section("services", rows);
    state.apply_presets(&options.header_presets, catalog);
    state.auto_map(&engine);
    state
}

#[test]
fn service_row_becomes_typed_record() {
    let catalog = business();
    let rows = vec![coaching()];
    let state = mapped_services(&catalog, &rows);

    let extraction = extract(&state, &catalog, &rows);
    let records = extraction.records("services");
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record["name"], CellValue::text("Coaching"));
    assert_eq!(record["price"], CellValue::Number(500.0));
    assert_eq!(record["clients"], CellValue::Number(10.0));
    assert_eq!(record["growth"], CellValue::Number(5.0));
    assert_eq!(record["cost"], CellValue::Number(100.0));
    assert!(!record.contains_key("Year"));
    assert_eq!(record.len(), 5);
    assert!(!extraction.has_issues());
}

#[test]
fn coercion_fallbacks_are_reported() {
    let catalog = business();
    let rows = vec![
        coaching(),
        RawRow::new("Services")
            .with_cell("Service Name", "Audit")
            .with_cell("Price/Client", "$1,200")
            .with_cell("Clients/Month", "lots")
            .with_cell("Growth %", "7%"),
    ];
    let state = mapped_services(&catalog, &rows);
    let extraction = extract(&state, &catalog, &rows);

    let audit = &extraction.records("services")[1];
    // "$1,200" has no leading number.
    assert_eq!(audit["price"], CellValue::Number(0.0));
    assert_eq!(audit["clients"], CellValue::Number(0.0));
    assert_eq!(audit["growth"], CellValue::Number(7.0));
    // Absent cells stay absent.
    assert!(!audit.contains_key("cost"));

    // Issues follow sheet column order.
    let issues: Vec<(&str, CoercionStatus)> = extraction
        .issues_in("services")
        .map(|issue| (issue.field.as_str(), issue.status))
        .collect();
    assert_eq!(
        issues,
        [
            ("services.price", CoercionStatus::Defaulted),
            ("services.clients", CoercionStatus::Defaulted),
            ("services.growth", CoercionStatus::Lenient),
        ]
    );
    let defaulted = &extraction.issues[1];
    assert_eq!(defaulted.row, 1);
    assert_eq!(defaulted.column, "Clients/Month");
    assert_eq!(defaulted.raw, CellValue::text("lots"));
}

#[test]
fn formatted_numbers_are_read_when_enabled() {
    let catalog = business();
    let rows = vec![
        RawRow::new("services")
            .with_cell("Service Name", "Audit")
            .with_cell("Price/Client", "$1,200")
            .with_cell("Delivery Cost", "1,050.50"),
    ];
    let state = mapped_services(&catalog, &rows);

    let plain = extract(&state, &catalog, &rows);
    let record = &plain.records("services")[0];
    assert_eq!(record["price"], CellValue::Number(0.0));
    assert_eq!(record["cost"], CellValue::Number(1.0));

    let formatted = extract_with(&state, &catalog, &rows, NumberFormat::Formatted);
    let record = &formatted.records("services")[0];
    assert_eq!(record["price"], CellValue::Number(1200.0));
    assert_eq!(record["cost"], CellValue::Number(1050.5));
    assert!(
        formatted
            .issues
            .iter()
            .all(|issue| issue.status == CoercionStatus::Lenient)
    );
}

#[test]
fn unmatched_rows_are_dropped_and_unmapped_sections_skipped() {
    let catalog = business();
    let rows = vec![
        coaching(),
        RawRow::new("expenses").with_cell("Whatever", "x"),
        RawRow::new("Scratch").with_cell("Service Name", "Ignored"),
    ];
    let mut state = mapped_services(&catalog, &rows);
    state.select_section("expenses", &rows);

    let extraction = extract(&state, &catalog, &rows);
    assert_eq!(extraction.records.len(), 1);
    assert!(extraction.records.contains_key("services"));
    assert_eq!(extraction.dropped_rows, 2);
}

#[test]
fn excluded_and_unmapped_columns_are_ignored() {
    let catalog = business();
    let rows = vec![coaching()];
    let mut state = mapped_services(&catalog, &rows);
    state.set_excluded("Delivery Cost", true).expect("exclude");
    state
        .set_target("Growth %", None, &catalog)
        .expect("clear growth");

    let extraction = extract(&state, &catalog, &rows);
    let record = &extraction.records("services")[0];
    assert!(!record.contains_key("cost"));
    assert!(!record.contains_key("growth"));
    assert_eq!(record.len(), 3);
}

#[test]
fn later_column_wins_a_shared_key() {
    let catalog = business();
    let rows = vec![
        RawRow::new("services")
            .with_cell("Name", "First")
            .with_cell("Service", "Second"),
    ];
    let mut state = MappingState::default();
    state.select_section("services", &rows);
    for column in ["Name", "Service"] {
        state
            .set_target(column, Some("services.name"), &catalog)
            .expect("assign");
    }

    let extraction = extract(&state, &catalog, &rows);
    assert_eq!(extraction.records("services")[0]["name"], CellValue::text("Second"));
}

#[test]
fn later_column_follows_sheet_order_not_header_name() {
    let catalog = business();
    let rows = vec![
        RawRow::new("services")
            .with_cell("Title", "From title")
            .with_cell("Name", "From name"),
    ];
    let mut state = MappingState::default();
    state.select_section("services", &rows);
    for column in ["Title", "Name"] {
        state
            .set_target(column, Some("services.name"), &catalog)
            .expect("assign");
    }

    let extraction = extract(&state, &catalog, &rows);
    assert_eq!(
        extraction.records("services")[0]["name"],
        CellValue::text("From name")
    );
}

#[test]
fn rows_from_assigned_sheet_are_extracted() {
    let catalog = business();
    let rows = vec![
        RawRow::new("Sheet1")
            .with_cell("Category", "Rent")
            .with_cell("Amount", 1500.0),
    ];
    let mut state = MappingState::default();
    state.assign_sheet("expenses", "Sheet1");
    state.select_section("expenses", &rows);
    state
        .set_target("Category", Some("expenses.category"), &catalog)
        .expect("category");
    state
        .set_target("Amount", Some("expenses.amount"), &catalog)
        .expect("amount");
    let before = state.clone();

    let extraction = extract(&state, &catalog, &rows);
    let record = &extraction.records("expenses")[0];
    assert_eq!(record["category"], CellValue::text("Rent"));
    assert_eq!(record["amount"], CellValue::Number(1500.0));
    assert_eq!(state, before);
}

#[test]
fn empty_input_extracts_nothing() {
    let catalog = business();
    let state = MappingState::default();
    let extraction = extract(&state, &catalog, &[]);
    assert!(extraction.records.is_empty());
    assert_eq!(extraction.dropped_rows, 0);
}
