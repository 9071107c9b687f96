//! Tests for section flattening.

use std::collections::BTreeMap;

use finmap_catalog::Catalog;
use finmap_model::{CanonicalRecord, CellValue};
use finmap_transform::flatten;

fn business() -> Catalog {
    Catalog::business_input().expect("builtin catalog")
}

fn record(pairs: &[(&str, CellValue)]) -> CanonicalRecord {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn sections(entries: Vec<(&str, Vec<CanonicalRecord>)>) -> BTreeMap<String, Vec<CanonicalRecord>> {
    entries
        .into_iter()
        .map(|(section, records)| (section.to_string(), records))
        .collect()
}

#[test]
fn singleton_takes_first_record_only() {
    let input = flatten(
        &business(),
        sections(vec![(
            "assumptions",
            vec![
                record(&[
                    ("taxRate", CellValue::Number(21.0)),
                    ("forecast", CellValue::Number(5.0)),
                ]),
                record(&[("taxRate", CellValue::Number(30.0))]),
            ],
        )]),
    );

    assert_eq!(input.scalar("taxRate"), Some(&CellValue::Number(21.0)));
    assert_eq!(input.scalar("forecast"), Some(&CellValue::Number(5.0)));
    assert!(!input.contains_key("assumptions"));
    assert_eq!(input.len(), 2);
}

#[test]
fn empty_singleton_is_removed() {
    let input = flatten(&business(), sections(vec![("wacc", Vec::new())]));
    assert!(input.is_empty());
}

#[test]
fn nested_section_without_records_gets_defaults() {
    let input = flatten(
        &business(),
        sections(vec![("global_interest_rates", Vec::new())]),
    );

    let rates = input.nested("globalInterestRates").expect("nested rates");
    assert_eq!(rates["shortTerm"], CellValue::Number(5.0));
    assert_eq!(rates["longTerm"], CellValue::Number(6.0));
    assert_eq!(rates["investment"], CellValue::Number(4.0));
    assert_eq!(rates["useForLoans"], CellValue::Bool(false));
    assert_eq!(rates.len(), 4);
    assert!(!input.contains_key("global_interest_rates"));
}

#[test]
fn nested_section_uses_first_record() {
    let input = flatten(
        &business(),
        sections(vec![(
            "global_interest_rates",
            vec![
                record(&[
                    ("shortTermInterestRate", CellValue::Number(3.5)),
                    ("useGlobalRatesForLoans", CellValue::Bool(true)),
                ]),
                record(&[("shortTermInterestRate", CellValue::Number(9.0))]),
            ],
        )]),
    );

    let rates = input.nested("globalInterestRates").expect("nested rates");
    assert_eq!(rates["shortTerm"], CellValue::Number(3.5));
    assert_eq!(rates["longTerm"], CellValue::Number(6.0));
    assert_eq!(rates["useForLoans"], CellValue::Bool(true));
}

#[test]
fn absent_nested_section_builds_nothing() {
    let input = flatten(&business(), BTreeMap::new());
    assert!(input.nested("globalInterestRates").is_none());
    assert!(input.is_empty());
}

#[test]
fn repeatable_sections_keep_every_record() {
    let services = vec![
        record(&[("name", CellValue::text("Coaching"))]),
        record(&[("name", CellValue::text("Audit"))]),
    ];
    let input = flatten(&business(), sections(vec![("services", services.clone())]));
    assert_eq!(input.section("services"), Some(services.as_slice()));
}

#[test]
fn business_input_serializes_flat() {
    let input = flatten(
        &business(),
        sections(vec![
            (
                "services",
                vec![record(&[
                    ("name", CellValue::text("Coaching")),
                    ("price", CellValue::Number(500.0)),
                ])],
            ),
            (
                "assumptions",
                vec![record(&[("taxRate", CellValue::Number(21.0))])],
            ),
            ("global_interest_rates", Vec::new()),
        ]),
    );

    let json = serde_json::to_value(&input).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "taxRate": 21.0,
            "globalInterestRates": {
                "shortTerm": 5.0,
                "longTerm": 6.0,
                "investment": 4.0,
                "useForLoans": false
            },
            "services": [ { "name": "Coaching", "price": 500.0 } ]
        })
    );
}
