//! Cell coercion by target field type.

use finmap_model::{CellValue, FieldType, NumberFormat};
use serde::Serialize;

use crate::numeric::{Parsed, parse_bool, parse_number};

/// How faithfully a cell survived coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionStatus {
    /// The cell already had the target type, or was a clean literal of it.
    Exact,
    /// Only a leading numeric prefix was usable, as in `"5%"` or `"1,200"`.
    Lenient,
    /// Nothing usable; the type's default (`0` or `false`) was substituted.
    Defaulted,
}

impl CoercionStatus {
    pub fn is_exact(self) -> bool {
        self == CoercionStatus::Exact
    }
}

/// A coerced cell and how it got there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coerced {
    pub value: CellValue,
    pub status: CoercionStatus,
}

impl Coerced {
    fn exact(value: CellValue) -> Self {
        Self {
            value,
            status: CoercionStatus::Exact,
        }
    }

    fn defaulted(value: CellValue) -> Self {
        Self {
            value,
            status: CoercionStatus::Defaulted,
        }
    }
}

/// Coerces `value` for a field of type `data_type`.
///
/// Numeric types (number, currency, percentage) become `Number`, booleans
/// become `Bool`, text passes through untouched. Numeric text is read with
/// [`NumberFormat::Plain`]. Never fails.
pub fn coerce(value: &CellValue, data_type: FieldType) -> Coerced {
    coerce_with(value, data_type, NumberFormat::default())
}

/// [`coerce`] with an explicit reading of numeric text.
pub fn coerce_with(value: &CellValue, data_type: FieldType, format: NumberFormat) -> Coerced {
    match data_type {
        FieldType::Boolean => coerce_bool(value),
        t if t.is_numeric() => coerce_number(value, format),
        _ => Coerced::exact(value.clone()),
    }
}

fn coerce_number(value: &CellValue, format: NumberFormat) -> Coerced {
    match value {
        CellValue::Number(n) if n.is_finite() => Coerced::exact(CellValue::Number(*n)),
        CellValue::Text(text) => match parse_number(text, format) {
            Some(Parsed::Exact(n)) => Coerced::exact(CellValue::Number(n)),
            Some(Parsed::Lenient(n)) => Coerced {
                value: CellValue::Number(n),
                status: CoercionStatus::Lenient,
            },
            None => Coerced::defaulted(CellValue::Number(0.0)),
        },
        CellValue::Number(_) | CellValue::Bool(_) | CellValue::Empty => {
            Coerced::defaulted(CellValue::Number(0.0))
        }
    }
}

fn coerce_bool(value: &CellValue) -> Coerced {
    match value {
        CellValue::Bool(b) => Coerced::exact(CellValue::Bool(*b)),
        CellValue::Number(n) => Coerced::exact(CellValue::Bool(*n != 0.0)),
        CellValue::Text(text) => parse_bool(text).map_or_else(
            || Coerced::defaulted(CellValue::Bool(false)),
            |b| Coerced::exact(CellValue::Bool(b)),
        ),
        CellValue::Empty => Coerced::defaulted(CellValue::Bool(false)),
    }
}
