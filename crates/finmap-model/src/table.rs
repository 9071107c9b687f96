use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FieldType;

/// A scalar spreadsheet cell, or a coerced canonical value.
///
/// Serialized untagged so records read as plain JSON (`"Coaching"`, `500.0`,
/// `true`, `null`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// True for `Empty` and for whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Best-guess field type for a freshly observed column.
    ///
    /// Numbers and numeric-looking text are treated as currency, text
    /// containing `%` as a percentage.
    pub fn infer_type(&self) -> FieldType {
        match self {
            CellValue::Bool(_) => FieldType::Boolean,
            CellValue::Number(_) => FieldType::Currency,
            CellValue::Text(s) if s.contains('%') => FieldType::Percentage,
            CellValue::Text(s) if s.trim().parse::<f64>().is_ok() => FieldType::Currency,
            CellValue::Text(_) | CellValue::Empty => FieldType::Text,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// One parsed spreadsheet row, tagged with its originating sheet/section.
///
/// Cells keep sheet column order. They serialize as a JSON object, and
/// deserializing reads the entries in source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRow {
    pub tag: String,
    #[serde(with = "ordered_cells")]
    pub cells: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            cells: Vec::new(),
        }
    }

    /// Appends a cell, or replaces the value of an existing column in place.
    pub fn with_cell(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(column.into(), value.into());
        self
    }

    pub fn set(&mut self, column: String, value: CellValue) {
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find_map(|(c, value)| (c == column).then_some(value))
    }

    /// Column names in sheet order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    /// Whether this row belongs to `section`.
    ///
    /// A row matches when its tag equals the section name (trimmed, ASCII
    /// case-insensitive) or equals the sheet explicitly assigned to it.
    pub fn matches_section(&self, section: &str, assigned_sheet: Option<&str>) -> bool {
        let tag = self.tag.trim();
        if tag.eq_ignore_ascii_case(section.trim()) {
            return true;
        }
        assigned_sheet.is_some_and(|sheet| tag == sheet.trim())
    }
}

mod ordered_cells {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};

    use super::CellValue;

    pub fn serialize<S: Serializer>(
        cells: &[(String, CellValue)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(cells.iter().map(|(column, value)| (column, value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, CellValue)>, D::Error> {
        deserializer.deserialize_map(CellsVisitor)
    }

    struct CellsVisitor;

    impl<'de> Visitor<'de> for CellsVisitor {
        type Value = Vec<(String, CellValue)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of column name to cell value")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut cells: Self::Value = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((column, value)) = map.next_entry::<String, CellValue>()? {
                match cells.iter_mut().find(|(c, _)| *c == column) {
                    Some((_, slot)) => *slot = value,
                    None => cells.push((column, value)),
                }
            }
            Ok(cells)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_types_from_cells() {
        assert_eq!(CellValue::from(12.5).infer_type(), FieldType::Currency);
        assert_eq!(CellValue::from("12.5").infer_type(), FieldType::Currency);
        assert_eq!(CellValue::from("5%").infer_type(), FieldType::Percentage);
        assert_eq!(CellValue::from("Coaching").infer_type(), FieldType::Text);
        assert_eq!(CellValue::from(true).infer_type(), FieldType::Boolean);
        assert_eq!(CellValue::Empty.infer_type(), FieldType::Text);
    }

    #[test]
    fn row_matches_section_by_tag_or_sheet() {
        let row = RawRow::new(" Services ").with_cell("Service Name", "Coaching");
        assert!(row.matches_section("services", None));
        assert!(!row.matches_section("expenses", None));

        let row = RawRow::new("Sheet1");
        assert!(row.matches_section("expenses", Some("Sheet1")));
        assert!(!row.matches_section("expenses", Some("Sheet2")));
    }

    #[test]
    fn cells_keep_sheet_order() {
        let row = RawRow::new("services")
            .with_cell("Year", 2024.0)
            .with_cell("Service Name", "Coaching")
            .with_cell("Amount", 500.0)
            .with_cell("Year", 2025.0);
        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, ["Year", "Service Name", "Amount"]);
        assert_eq!(row.get("Year"), Some(&CellValue::Number(2025.0)));
        assert_eq!(row.get("Missing"), None);
    }

    #[test]
    fn blank_cells() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::from("   ").is_blank());
        assert!(!CellValue::from(0.0).is_blank());
    }
}
