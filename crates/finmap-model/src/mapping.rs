//! Column mapping types for source-column-to-field assignment.

use serde::{Deserialize, Serialize};

use crate::{Field, FieldType};

/// Assignment of one source column to a canonical field.
///
/// `mapped_to == None` means unmapped, which is always a legal final state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Header text as it appears in the source sheet.
    pub source_column: String,
    /// Target field id (`section.key`), if any.
    pub mapped_to: Option<String>,
    pub data_type: FieldType,
    pub is_required: bool,
    /// Section whose mapping set this column belongs to.
    pub section: String,
    /// Excluded columns are skipped by automatic resolution and extraction.
    #[serde(default)]
    pub excluded: bool,
}

impl ColumnMapping {
    pub fn new(
        section: impl Into<String>,
        source_column: impl Into<String>,
        data_type: FieldType,
    ) -> Self {
        Self {
            source_column: source_column.into(),
            mapped_to: None,
            data_type,
            is_required: false,
            section: section.into(),
            excluded: false,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped_to.is_some()
    }

    /// Points this column at `field`, taking over its type and required flag.
    pub fn assign(&mut self, field: &Field) {
        self.mapped_to = Some(field.id.clone());
        self.data_type = field.data_type;
        self.is_required = field.is_required;
    }

    /// Drops the target. The observed data type is kept.
    pub fn clear(&mut self) {
        self.mapped_to = None;
        self.is_required = false;
    }

    /// True when this column targets `field_id`.
    pub fn targets(&self, field_id: &str) -> bool {
        self.mapped_to.as_deref() == Some(field_id)
    }
}
