#![deny(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use finmap_model::{CellValue, Field, FieldType, qualified_id};
use serde::Serialize;

use crate::error::CatalogError;
use crate::hash::sha256_hex;
use crate::manifest::{
    CATALOG_SCHEMA, CATALOG_SCHEMA_VERSION, CatalogHeader, CatalogManifest, FieldEntry,
    MemberEntry, SectionEntry, SectionKindName,
};
use crate::synonyms::SynonymCatalog;

const BUSINESS_INPUT_TOML: &str = include_str!("../catalog/business_input.toml");
const FINANCIAL_STATEMENTS_TOML: &str = include_str!("../catalog/financial_statements.toml");

/// How a section's records end up in the business input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// One record per row, kept as a sequence under the section key.
    Repeatable,
    /// The first record's fields are lifted to the top level.
    Singleton,
    /// The first record is reshaped into one object under `target`.
    Nested {
        target: String,
        members: Vec<NestedMember>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedMember {
    pub name: String,
    /// Field key within the owning section.
    pub field: String,
    pub default: CellValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub id: String,
    pub label: String,
    pub kind: SectionKind,
}

/// A validated field and synonym catalog.
///
/// Field order is significant: the resolver visits candidates in catalog
/// order and the earliest candidate wins exact score ties.
#[derive(Debug, Clone)]
pub struct Catalog {
    name: String,
    version: String,
    description: Option<String>,
    sections: Vec<Section>,
    fields: Vec<Field>,
    synonyms: SynonymCatalog,
    field_index: BTreeMap<String, usize>,
    fingerprint: String,
}

#[derive(Serialize)]
struct FingerprintView<'a> {
    name: &'a str,
    version: &'a str,
    sections: &'a [Section],
    fields: &'a [Field],
    synonyms: &'a SynonymCatalog,
}

impl Catalog {
    /// The bundled business-input catalog.
    pub fn business_input() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUSINESS_INPUT_TOML, "builtin:business_input.toml")
    }

    /// The bundled historical financial-statements catalog.
    pub fn financial_statements() -> Result<Self, CatalogError> {
        Self::from_toml_str(FINANCIAL_STATEMENTS_TOML, "builtin:financial_statements.toml")
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        Self::from_toml_str(&contents, &path.display().to_string())
    }

    /// Parses and validates a catalog document. `origin` names the source in
    /// error messages.
    pub fn from_toml_str(source: &str, origin: &str) -> Result<Self, CatalogError> {
        let manifest: CatalogManifest =
            toml::from_str(source).map_err(|e| CatalogError::Toml {
                origin: origin.to_string(),
                source: e,
            })?;
        let catalog = Self::from_manifest(manifest)?;
        tracing::debug!(
            origin,
            catalog = %catalog.name,
            version = %catalog.version,
            sections = catalog.sections.len(),
            fields = catalog.fields.len(),
            "loaded field catalog"
        );
        Ok(catalog)
    }

    pub fn from_manifest(manifest: CatalogManifest) -> Result<Self, CatalogError> {
        validate_header(&manifest.catalog)?;

        let mut section_ids: BTreeSet<String> = BTreeSet::new();
        for entry in &manifest.sections {
            let id = entry.id.trim();
            if id.is_empty() || id.contains('.') || id != entry.id {
                return Err(CatalogError::InvalidSectionId {
                    section: entry.id.clone(),
                });
            }
            if !section_ids.insert(entry.id.clone()) {
                return Err(CatalogError::DuplicateSection {
                    section: entry.id.clone(),
                });
            }
        }

        let mut fields: Vec<Field> = Vec::with_capacity(manifest.fields.len());
        let mut field_index: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &manifest.fields {
            let field = build_field(entry, &section_ids)?;
            if field_index.contains_key(&field.id) {
                return Err(CatalogError::DuplicateField { field: field.id });
            }
            field_index.insert(field.id.clone(), fields.len());
            fields.push(field);
        }

        let lookup_keys: BTreeSet<&str> = fields.iter().map(Field::lookup_key).collect();
        for key in manifest.synonyms.keys() {
            if !lookup_keys.contains(key.as_str()) {
                return Err(CatalogError::OrphanSynonyms { key: key.clone() });
            }
        }

        let sections = manifest
            .sections
            .iter()
            .map(|entry| build_section(entry, &fields, &field_index))
            .collect::<Result<Vec<_>, _>>()?;

        let CatalogHeader {
            name,
            version,
            description,
            ..
        } = manifest.catalog;
        let synonyms = SynonymCatalog::from(manifest.synonyms);

        let fingerprint = sha256_hex(&serde_json::to_vec(&FingerprintView {
            name: &name,
            version: &version,
            sections: &sections,
            fields: &fields,
            synonyms: &synonyms,
        })?);

        Ok(Self {
            name,
            version,
            description,
            sections,
            fields,
            synonyms,
            field_index,
            fingerprint,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// SHA-256 over the validated content, identifying the exact catalog a
    /// mapping state was built against.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// All fields in catalog order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.field_index.get(id).map(|&idx| &self.fields[idx])
    }

    /// Fields of one section, in catalog order.
    pub fn fields_in<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |f| f.section == section)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn synonyms(&self) -> &SynonymCatalog {
        &self.synonyms
    }

    /// Alias phrases for `field`, looked up by its exact lookup key.
    pub fn aliases_for(&self, field: &Field) -> &[String] {
        self.synonyms.aliases(field.lookup_key())
    }
}

fn validate_header(header: &CatalogHeader) -> Result<(), CatalogError> {
    if header.schema != CATALOG_SCHEMA {
        return Err(CatalogError::UnsupportedSchema {
            schema: header.schema.clone(),
        });
    }
    if header.schema_version != CATALOG_SCHEMA_VERSION {
        return Err(CatalogError::UnsupportedVersion {
            version: header.schema_version,
        });
    }
    Ok(())
}

fn build_field(entry: &FieldEntry, sections: &BTreeSet<String>) -> Result<Field, CatalogError> {
    if !sections.contains(&entry.section) {
        return Err(CatalogError::UnknownSection {
            field: qualified_id(&entry.section, &entry.key),
            section: entry.section.clone(),
        });
    }
    let key = entry.key.trim();
    if key.is_empty() || key.contains('.') || key != entry.key {
        return Err(CatalogError::InvalidFieldKey {
            section: entry.section.clone(),
            key: entry.key.clone(),
        });
    }
    let mut field = Field::new(
        &entry.section,
        &entry.key,
        &entry.display_name,
        entry.data_type,
    )
    .required(entry.required);
    if let Some(synonym_key) = &entry.synonym_key {
        field = field.with_synonym_key(synonym_key);
    }
    Ok(field)
}

fn build_section(
    entry: &SectionEntry,
    fields: &[Field],
    field_index: &BTreeMap<String, usize>,
) -> Result<Section, CatalogError> {
    let invalid = |message: String| CatalogError::InvalidNested {
        section: entry.id.clone(),
        message,
    };

    let kind = match entry.kind {
        SectionKindName::Repeatable | SectionKindName::Singleton => {
            if entry.target.is_some() || !entry.members.is_empty() {
                return Err(invalid(
                    "target and members are only valid on nested sections".to_string(),
                ));
            }
            if entry.kind == SectionKindName::Singleton {
                SectionKind::Singleton
            } else {
                SectionKind::Repeatable
            }
        }
        SectionKindName::Nested => {
            let target = match entry.target.as_deref().map(str::trim) {
                Some(target) if !target.is_empty() => target.to_string(),
                _ => return Err(invalid("missing target key".to_string())),
            };
            if entry.members.is_empty() {
                return Err(invalid("no members declared".to_string()));
            }
            let mut names = BTreeSet::new();
            let mut members = Vec::with_capacity(entry.members.len());
            for member in &entry.members {
                if !names.insert(member.name.as_str()) {
                    return Err(invalid(format!("duplicate member {}", member.name)));
                }
                let id = qualified_id(&entry.id, &member.field);
                let Some(&idx) = field_index.get(&id) else {
                    return Err(invalid(format!(
                        "member {} references unknown field {id}",
                        member.name
                    )));
                };
                check_default(member, fields[idx].data_type).map_err(invalid)?;
                members.push(NestedMember {
                    name: member.name.clone(),
                    field: member.field.clone(),
                    default: member.default.clone(),
                });
            }
            SectionKind::Nested { target, members }
        }
    };

    Ok(Section {
        id: entry.id.clone(),
        label: entry.label.clone().unwrap_or_else(|| entry.id.clone()),
        kind,
    })
}

fn check_default(member: &MemberEntry, data_type: FieldType) -> Result<(), String> {
    let ok = match &member.default {
        CellValue::Empty => true,
        CellValue::Number(_) => data_type.is_numeric(),
        CellValue::Bool(_) => data_type == FieldType::Boolean,
        CellValue::Text(_) => data_type == FieldType::Text,
    };
    if ok {
        Ok(())
    } else {
        Err(format!(
            "default for member {} does not fit {data_type} field {}",
            member.name, member.field
        ))
    }
}

/// Assembles a catalog in code. Mostly useful for tests and embedders that
/// generate their schema.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    manifest: CatalogManifest,
}

impl CatalogBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            manifest: CatalogManifest {
                catalog: CatalogHeader {
                    schema: CATALOG_SCHEMA.to_string(),
                    schema_version: CATALOG_SCHEMA_VERSION,
                    name: name.into(),
                    version: "0".to_string(),
                    description: None,
                },
                sections: Vec::new(),
                fields: Vec::new(),
                synonyms: BTreeMap::new(),
            },
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.manifest.catalog.version = version.into();
        self
    }

    pub fn repeatable(self, id: impl Into<String>) -> Self {
        self.section(id, SectionKindName::Repeatable)
    }

    pub fn singleton(self, id: impl Into<String>) -> Self {
        self.section(id, SectionKindName::Singleton)
    }

    /// Adds a nested section. Members are `(name, field key, default)`.
    pub fn nested<'a>(
        mut self,
        id: impl Into<String>,
        target: impl Into<String>,
        members: impl IntoIterator<Item = (&'a str, &'a str, CellValue)>,
    ) -> Self {
        self.manifest.sections.push(SectionEntry {
            id: id.into(),
            label: None,
            kind: SectionKindName::Nested,
            target: Some(target.into()),
            members: members
                .into_iter()
                .map(|(name, field, default)| MemberEntry {
                    name: name.to_string(),
                    field: field.to_string(),
                    default,
                })
                .collect(),
        });
        self
    }

    fn section(mut self, id: impl Into<String>, kind: SectionKindName) -> Self {
        self.manifest.sections.push(SectionEntry {
            id: id.into(),
            label: None,
            kind,
            target: None,
            members: Vec::new(),
        });
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.manifest.fields.push(FieldEntry {
            section: field.section,
            key: field.key,
            display_name: field.display_name,
            data_type: field.data_type,
            required: field.is_required,
            synonym_key: field.synonym_key,
        });
        self
    }

    pub fn synonyms<I, S>(mut self, key: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest
            .synonyms
            .entry(key.into())
            .or_default()
            .extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<Catalog, CatalogError> {
        Catalog::from_manifest(self.manifest)
    }
}
