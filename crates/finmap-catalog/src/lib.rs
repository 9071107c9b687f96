#![deny(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod synonyms;

pub use crate::catalog::{Catalog, CatalogBuilder, NestedMember, Section, SectionKind};
pub use crate::error::CatalogError;
pub use crate::synonyms::SynonymCatalog;
