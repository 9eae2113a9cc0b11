//! Schema catalog for sqlscope
//!
//! The catalog is a registry of schemas, tables, columns and unique
//! constraints. Lookups never create entries; population operations create
//! the enclosing schema and table on demand. Every identifier argument is
//! normalized with [`normalize_identifier`] before it is stored or compared.
//!
//! Catalogs are plain values: clone one per independent analysis.

mod catalog;
mod column;
mod constraint;
mod document;
mod identifier;
mod table;

pub use catalog::{Catalog, Schema, CTE_SCHEMA};
pub use column::{Column, ForeignKey};
pub use constraint::{ConstraintKind, UniqueConstraint, UniqueConstraintColumn};
pub use document::CATALOG_DOCUMENT_VERSION;
pub use identifier::{is_quoted, normalize_identifier};
pub use table::Table;
