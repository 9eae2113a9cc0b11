//! Versioned JSON document format for catalogs
//!
//! Document keys are stored names; they are loaded verbatim so that quoted
//! identifiers keep their case across a round trip.

use crate::{Catalog, Column, ConstraintKind, ForeignKey, Table, UniqueConstraint, UniqueConstraintColumn};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlscope_diagnostics::{AnalysisError, Result};
use std::path::Path;

/// Version written by [`Catalog::to_json`] and accepted by [`Catalog::from_json`]
pub const CATALOG_DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDocument {
    version: u32,
    #[serde(default)]
    schemas: IndexMap<String, SchemaDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    tables: IndexMap<String, TableDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableDocument {
    #[serde(default)]
    unique_constraints: Vec<ConstraintDocument>,
    #[serde(default)]
    columns: IndexMap<String, ColumnDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConstraintDocument {
    columns: Vec<UniqueConstraintColumn>,
    kind: ConstraintKind,
}

#[derive(Debug, Serialize, Deserialize)]
struct ColumnDocument {
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    precision: Option<u32>,
    #[serde(default)]
    scale: Option<u32>,
    #[serde(default = "default_nullable")]
    nullable: bool,
    #[serde(default)]
    fk_schema: Option<String>,
    #[serde(default)]
    fk_table: Option<String>,
    #[serde(default)]
    fk_column: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDocument {
    fn from_column(column: &Column) -> Self {
        let fk = column.foreign_key.as_ref();
        Self {
            data_type: column.data_type.clone(),
            precision: column.precision,
            scale: column.scale,
            nullable: column.nullable,
            fk_schema: fk.map(|fk| fk.schema.clone()),
            fk_table: fk.map(|fk| fk.table.clone()),
            fk_column: fk.map(|fk| fk.column.clone()),
        }
    }

    fn into_column(self, name: String) -> Column {
        let foreign_key = match (self.fk_schema, self.fk_table, self.fk_column) {
            (Some(schema), Some(table), Some(column)) => Some(ForeignKey { schema, table, column }),
            _ => None,
        };
        Column {
            name,
            data_type: self.data_type,
            precision: self.precision,
            scale: self.scale,
            nullable: self.nullable,
            foreign_key,
            table_idx: None,
            constant: false,
        }
    }
}

impl Catalog {
    /// Load a catalog from its JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json)
            .map_err(|e| AnalysisError::corrupt_catalog(e.to_string()))?;

        if document.version != CATALOG_DOCUMENT_VERSION {
            return Err(AnalysisError::corrupt_catalog(format!(
                "unsupported document version {} (expected {})",
                document.version, CATALOG_DOCUMENT_VERSION
            )));
        }

        let mut catalog = Catalog::new();
        for (schema_name, schema_doc) in document.schemas {
            let schema = catalog.schema_or_insert(&schema_name);
            for (table_name, table_doc) in schema_doc.tables {
                let mut table = Table::new(table_name);
                for (column_name, column_doc) in table_doc.columns {
                    table.add_column(column_doc.into_column(column_name));
                }
                for constraint in table_doc.unique_constraints {
                    table.add_unique_constraint(UniqueConstraint::new(constraint.columns, constraint.kind));
                }
                schema.insert(table);
            }
        }

        log::debug!(
            "loaded catalog with {} schema(s)",
            catalog.schema_names().count()
        );
        Ok(catalog)
    }

    /// Serialize the catalog to its JSON document
    pub fn to_json(&self) -> Result<String> {
        let document = CatalogDocument {
            version: CATALOG_DOCUMENT_VERSION,
            schemas: self
                .schemas()
                .map(|schema| {
                    let tables = schema
                        .tables()
                        .map(|table| (table.name.clone(), TableDocument::from_table(table)))
                        .collect();
                    (schema.name.clone(), SchemaDocument { tables })
                })
                .collect(),
        };
        serde_json::to_string_pretty(&document).map_err(|e| AnalysisError::corrupt_catalog(e.to_string()))
    }

    /// Load a catalog document from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| AnalysisError::CatalogIo {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Write the catalog document to a file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| AnalysisError::CatalogIo {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl TableDocument {
    fn from_table(table: &Table) -> Self {
        Self {
            unique_constraints: table
                .unique_constraints()
                .iter()
                .map(|c| ConstraintDocument {
                    columns: c.columns.iter().cloned().collect(),
                    kind: c.kind,
                })
                .collect(),
            columns: table
                .columns()
                .iter()
                .map(|c| (c.name.clone(), ColumnDocument::from_column(c)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscope_diagnostics::SQL0300;

    #[test]
    fn test_minimal_document() {
        let catalog = Catalog::from_json(r#"{"version": 1, "schemas": {}}"#).unwrap();
        assert_eq!(catalog.schema_names().count(), 0);
    }

    #[test]
    fn test_column_defaults() {
        let json = r#"{
            "version": 1,
            "schemas": {"public": {"tables": {"store": {
                "columns": {"sid": {"type": "integer"}}
            }}}}
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        let column = catalog.get_column("public", "store", "sid").unwrap();

        assert!(column.nullable);
        assert!(column.foreign_key.is_none());
        assert!(column.precision.is_none());
    }

    #[test]
    fn test_partial_foreign_key_is_dropped() {
        let json = r#"{
            "version": 1,
            "schemas": {"public": {"tables": {"t": {
                "columns": {"x": {"type": "integer", "fk_table": "store"}}
            }}}}
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert!(!catalog.get_column("public", "t", "x").unwrap().is_foreign_key());
    }

    #[test]
    fn test_wrong_version_is_corrupt() {
        let err = Catalog::from_json(r#"{"version": 7, "schemas": {}}"#).unwrap_err();
        assert_eq!(err.code(), SQL0300);
        assert!(err.to_string().contains("version 7"));
    }

    #[test]
    fn test_malformed_json_is_corrupt() {
        let err = Catalog::from_json(r#"{"version": 1, "schemas": ["#).unwrap_err();
        assert!(matches!(err, AnalysisError::CorruptCatalog { .. }));

        let err = Catalog::from_json(r#"{"schemas": {}}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::CorruptCatalog { .. }));
    }
}
