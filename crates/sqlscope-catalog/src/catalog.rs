//! Catalog and schemas

use crate::{normalize_identifier, Column, ConstraintKind, ForeignKey, Table, UniqueConstraint, UniqueConstraintColumn};
use indexmap::IndexMap;
use serde::Serialize;

/// Schema holding the query-local pseudo-tables defined by a WITH clause.
///
/// It shadows the search path for unqualified table names.
pub const CTE_SCHEMA: &str = "";

/// A named collection of tables
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Schema {
    pub name: String,
    tables: IndexMap<String, Table>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: IndexMap::new(),
        }
    }

    /// Look up a table by stored name
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn table_or_insert(&mut self, name: &str) -> &mut Table {
        self.tables
            .entry(name.to_string())
            .or_insert_with(|| Table::new(name))
    }

    pub(crate) fn insert(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }
}

/// Registry of schemas, tables, columns and unique constraints.
///
/// Lookup methods (`has_*`, `get_*`) never create entries. Population
/// methods create the enclosing schema and table when they are missing. All
/// identifier arguments are raw text as written in SQL and are normalized
/// before use.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Catalog {
    schemas: IndexMap<String, Schema>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_schema(&self, schema: &str) -> bool {
        self.get_schema(schema).is_some()
    }

    pub fn has_table(&self, schema: &str, table: &str) -> bool {
        self.get_table(schema, table).is_some()
    }

    pub fn get_schema(&self, schema: &str) -> Option<&Schema> {
        self.schemas.get(&normalize_identifier(schema))
    }

    pub fn get_table(&self, schema: &str, table: &str) -> Option<&Table> {
        self.get_schema(schema)?.table(&normalize_identifier(table))
    }

    pub fn get_column(&self, schema: &str, table: &str, column: &str) -> Option<&Column> {
        self.get_table(schema, table)?.column(&normalize_identifier(column))
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Stored names of the tables in a schema; empty if the schema is unknown
    pub fn table_names(&self, schema: &str) -> Vec<&str> {
        self.get_schema(schema)
            .map(|s| s.table_names().collect())
            .unwrap_or_default()
    }

    /// Add or replace a column, creating the schema and table if needed
    pub fn add_column(&mut self, schema: &str, table: &str, mut column: Column) {
        column.name = normalize_identifier(&column.name);
        if let Some(fk) = column.foreign_key.take() {
            column.foreign_key = Some(ForeignKey::new(
                normalize_identifier(&fk.schema),
                normalize_identifier(&fk.table),
                normalize_identifier(&fk.column),
            ));
        }
        self.table_or_insert(schema, table).add_column(column);
    }

    /// Add a unique constraint, creating the schema and table if needed
    pub fn add_unique_constraint(&mut self, schema: &str, table: &str, columns: &[&str], kind: ConstraintKind) {
        let constraint = UniqueConstraint::new(
            columns
                .iter()
                .map(|c| UniqueConstraintColumn::new(normalize_identifier(c), None)),
            kind,
        );
        self.table_or_insert(schema, table).add_unique_constraint(constraint);
    }

    /// Insert a whole table, replacing any table with the same stored name.
    ///
    /// The table name is used as stored; it must already be normalized.
    pub fn insert_table(&mut self, schema: &str, table: Table) {
        self.schema_or_insert(&normalize_identifier(schema)).insert(table);
    }

    /// A copy of this catalog with one more table
    pub fn with_table(&self, schema: &str, table: Table) -> Catalog {
        let mut catalog = self.clone();
        catalog.insert_table(schema, table);
        catalog
    }

    pub(crate) fn schema_or_insert(&mut self, name: &str) -> &mut Schema {
        self.schemas
            .entry(name.to_string())
            .or_insert_with(|| Schema::new(name))
    }

    fn table_or_insert(&mut self, schema: &str, table: &str) -> &mut Table {
        let table = normalize_identifier(table);
        self.schema_or_insert(&normalize_identifier(schema))
            .table_or_insert(&table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_does_not_create() {
        let catalog = Catalog::new();

        assert!(!catalog.has_schema("public"));
        assert!(!catalog.has_table("public", "store"));
        assert!(catalog.get_column("public", "store", "sid").is_none());
        assert_eq!(catalog.schema_names().count(), 0);
    }

    #[test]
    fn test_add_column_creates_schema_and_table() {
        let mut catalog = Catalog::new();
        catalog.add_column("Public", "Store", Column::new("SID", "integer"));

        assert!(catalog.has_schema("public"));
        assert!(catalog.has_table("PUBLIC", "store"));
        assert!(catalog.get_column("public", "store", "sid").is_some());
        assert_eq!(catalog.table_names("public"), vec!["store"]);
    }

    #[test]
    fn test_quoted_names_keep_case() {
        let mut catalog = Catalog::new();
        catalog.add_column("public", "\"Store\"", Column::new("sid", "integer"));

        assert!(catalog.has_table("public", "\"Store\""));
        assert!(!catalog.has_table("public", "store"));
        assert!(!catalog.has_table("public", "Store"));
    }

    #[test]
    fn test_foreign_key_is_normalized() {
        let mut catalog = Catalog::new();
        catalog.add_column(
            "public",
            "transaction",
            Column::new("sid", "integer").with_foreign_key(ForeignKey::new("PUBLIC", "Store", "SID")),
        );

        let column = catalog.get_column("public", "transaction", "sid");
        assert_eq!(
            column.and_then(|c| c.foreign_key.clone()),
            Some(ForeignKey::new("public", "store", "sid"))
        );
    }

    #[test]
    fn test_with_table_leaves_original_untouched() {
        let catalog = Catalog::new();
        let extended = catalog.with_table(CTE_SCHEMA, Table::new("recent"));

        assert!(extended.has_table("", "recent"));
        assert!(!catalog.has_table("", "recent"));
    }
}
