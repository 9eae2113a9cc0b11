//! Table and column resolution
//!
//! Unqualified table names look in the query-local CTE schema first, then in
//! the search path schema. Resolution failures are returned as
//! [`SemanticIssue`] values; nothing here panics or aborts analysis.

use smallvec::SmallVec;
use sqlscope_catalog::{Catalog, Column, Table, CTE_SCHEMA, normalize_identifier};
use sqlscope_diagnostics::SemanticIssue;

/// A table found in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTable {
    /// Stored name of the schema the table was found in
    pub schema: String,
    pub table: Table,
}

impl ResolvedTable {
    /// Returns true if the table is a CTE of the current query
    pub fn is_cte(&self) -> bool {
        self.schema == CTE_SCHEMA
    }
}

/// Resolve a table reference.
///
/// `schema`, `name` and `search_path` are raw SQL text.
pub fn resolve_table(
    schema: Option<&str>,
    name: &str,
    search_path: &str,
    catalog: &Catalog,
) -> Result<ResolvedTable, SemanticIssue> {
    let table_name = normalize_identifier(name);

    if let Some(schema) = schema {
        let schema_name = normalize_identifier(schema);
        let Some(found) = catalog.get_schema(schema) else {
            return Err(SemanticIssue::UnresolvedSchema { schema: schema_name });
        };
        return match found.table(&table_name) {
            Some(table) => Ok(ResolvedTable {
                schema: schema_name,
                table: table.clone(),
            }),
            None => Err(SemanticIssue::UnresolvedTable {
                schema: Some(schema_name),
                table: table_name,
            }),
        };
    }

    if let Some(table) = catalog.get_table(CTE_SCHEMA, name) {
        return Ok(ResolvedTable {
            schema: CTE_SCHEMA.to_string(),
            table: table.clone(),
        });
    }
    if let Some(table) = catalog.get_table(search_path, name) {
        return Ok(ResolvedTable {
            schema: normalize_identifier(search_path),
            table: table.clone(),
        });
    }

    Err(SemanticIssue::UnresolvedTable {
        schema: None,
        table: table_name,
    })
}

/// One table/column pair a column reference may denote
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnCandidate<'a> {
    pub table_idx: usize,
    pub column: &'a Column,
}

/// Every column a reference may denote.
///
/// Zero candidates means the column is undefined, more than one means the
/// reference is ambiguous. Whether that matters is up to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCandidates<'a> {
    table: Option<String>,
    column: String,
    candidates: SmallVec<[ColumnCandidate<'a>; 2]>,
}

impl<'a> ColumnCandidates<'a> {
    pub fn first(&self) -> Option<&ColumnCandidate<'a>> {
        self.candidates.first()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnCandidate<'a>> {
        self.candidates.iter()
    }

    /// The issue a strict caller reports for this reference, if any
    pub fn issue(&self) -> Option<SemanticIssue> {
        match self.candidates.len() {
            0 => Some(SemanticIssue::UnresolvedColumn {
                table: self.table.clone(),
                column: self.column.clone(),
            }),
            1 => None,
            n => Some(SemanticIssue::AmbiguousColumn {
                column: self.column.clone(),
                candidates: n,
            }),
        }
    }
}

/// Enumerate the columns a reference may denote.
///
/// `qualifier` and `name` are stored names; the qualifier matches table
/// output names (aliases).
pub fn resolve_column<'a>(qualifier: Option<&str>, name: &str, tables: &'a [Table]) -> ColumnCandidates<'a> {
    let candidates = tables
        .iter()
        .enumerate()
        .filter(|(_, table)| qualifier.is_none_or(|q| table.name == q))
        .filter_map(|(table_idx, table)| {
            table
                .column(name)
                .map(|column| ColumnCandidate { table_idx, column })
        })
        .collect();

    ColumnCandidates {
        table: qualifier.map(str::to_string),
        column: name.to_string(),
        candidates,
    }
}
