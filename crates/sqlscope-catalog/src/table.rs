//! Tables

use crate::{Column, ConstraintKind, UniqueConstraint, UniqueConstraintColumn};
use serde::Serialize;

/// A table: an ordered list of uniquely named columns plus its unique
/// constraints.
///
/// Names passed to `Table` methods are stored names, already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Table {
    pub name: String,
    columns: Vec<Column>,
    unique_constraints: Vec<UniqueConstraint>,
}

impl Table {
    /// Create an empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique_constraints: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn unique_constraints(&self) -> &[UniqueConstraint] {
        &self.unique_constraints
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Add a column, replacing an existing column with the same name
    pub fn add_column(&mut self, column: Column) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    /// Append a column even if the name is already taken.
    ///
    /// Derived tables may legitimately repeat names (`SELECT *, * FROM t`).
    pub fn push_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn add_unique_constraint(&mut self, constraint: UniqueConstraint) {
        self.unique_constraints.push(constraint);
    }

    pub fn set_unique_constraints(&mut self, constraints: Vec<UniqueConstraint>) {
        self.unique_constraints = constraints;
    }

    /// The first PRIMARY KEY constraint
    pub fn primary_key(&self) -> Option<&UniqueConstraint> {
        self.unique_constraints.iter().find(|c| c.is_primary_key())
    }

    /// Returns true if the column is part of a primary key
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.unique_constraints
            .iter()
            .any(|c| c.is_primary_key() && c.contains_name(column))
    }

    /// Deep copy under another name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        let mut table = self.clone();
        table.name = name.into();
        table
    }

    /// Constraint over every column of this table, tagged with `table_idx`
    pub fn all_columns_constraint(&self, table_idx: Option<usize>, kind: ConstraintKind) -> UniqueConstraint {
        UniqueConstraint::new(
            self.columns
                .iter()
                .map(|c| UniqueConstraintColumn::new(c.name.clone(), table_idx)),
            kind,
        )
    }
}
