//! Table scope of a SELECT
//!
//! A SELECT sees its referenced tables in FROM/JOIN order. Positions in that
//! list are the `table_idx` values carried by derived columns and
//! constraints.

use sqlscope_catalog::{Column, Table};

/// The referenced tables of one SELECT
#[derive(Debug, Clone, Copy)]
pub struct TableScope<'a> {
    tables: &'a [Table],
}

impl<'a> TableScope<'a> {
    pub fn new(tables: &'a [Table]) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &'a [Table] {
        self.tables
    }

    pub fn get(&self, idx: usize) -> Option<&'a Table> {
        self.tables.get(idx)
    }

    /// Position of the first table with this output name
    pub fn position(&self, qualifier: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name == qualifier)
    }

    /// Position of the first table defining this column
    pub fn first_owner(&self, column: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.has_column(column))
    }

    /// Table index a column reference is attributed to: the qualified table
    /// if given, else the first table defining the column
    pub fn owner(&self, qualifier: Option<&str>, column: &str) -> Option<usize> {
        match qualifier {
            Some(q) => self.position(q),
            None => self.first_owner(column),
        }
    }

    /// Every column of every table, in table order, with its table index
    pub fn columns(&self) -> impl Iterator<Item = (usize, &'a Column)> + 'a {
        self.tables
            .iter()
            .enumerate()
            .flat_map(|(idx, t)| t.columns().iter().map(move |c| (idx, c)))
    }
}
