//! Shared fixtures for query analysis tests
//!
//! The store/transaction catalog mirrors a small retail schema: stores with
//! a primary key, and transactions referencing them.

#![allow(dead_code)]

use sqlscope_catalog::{Catalog, Column, ConstraintKind, ForeignKey, UniqueConstraint, UniqueConstraintColumn};
use sqlscope_query::{AnalysisOptions, Query, Select};

pub fn store_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.add_column("public", "store", Column::new("sid", "integer").not_null());
    catalog.add_column("public", "store", Column::new("sname", "varchar"));
    catalog.add_column("public", "store", Column::new("street", "varchar"));
    catalog.add_column("public", "store", Column::new("city", "varchar"));
    catalog.add_unique_constraint("public", "store", &["sid"], ConstraintKind::PrimaryKey);

    catalog.add_column("public", "transaction", Column::new("tid", "integer").not_null());
    catalog.add_column(
        "public",
        "transaction",
        Column::new("sid", "integer").with_foreign_key(ForeignKey::new("public", "store", "sid")),
    );
    catalog.add_column("public", "transaction", Column::new("date", "date"));
    catalog.add_column("public", "transaction", Column::new("price", "numeric"));
    catalog.add_unique_constraint("public", "transaction", &["tid"], ConstraintKind::PrimaryKey);
    catalog
}

/// Analyze a query against the store catalog with default options
pub fn analyze(sql: &str) -> Query {
    Query::parse(sql, &store_catalog(), &AnalysisOptions::default()).unwrap()
}

/// The main SELECT of a query that has no set operation
pub fn main_select(query: &Query) -> &Select {
    query.main_query().as_select().expect("main query is a single SELECT")
}

pub fn output_names(query: &Query) -> Vec<String> {
    query.output().columns().iter().map(|c| c.name.clone()).collect()
}

pub fn constraint(kind: ConstraintKind, columns: &[(&str, usize)]) -> UniqueConstraint {
    UniqueConstraint::new(
        columns
            .iter()
            .map(|(name, idx)| UniqueConstraintColumn::new(*name, Some(*idx))),
        kind,
    )
}
