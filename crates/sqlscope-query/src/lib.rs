//! Query structure and output schema inference for sqlscope
//!
//! This crate provides:
//! - Query trees: CTEs, set operations and SELECT blocks built from SQL text
//! - Subquery discovery with clause tags, from the AST or from raw tokens
//! - Output schemas of SELECTs, including provable unique constraints
//! - Analysis sessions that swap in corrected query text
//!
//! # Example
//!
//! ```
//! use sqlscope_catalog::{Catalog, Column};
//! use sqlscope_query::{AnalysisOptions, Query};
//!
//! let mut catalog = Catalog::new();
//! catalog.add_column("public", "users", Column::new("id", "integer").not_null());
//! catalog.add_column("public", "users", Column::new("name", "text"));
//!
//! let query = Query::parse("SELECT id, upper(name) FROM users", &catalog, &AnalysisOptions::default()).unwrap();
//! let names: Vec<&str> = query.output().columns().iter().map(|c| c.name.as_str()).collect();
//! assert_eq!(names, ["id", "?column_1?"]);
//! ```

mod builder;
pub mod constraints;
pub mod disjoint_set;
pub mod options;
pub mod projection;
pub mod query;
pub mod select;
pub mod set_operation;
pub mod subquery;

pub use disjoint_set::DisjointSet;
pub use options::{AnalysisOptions, SqlDialect};
pub use query::{Cte, Query, Session};
pub use select::{Select, relation_table};
pub use set_operation::{BinaryOperation, Modifiers, SetOperation};
pub use subquery::{Subquery, SubqueryClause, scan_subqueries};
