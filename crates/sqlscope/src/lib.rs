//! Semantic resolution and type inference for SQL
//!
//! This crate provides a complete analysis front end including:
//! - A catalog of schemas, tables, columns and unique constraints
//! - Table and column resolution with CTE scoping
//! - Query trees of CTEs, set operations and SELECT blocks
//! - Expression typing with implicit casts and error reporting
//! - Output schemas with provable unique constraints
//!
//! # Example
//!
//! ```
//! use sqlscope::{AnalysisOptions, Catalog, Column, ConstraintKind};
//!
//! let mut catalog = Catalog::new();
//! catalog.add_column("public", "store", Column::new("sid", "integer").not_null());
//! catalog.add_column("public", "store", Column::new("city", "varchar"));
//! catalog.add_unique_constraint("public", "store", &["sid"], ConstraintKind::PrimaryKey);
//!
//! let query = sqlscope::analyze("SELECT sid, city FROM store", &catalog, &AnalysisOptions::default()).unwrap();
//! assert_eq!(query.output().columns().len(), 2);
//! assert!(query.output().unique_constraints()[0].is_primary_key());
//! ```

// Re-export all public APIs from internal crates
pub use sqlscope_catalog as catalog;
pub use sqlscope_diagnostics as diagnostics;
pub use sqlscope_query as query;
pub use sqlscope_types as types;

// Convenience re-exports
pub use sqlscope_catalog::{Catalog, Column, ConstraintKind, Table, UniqueConstraint, UniqueConstraintColumn};
pub use sqlscope_diagnostics::{AnalysisError, Diagnostic, Result, SemanticIssue};
pub use sqlscope_query::{AnalysisOptions, Query, Select, Session, SetOperation, SqlDialect, Subquery, SubqueryClause};
pub use sqlscope_types::{ResultType, ScalarKind};

/// Analyze SQL text against a catalog
pub fn analyze(sql: &str, catalog: &Catalog, options: &AnalysisOptions) -> Result<Query> {
    Query::parse(sql, catalog, options)
}

/// Parse a standalone SQL expression, for typing it in a SELECT's context
pub fn parse_expression(sql: &str, options: &AnalysisOptions) -> std::result::Result<sqlparser::ast::Expr, sqlparser::parser::ParserError> {
    let dialect = options.dialect.parser_dialect();
    sqlparser::parser::Parser::new(dialect.as_ref())
        .try_with_sql(sql)?
        .parse_expr()
}
