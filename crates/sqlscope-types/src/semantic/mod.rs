//! Name resolution for SQL queries
//!
//! This module provides:
//! - Table lookup against the catalog and the query-local CTE scope
//! - Column candidate enumeration over a SELECT's referenced tables
//! - Identifier normalization for sqlparser AST names

mod names;
mod resolver;
mod scope;

pub use names::*;
pub use resolver::*;
pub use scope::*;
