//! SQL type system for sqlscope
//!
//! This crate defines:
//! - Scalar kinds (string, number, boolean, date, null, unknown)
//! - Implicit cast rules between them
//! - The expression type checker over `sqlparser` expressions
//! - Table and column name resolution

pub mod coercion;
pub mod inference;
pub mod result_type;
pub mod scalar;
pub mod semantic;

pub use coercion::Comparison;
pub use inference::{collect_errors, SubqueryTyper, TypeChecker};
pub use result_type::ResultType;
pub use scalar::ScalarKind;
