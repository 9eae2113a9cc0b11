//! Diagnostics for the sqlscope analyzer
//!
//! This crate holds the error taxonomy shared by every analysis crate:
//! structured error codes, the [`SemanticIssue`] kinds that are reported as
//! data, the fatal [`AnalysisError`] conditions and the [`Diagnostic`] record
//! handed to detectors.

mod error;
mod error_code;

pub use error::*;
pub use error_code::*;

/// Result type for analysis operations that can fail fatally
pub type Result<T> = std::result::Result<T, AnalysisError>;
