//! Structured error codes
//!
//! Error code ranges:
//! - SQL0001-SQL0099: Parse errors
//! - SQL0100-SQL0199: Resolution errors (schemas, tables, columns)
//! - SQL0200-SQL0299: Type checking errors
//! - SQL0300-SQL0399: Catalog errors
//! - SQL0400-SQL0499: System errors (depth guard, internal)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    pub const fn is_parse_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    pub const fn is_resolution_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    pub const fn is_type_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    pub const fn is_catalog_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SQL{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Parse errors (0001-0099)
    map.insert(1, ErrorInfo::new("Query text could not be parsed")
        .with_help("The statement is analyzed as an empty SELECT"));
    map.insert(2, ErrorInfo::new("Statement is not a query"));

    // Resolution errors (0100-0199)
    map.insert(100, ErrorInfo::new("Undefined schema"));
    map.insert(101, ErrorInfo::new("Undefined table")
        .with_help("Check the search path and the WITH clause of the query"));
    map.insert(102, ErrorInfo::new("Undefined column"));
    map.insert(103, ErrorInfo::new("Ambiguous column reference")
        .with_help("Qualify the column with a table name or alias"));

    // Type checking errors (0200-0299)
    map.insert(200, ErrorInfo::new("Type mismatch"));
    map.insert(201, ErrorInfo::new("Invalid operand type"));
    map.insert(202, ErrorInfo::new("Invalid function argument"));
    map.insert(203, ErrorInfo::new("Invalid cast"));
    map.insert(204, ErrorInfo::new("Unsupported expression"));

    // Catalog errors (0300-0399)
    map.insert(300, ErrorInfo::new("Corrupt catalog"));
    map.insert(301, ErrorInfo::new("Unsupported catalog document version"));
    map.insert(302, ErrorInfo::new("Catalog I/O error"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("Recursion limit exceeded")
        .with_help("Reduce the nesting of subqueries and CTEs or raise max_depth"));

    map
});

// Parse errors
pub const SQL0001: ErrorCode = ErrorCode::new(1);
pub const SQL0002: ErrorCode = ErrorCode::new(2);

// Resolution errors
pub const SQL0100: ErrorCode = ErrorCode::new(100);
pub const SQL0101: ErrorCode = ErrorCode::new(101);
pub const SQL0102: ErrorCode = ErrorCode::new(102);
pub const SQL0103: ErrorCode = ErrorCode::new(103);

// Type checking errors
pub const SQL0200: ErrorCode = ErrorCode::new(200);
pub const SQL0201: ErrorCode = ErrorCode::new(201);
pub const SQL0202: ErrorCode = ErrorCode::new(202);
pub const SQL0203: ErrorCode = ErrorCode::new(203);
pub const SQL0204: ErrorCode = ErrorCode::new(204);

// Catalog errors
pub const SQL0300: ErrorCode = ErrorCode::new(300);
pub const SQL0301: ErrorCode = ErrorCode::new(301);
pub const SQL0302: ErrorCode = ErrorCode::new(302);

// System errors
pub const SQL0400: ErrorCode = ErrorCode::new(400);
pub const SQL0401: ErrorCode = ErrorCode::new(401);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(SQL0001.to_string(), "SQL0001");
        assert_eq!(SQL0103.to_string(), "SQL0103");
        assert_eq!(SQL0401.to_string(), "SQL0401");
    }

    #[test]
    fn test_error_categories() {
        assert!(SQL0001.is_parse_error());
        assert!(!SQL0001.is_resolution_error());

        assert!(SQL0102.is_resolution_error());
        assert!(SQL0201.is_type_error());
        assert!(SQL0300.is_catalog_error());
        assert!(SQL0401.is_system_error());
    }

    #[test]
    fn test_error_info() {
        assert_eq!(SQL0103.info().description, "Ambiguous column reference");
        assert!(SQL0103.info().help.is_some());
        assert_eq!(ErrorCode::new(999).info().description, "Unknown error");
    }
}
