//! Scalar kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// The coarse type lattice the checker works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// Character data
    String,
    /// Integer, decimal and floating point data
    Number,
    /// Boolean data
    Boolean,
    /// Dates, times, timestamps and intervals
    Date,
    /// The NULL literal
    Null,
    /// Anything the checker cannot classify
    Unknown,
}

impl ScalarKind {
    /// Classify SQL type text such as `varchar(20)` or `double precision`.
    ///
    /// Kind names (`string`, `number`, ...) map back to themselves.
    pub fn from_sql_type(text: &str) -> Self {
        let upper = text.trim().to_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();

        if base == "NULL" {
            return Self::Null;
        }
        if base == "INTERVAL" || base.starts_with("DATE") || base.starts_with("TIME") {
            return Self::Date;
        }
        if matches!(base, "VARCHAR" | "TEXT" | "STRING")
            || base.starts_with("CHAR")
            || base.starts_with("NVARCHAR")
            || base.starts_with("NCHAR")
        {
            return Self::String;
        }
        if matches!(base, "DECIMAL" | "NUMERIC" | "REAL" | "NUMBER")
            || base.starts_with("INT")
            || base.starts_with("FLOAT")
            || base.starts_with("DOUBLE")
            || base.starts_with("SERIAL")
            || is_sized_integer(base)
        {
            return Self::Number;
        }
        if base.starts_with("BOOL") {
            return Self::Boolean;
        }
        Self::Unknown
    }

    /// Lowercase kind name, as used in messages and derived column types
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Null => "null",
            Self::Unknown => "unknown",
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// `tinyint`, `bigserial` and the other size-prefixed integer names
fn is_sized_integer(base: &str) -> bool {
    ["TINY", "SMALL", "MEDIUM", "BIG", "HUGE"].iter().any(|size| {
        base.strip_prefix(size)
            .is_some_and(|rest| rest.starts_with("INT") || rest.starts_with("SERIAL"))
    })
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
