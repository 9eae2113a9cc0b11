//! Issue and error types

use crate::{ErrorCode, SQL0001, SQL0100, SQL0101, SQL0102, SQL0103, SQL0300, SQL0302, SQL0401};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// The query is wrong as written
    Error,
    /// Suspicious but valid
    Warning,
    /// Informational message
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message attached to a piece of query text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// The offending query text, as written
    pub snippet: Option<String>,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            snippet: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            snippet: None,
            help: None,
        }
    }

    /// Set the offending text
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// The `(message, offending text)` pair detectors key off
    pub fn to_pair(&self) -> (String, String) {
        (self.message.clone(), self.snippet.clone().unwrap_or_default())
    }

    /// Render the diagnostic for a terminal
    #[cfg(feature = "colored")]
    pub fn render(&self) -> String {
        use colored::Colorize;

        let head = match self.severity {
            Severity::Error => format!("{}[{}]", self.severity, self.code).red().bold(),
            Severity::Warning => format!("{}[{}]", self.severity, self.code).yellow().bold(),
            Severity::Info => format!("{}[{}]", self.severity, self.code).cyan().bold(),
        };
        let mut out = format!("{}: {}", head, self.message);
        if let Some(snippet) = &self.snippet {
            out.push_str(&format!("\n  {} {}", "-->".blue(), snippet));
        }
        if let Some(help) = &self.help {
            out.push_str(&format!("\n  {} {}", "help:".green(), help));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(snippet) = &self.snippet {
            write!(f, " in `{}`", snippet)?;
        }
        Ok(())
    }
}

/// A query-level semantic problem.
///
/// Issues are never raised: they are collected and surfaced as data so the
/// detector layer can weigh them.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SemanticIssue {
    /// The text is not a parseable query
    #[error("could not parse query: {message}")]
    ParseFailure { message: String },

    /// An explicit schema qualifier names no schema
    #[error("schema \"{schema}\" does not exist")]
    UnresolvedSchema { schema: String },

    /// No table with this name is visible
    #[error("relation \"{table}\" does not exist")]
    UnresolvedTable {
        schema: Option<String>,
        table: String,
    },

    /// No referenced table defines this column
    #[error("column \"{column}\" does not exist")]
    UnresolvedColumn {
        table: Option<String>,
        column: String,
    },

    /// More than one referenced table defines this column
    #[error("column reference \"{column}\" is ambiguous")]
    AmbiguousColumn { column: String, candidates: usize },

    /// Incompatible operand or argument types
    #[error("{message}")]
    TypeError {
        code: ErrorCode,
        message: String,
        text: String,
    },
}

impl SemanticIssue {
    /// Create a type error
    pub fn type_error(code: ErrorCode, message: impl Into<String>, text: impl Into<String>) -> Self {
        Self::TypeError {
            code,
            message: message.into(),
            text: text.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ParseFailure { .. } => SQL0001,
            Self::UnresolvedSchema { .. } => SQL0100,
            Self::UnresolvedTable { .. } => SQL0101,
            Self::UnresolvedColumn { .. } => SQL0102,
            Self::AmbiguousColumn { .. } => SQL0103,
            Self::TypeError { code, .. } => *code,
        }
    }

    /// The query text the issue points at
    pub fn offending_text(&self) -> String {
        match self {
            Self::ParseFailure { .. } => String::new(),
            Self::UnresolvedSchema { schema } => schema.clone(),
            Self::UnresolvedTable { schema: Some(schema), table } => format!("{schema}.{table}"),
            Self::UnresolvedTable { schema: None, table } => table.clone(),
            Self::UnresolvedColumn { table: Some(table), column } => format!("{table}.{column}"),
            Self::UnresolvedColumn { table: None, column } => column.clone(),
            Self::AmbiguousColumn { column, .. } => column.clone(),
            Self::TypeError { text, .. } => text.clone(),
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = self.code();
        let mut diag = Diagnostic::error(code, self.to_string()).with_snippet(self.offending_text());
        if let Some(help) = code.info().help {
            diag = diag.with_help(help);
        }
        diag
    }
}

/// Fatal analysis errors.
///
/// These signal a broken fixture or a runaway input rather than a mistake in
/// the analyzed query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Catalog metadata is malformed
    #[error("{code}: corrupt catalog: {message}", code = SQL0300)]
    CorruptCatalog { message: String },

    /// A catalog document could not be read or written
    #[error("{code}: cannot access catalog file {path}: {message}", code = SQL0302)]
    CatalogIo { path: String, message: String },

    /// Query nesting is deeper than the configured limit
    #[error("{code}: query nesting exceeds the depth limit of {limit}", code = SQL0401)]
    RecursionLimitExceeded { limit: usize },
}

impl AnalysisError {
    /// Create a corrupt catalog error
    pub fn corrupt_catalog(message: impl Into<String>) -> Self {
        Self::CorruptCatalog {
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CorruptCatalog { .. } => SQL0300,
            Self::CatalogIo { .. } => SQL0302,
            Self::RecursionLimitExceeded { .. } => SQL0401,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.code(), self.to_string());
        if let Some(help) = self.code().info().help {
            diag = diag.with_help(help);
        }
        diag
    }
}
