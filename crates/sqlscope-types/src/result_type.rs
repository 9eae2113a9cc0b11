//! Type checker results

use crate::ScalarKind;
use serde::Serialize;
use sqlscope_diagnostics::{Diagnostic, Severity};

/// The type of an expression, together with every problem found while
/// computing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultType {
    pub kind: ScalarKind,
    pub nullable: bool,
    /// Same value on every row
    pub constant: bool,
    /// Literal text, when the expression is a literal
    pub value: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResultType {
    /// A nullable, non-constant result of the given kind
    pub fn new(kind: ScalarKind) -> Self {
        Self {
            kind,
            nullable: true,
            constant: false,
            value: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(ScalarKind::Unknown)
    }

    /// The NULL literal
    pub fn null() -> Self {
        Self::new(ScalarKind::Null).with_constant(true)
    }

    /// A non-null constant
    pub fn literal(kind: ScalarKind, value: Option<String>) -> Self {
        Self {
            kind,
            nullable: false,
            constant: true,
            value,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_constant(mut self, constant: bool) -> Self {
        self.constant = constant;
        self
    }

    pub fn with_value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Prepend the diagnostics of the operands this result was computed from
    pub fn with_children(mut self, children: impl IntoIterator<Item = ResultType>) -> Self {
        let own = std::mem::take(&mut self.diagnostics);
        for child in children {
            self.diagnostics.extend(child.diagnostics);
        }
        self.diagnostics.extend(own);
        self
    }

    pub fn is_null(&self) -> bool {
        self.kind.is_null()
    }

    /// Returns true if any error-severity diagnostic was recorded
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Error-severity diagnostics
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    /// `(message, offending text)` pairs of the error diagnostics
    pub fn messages(&self) -> Vec<(String, String)> {
        self.errors().map(Diagnostic::to_pair).collect()
    }
}

impl Default for ResultType {
    fn default() -> Self {
        Self::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscope_diagnostics::{SQL0201, SQL0204};

    #[test]
    fn test_children_come_first() {
        let left = ResultType::unknown().with_diagnostic(Diagnostic::error(SQL0201, "left").with_snippet("a"));
        let right = ResultType::unknown().with_diagnostic(Diagnostic::error(SQL0201, "right").with_snippet("b"));

        let parent = ResultType::new(ScalarKind::Boolean)
            .with_diagnostic(Diagnostic::error(SQL0201, "parent").with_snippet("a AND b"))
            .with_children([left, right]);

        let messages: Vec<String> = parent.messages().into_iter().map(|(m, _)| m).collect();
        assert_eq!(messages, vec!["left", "right", "parent"]);
    }

    #[test]
    fn test_warnings_are_not_errors() {
        let result = ResultType::unknown().with_diagnostic(Diagnostic::warning(SQL0204, "Unsupported expression."));

        assert!(!result.has_errors());
        assert!(result.messages().is_empty());
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn test_literal_defaults() {
        let lit = ResultType::literal(ScalarKind::Number, Some("1".into()));
        assert!(!lit.nullable);
        assert!(lit.constant);

        let null = ResultType::null();
        assert!(null.nullable);
        assert!(null.constant);
        assert!(null.is_null());
    }
}
