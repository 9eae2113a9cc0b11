//! Unique constraints

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of uniqueness guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    #[serde(alias = "PRIMARY KEY")]
    PrimaryKey,
    Unique,
    /// No duplicate whole rows
    All,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::PrimaryKey => write!(f, "PRIMARY KEY"),
            ConstraintKind::Unique => write!(f, "UNIQUE"),
            ConstraintKind::All => write!(f, "ALL"),
        }
    }
}

/// A column taking part in a unique constraint.
///
/// `table_idx` is only set on derived constraints, where it points into the
/// referenced tables of the SELECT that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UniqueConstraintColumn {
    pub name: String,
    pub table_idx: Option<usize>,
}

impl UniqueConstraintColumn {
    pub fn new(name: impl Into<String>, table_idx: Option<usize>) -> Self {
        Self {
            name: name.into(),
            table_idx,
        }
    }
}

impl fmt::Display for UniqueConstraintColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table_idx {
            Some(idx) => write!(f, "{}@{}", self.name, idx),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A set of columns whose value combinations never repeat
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UniqueConstraint {
    pub columns: BTreeSet<UniqueConstraintColumn>,
    pub kind: ConstraintKind,
}

impl UniqueConstraint {
    pub fn new(columns: impl IntoIterator<Item = UniqueConstraintColumn>, kind: ConstraintKind) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            kind,
        }
    }

    /// Whole-row uniqueness, as produced by DISTINCT or UNION
    pub fn all_rows() -> Self {
        Self {
            columns: BTreeSet::new(),
            kind: ConstraintKind::All,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        self.kind == ConstraintKind::PrimaryKey
    }

    pub fn is_all(&self) -> bool {
        self.kind == ConstraintKind::All
    }

    /// Returns true if any constraint column has this name
    pub fn contains_name(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

impl fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return write!(f, "ALL");
        }
        let cols: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
        write!(f, "{} ({})", self.kind, cols.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_ordered_and_deduplicated() {
        let c = UniqueConstraint::new(
            [
                UniqueConstraintColumn::new("tid", Some(1)),
                UniqueConstraintColumn::new("sid", Some(0)),
                UniqueConstraintColumn::new("sid", Some(0)),
            ],
            ConstraintKind::Unique,
        );

        assert_eq!(c.columns.len(), 2);
        assert_eq!(c.to_string(), "UNIQUE (sid@0, tid@1)");
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ConstraintKind::PrimaryKey).unwrap(),
            "\"PRIMARY_KEY\""
        );
        let legacy: ConstraintKind = serde_json::from_str("\"PRIMARY KEY\"").unwrap();
        assert_eq!(legacy, ConstraintKind::PrimaryKey);
    }
}
