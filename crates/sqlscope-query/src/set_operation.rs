//! Set-operation trees
//!
//! A query body is a binary tree of UNION / INTERSECT / EXCEPT nodes with
//! SELECT leaves. ORDER BY, LIMIT and OFFSET belong to the node the query
//! body produced.

use crate::Select;
use crate::constraints::{left_constraints, union_constraints};
use once_cell::unsync::OnceCell;
use sqlparser::ast::{Expr, LimitClause, OrderByExpr, OrderByKind, Query, Value};
use sqlscope_catalog::Table;
use std::fmt;

/// ORDER BY / LIMIT / OFFSET of a node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifiers {
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Modifiers {
    /// Modifiers written on a query; LIMIT and OFFSET are kept only when
    /// they are non-negative integer literals
    pub fn from_query(query: &Query) -> Self {
        let order_by = match query.order_by.as_ref().map(|o| &o.kind) {
            Some(OrderByKind::Expressions(exprs)) => exprs.clone(),
            _ => Vec::new(),
        };
        let (limit, offset) = match &query.limit_clause {
            Some(LimitClause::LimitOffset { limit, offset, .. }) => (
                limit.as_ref().and_then(literal_count),
                offset.as_ref().and_then(|o| literal_count(&o.value)),
            ),
            Some(LimitClause::OffsetCommaLimit { offset, limit }) => (literal_count(limit), literal_count(offset)),
            None => (None, None),
        };

        Self {
            order_by,
            limit,
            offset,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order_by.is_empty() && self.limit.is_none() && self.offset.is_none()
    }

    /// Apply outer modifiers on top of these
    pub(crate) fn overlay(&mut self, outer: Modifiers) {
        if !outer.order_by.is_empty() {
            self.order_by = outer.order_by;
        }
        if outer.limit.is_some() {
            self.limit = outer.limit;
        }
        if outer.offset.is_some() {
            self.offset = outer.offset;
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.order_by.is_empty() {
            let items: Vec<String> = self.order_by.iter().map(ToString::to_string).collect();
            parts.push(format!("ORDER_BY=[{}]", items.join(", ")));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("LIMIT={limit}"));
        }
        if let Some(offset) = self.offset {
            parts.push(format!("OFFSET={offset}"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

fn literal_count(expr: &Expr) -> Option<u64> {
    match expr {
        Expr::Value(value) => match &value.value {
            Value::Number(text, _) => text.parse().ok(),
            _ => None,
        },
        _ => None,
    }
}

/// Two query bodies combined by a set operator
#[derive(Debug)]
pub struct BinaryOperation {
    sql: String,
    left: Box<SetOperation>,
    right: Box<SetOperation>,
    all: bool,
    modifiers: Modifiers,
    output: OnceCell<Table>,
}

impl BinaryOperation {
    pub(crate) fn new(sql: String, left: SetOperation, right: SetOperation, all: bool) -> Self {
        Self {
            sql,
            left: Box::new(left),
            right: Box::new(right),
            all,
            modifiers: Modifiers::default(),
            output: OnceCell::new(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn left(&self) -> &SetOperation {
        &self.left
    }

    pub fn right(&self) -> &SetOperation {
        &self.right
    }

    /// True only for an explicit ALL quantifier
    pub fn all(&self) -> bool {
        self.all
    }
}

/// A node of the set-operation tree
#[derive(Debug)]
pub enum SetOperation {
    Select(Box<Select>),
    Union(BinaryOperation),
    Intersect(BinaryOperation),
    Except(BinaryOperation),
}

impl SetOperation {
    pub fn name(&self) -> &'static str {
        match self {
            SetOperation::Select(_) => "Select",
            SetOperation::Union(_) => "Union",
            SetOperation::Intersect(_) => "Intersect",
            SetOperation::Except(_) => "Except",
        }
    }

    pub fn as_select(&self) -> Option<&Select> {
        match self {
            SetOperation::Select(select) => Some(select.as_ref()),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&BinaryOperation> {
        match self {
            SetOperation::Select(_) => None,
            SetOperation::Union(op) | SetOperation::Intersect(op) | SetOperation::Except(op) => Some(op),
        }
    }

    pub fn sql(&self) -> &str {
        match self {
            SetOperation::Select(select) => select.sql(),
            SetOperation::Union(op) | SetOperation::Intersect(op) | SetOperation::Except(op) => op.sql(),
        }
    }

    fn modifiers(&self) -> &Modifiers {
        match self {
            SetOperation::Select(select) => select.modifiers(),
            SetOperation::Union(op) | SetOperation::Intersect(op) | SetOperation::Except(op) => &op.modifiers,
        }
    }

    pub(crate) fn apply_modifiers(&mut self, outer: Modifiers) {
        match self {
            SetOperation::Select(select) => select.modifiers_mut().overlay(outer),
            SetOperation::Union(op) | SetOperation::Intersect(op) | SetOperation::Except(op) => {
                op.modifiers.overlay(outer);
            }
        }
    }

    pub fn order_by(&self) -> &[OrderByExpr] {
        &self.modifiers().order_by
    }

    pub fn limit(&self) -> Option<u64> {
        self.modifiers().limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.modifiers().offset
    }

    /// Output table. Set operations take the left operand's columns.
    pub fn output(&self) -> &Table {
        match self {
            SetOperation::Select(select) => select.output(),
            SetOperation::Union(op) => op.output.get_or_init(|| {
                let mut output = op.left.output().clone();
                output.set_unique_constraints(union_constraints(op.all));
                output
            }),
            SetOperation::Intersect(op) | SetOperation::Except(op) => op.output.get_or_init(|| {
                let mut output = op.left.output().clone();
                output.set_unique_constraints(left_constraints(op.left.output().unique_constraints(), op.all));
                output
            }),
        }
    }

    /// Every SELECT leaf and the SELECTs nested in them, left to right
    pub fn selects(&self) -> Vec<&Select> {
        match self {
            SetOperation::Select(select) => select.selects(),
            SetOperation::Union(op) | SetOperation::Intersect(op) | SetOperation::Except(op) => {
                let mut selects = op.left.selects();
                selects.extend(op.right.selects());
                selects
            }
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, head: &str, tail: &str) -> fmt::Result {
        let modifiers = self.modifiers();
        match self {
            SetOperation::Select(select) => {
                let mut lines = select.sql().lines();
                let first = lines.next().unwrap_or_default();
                let more = if lines.next().is_some() { "..." } else { "" };
                write!(f, "{head}Select(SQL=\"{first}{more}\"")?;
                if !modifiers.is_empty() {
                    write!(f, ", {modifiers}")?;
                }
                write!(f, ")")
            }
            SetOperation::Union(op) | SetOperation::Intersect(op) | SetOperation::Except(op) => {
                write!(f, "{head}{}(ALL={}", self.name(), op.all)?;
                if !modifiers.is_empty() {
                    write!(f, ", {modifiers}")?;
                }
                writeln!(f, ")")?;
                op.left.write_tree(f, &format!("{tail}|- "), &format!("{tail}|  "))?;
                writeln!(f)?;
                op.right.write_tree(f, &format!("{tail}`- "), &format!("{tail}   "))
            }
        }
    }
}

impl fmt::Display for SetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, "", "")
    }
}
