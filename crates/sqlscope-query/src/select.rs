//! SELECT nodes
//!
//! A `Select` is one SELECT block of a query: its own AST, the relations of
//! its FROM clause and its direct subqueries, already built. Referenced
//! tables and the output table are derived on first access and memoized.

use crate::builder::Builder;
use crate::constraints::{self, ConstraintInputs};
use crate::projection;
use crate::set_operation::Modifiers;
use crate::{AnalysisOptions, Subquery};
use once_cell::unsync::OnceCell;
use regex::{NoExpand, Regex};
use sqlparser::ast::{BinaryOperator, Distinct, Expr, GroupByExpr, JoinConstraint, OrderByExpr, Query};
use sqlparser::ast::Select as SelectNode;
use sqlscope_catalog::{Catalog, Column, Table, UniqueConstraint, UniqueConstraintColumn, normalize_identifier};
use sqlscope_diagnostics::{Result, SemanticIssue};
use sqlscope_types::semantic::{TableScope, column_ref, resolve_table};
use sqlscope_types::{ResultType, ScalarKind, TypeChecker};
use std::rc::Rc;

/// Alias of a FROM item, with optional column renames
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RelationAlias {
    pub name: String,
    pub columns: Vec<String>,
}

/// One FROM/JOIN item, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Relation {
    /// A catalog table or CTE; schema and table are raw SQL text
    Named {
        schema: Option<String>,
        table: String,
        alias: Option<RelationAlias>,
    },
    /// A derived table, by position in the SELECT's subqueries
    Derived {
        subquery: usize,
        alias: Option<RelationAlias>,
    },
    /// Table functions and the like; seen as an empty table
    Other,
}

#[derive(Debug, Default)]
struct Resolution {
    tables: Vec<Table>,
    issues: Vec<SemanticIssue>,
}

/// A table as seen from the SELECT reading it.
///
/// Derived tags (`table_idx`) of the producing query are dropped; `columns`
/// renames columns positionally.
pub fn relation_table(source: &Table, name: &str, columns: &[String]) -> Table {
    let mut table = Table::new(name);
    for (i, column) in source.columns().iter().enumerate() {
        let mut column = column.clone().with_table_idx(None);
        if let Some(rename) = columns.get(i) {
            column.name = rename.clone();
        }
        table.push_column(column);
    }

    let rename = |name: &str| -> String {
        source
            .columns()
            .iter()
            .position(|c| c.name == name)
            .and_then(|i| columns.get(i))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    };
    table.set_unique_constraints(
        source
            .unique_constraints()
            .iter()
            .map(|c| {
                UniqueConstraint::new(
                    c.columns
                        .iter()
                        .map(|col| UniqueConstraintColumn::new(rename(&col.name), None)),
                    c.kind,
                )
            })
            .collect(),
    );
    table
}

/// A single SELECT block
#[derive(Debug)]
pub struct Select {
    sql: String,
    ast: Option<Box<SelectNode>>,
    modifiers: Modifiers,
    relations: Vec<Relation>,
    subqueries: Vec<Subquery>,
    catalog: Rc<Catalog>,
    options: Rc<AnalysisOptions>,
    parse_issue: Option<SemanticIssue>,
    resolution: OnceCell<Resolution>,
    output: OnceCell<Table>,
}

impl Select {
    pub(crate) fn parsed(
        ast: SelectNode,
        relations: Vec<Relation>,
        subqueries: Vec<Subquery>,
        catalog: Rc<Catalog>,
        options: Rc<AnalysisOptions>,
    ) -> Self {
        Self {
            sql: ast.to_string(),
            ast: Some(Box::new(ast)),
            modifiers: Modifiers::default(),
            relations,
            subqueries,
            catalog,
            options,
            parse_issue: None,
            resolution: OnceCell::new(),
            output: OnceCell::new(),
        }
    }

    /// A SELECT whose text did not parse. It has no tables and no output,
    /// only the subqueries found in its text.
    pub(crate) fn unparsed(
        sql: String,
        issue: SemanticIssue,
        subqueries: Vec<Subquery>,
        catalog: Rc<Catalog>,
        options: Rc<AnalysisOptions>,
    ) -> Self {
        Self {
            sql,
            ast: None,
            modifiers: Modifiers::default(),
            relations: Vec::new(),
            subqueries,
            catalog,
            options,
            parse_issue: Some(issue),
            resolution: OnceCell::new(),
            output: OnceCell::new(),
        }
    }

    pub(crate) fn modifiers_mut(&mut self) -> &mut Modifiers {
        &mut self.modifiers
    }

    pub(crate) fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    /// Text of this SELECT block, without ORDER BY / LIMIT
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn ast(&self) -> Option<&SelectNode> {
        self.ast.as_deref()
    }

    pub fn is_parsed(&self) -> bool {
        self.ast.is_some()
    }

    /// Catalog the SELECT resolves against, CTEs in scope included
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn search_path(&self) -> &str {
        &self.options.search_path
    }

    /// Direct subqueries in source order
    pub fn subqueries(&self) -> &[Subquery] {
        &self.subqueries
    }

    /// This SELECT and every SELECT nested in its subqueries
    pub fn selects(&self) -> Vec<&Select> {
        let mut selects = vec![self];
        for subquery in &self.subqueries {
            selects.extend(subquery.selects());
        }
        selects
    }

    // === Resolution ===

    fn resolution(&self) -> &Resolution {
        self.resolution.get_or_init(|| self.resolve())
    }

    fn resolve(&self) -> Resolution {
        let mut resolution = Resolution::default();

        for relation in &self.relations {
            let table = match relation {
                Relation::Named { schema, table, alias } => {
                    let name = alias
                        .as_ref()
                        .map_or_else(|| normalize_identifier(table), |a| a.name.clone());
                    let columns = alias.as_ref().map_or(&[][..], |a| &a.columns[..]);
                    match resolve_table(schema.as_deref(), table, &self.options.search_path, &self.catalog) {
                        Ok(found) => relation_table(&found.table, &name, columns),
                        Err(issue) => {
                            log::debug!("{issue}");
                            resolution.issues.push(issue);
                            Table::new(name)
                        }
                    }
                }
                Relation::Derived { subquery, alias } => {
                    let name = alias.as_ref().map(|a| a.name.clone()).unwrap_or_default();
                    let columns = alias.as_ref().map_or(&[][..], |a| &a.columns[..]);
                    match self.subqueries.get(*subquery) {
                        Some(subquery) => relation_table(subquery.output(), &name, columns),
                        None => Table::new(name),
                    }
                }
                Relation::Other => Table::new(""),
            };
            resolution.tables.push(table);
        }

        resolution
    }

    /// Tables read by this SELECT, in FROM/JOIN order, under their output
    /// names. Unresolved tables appear as empty tables.
    pub fn referenced_tables(&self) -> &[Table] {
        &self.resolution().tables
    }

    /// Parse and table-resolution problems of this SELECT
    pub fn issues(&self) -> Vec<SemanticIssue> {
        self.parse_issue
            .iter()
            .chain(self.resolution().issues.iter())
            .cloned()
            .collect()
    }

    // === Clauses ===

    pub fn distinct(&self) -> bool {
        matches!(
            self.ast.as_ref().and_then(|a| a.distinct.as_ref()),
            Some(Distinct::Distinct | Distinct::On(_))
        )
    }

    pub fn where_clause(&self) -> Option<&Expr> {
        self.ast.as_ref()?.selection.as_ref()
    }

    pub fn group_by(&self) -> &[Expr] {
        match self.ast.as_ref().map(|a| &a.group_by) {
            Some(GroupByExpr::Expressions(exprs, _)) => exprs.as_slice(),
            _ => &[],
        }
    }

    pub fn having(&self) -> Option<&Expr> {
        self.ast.as_ref()?.having.as_ref()
    }

    pub fn order_by(&self) -> &[OrderByExpr] {
        &self.modifiers.order_by
    }

    pub fn limit(&self) -> Option<u64> {
        self.modifiers.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.modifiers.offset
    }

    /// ON conditions of the joins, in order
    pub fn join_conditions(&self) -> Vec<&Expr> {
        let Some(ast) = &self.ast else {
            return Vec::new();
        };
        ast.from
            .iter()
            .flat_map(|t| t.joins.iter())
            .filter_map(|join| match crate::subquery::join_constraint(&join.join_operator) {
                Some(JoinConstraint::On(on)) => Some(on),
                _ => None,
            })
            .collect()
    }

    /// `column = column` conjuncts of the ON conditions and of WHERE
    pub fn join_equalities(&self) -> Vec<(&Expr, &Expr)> {
        let mut conjuncts = Vec::new();
        for condition in self.join_conditions() {
            split_conjuncts(condition, &mut conjuncts);
        }
        if let Some(selection) = self.where_clause() {
            split_conjuncts(selection, &mut conjuncts);
        }

        conjuncts
            .into_iter()
            .filter_map(|expr| match expr {
                Expr::BinaryOp {
                    left,
                    op: BinaryOperator::Eq,
                    right,
                } if column_ref(left).is_some() && column_ref(right).is_some() => Some((left.as_ref(), right.as_ref())),
                _ => None,
            })
            .collect()
    }

    // === Typing ===

    fn subquery_for(&self, query: &Query) -> Option<&Subquery> {
        let text = query.to_string();
        self.subqueries.iter().find(|s| s.sql() == text)
    }

    fn subquery_type(&self, query: &Query) -> ResultType {
        self.subquery_for(query)
            .and_then(Subquery::first_column)
            .map(|c| {
                ResultType::new(ScalarKind::from_sql_type(&c.data_type))
                    .with_nullable(c.nullable)
                    .with_constant(c.constant)
            })
            .unwrap_or_default()
    }

    fn with_checker<R>(&self, f: impl FnOnce(&TypeChecker<'_>) -> R) -> R {
        let typer = |query: &Query| self.subquery_type(query);
        let checker = TypeChecker::new(self.referenced_tables()).with_subquery_typer(&typer);
        f(&checker)
    }

    /// Type of an expression evaluated in this SELECT
    pub fn type_of(&self, expr: &Expr) -> ResultType {
        self.with_checker(|checker| checker.check(expr))
    }

    /// `(message, offending text)` pairs for the type errors of an
    /// expression evaluated in this SELECT
    pub fn collect_errors(&self, expr: &Expr) -> Vec<(String, String)> {
        self.type_of(expr).messages()
    }

    // === Output ===

    /// Output table: projected columns and the unique constraints that
    /// provably hold on them
    pub fn output(&self) -> &Table {
        self.output.get_or_init(|| self.compute_output())
    }

    fn compute_output(&self) -> Table {
        let mut output = Table::new("");
        let Some(ast) = &self.ast else {
            return output;
        };

        let tables = self.referenced_tables();
        let scope = TableScope::new(tables);
        let subquery_column = |query: &Query| self.subquery_for(query).and_then(Subquery::first_column).cloned();
        let columns = self.with_checker(|checker| projection::project(&ast.projection, scope, checker, &subquery_column));

        let inputs = ConstraintInputs {
            tables,
            equalities: self.resolved_equalities(scope),
            group_by: self.grouped_columns(scope),
            distinct: self.distinct(),
        };
        let constraints = constraints::propagate(&inputs, &columns);

        for column in columns {
            output.push_column(column);
        }
        output.set_unique_constraints(constraints);
        output
    }

    fn constraint_column(expr: &Expr, scope: TableScope<'_>) -> Option<UniqueConstraintColumn> {
        let (qualifier, name) = column_ref(expr)?;
        let table_idx = scope.owner(qualifier.as_deref(), &name);
        Some(UniqueConstraintColumn::new(name, table_idx))
    }

    fn resolved_equalities(&self, scope: TableScope<'_>) -> Vec<(UniqueConstraintColumn, UniqueConstraintColumn)> {
        self.join_equalities()
            .into_iter()
            .filter_map(|(left, right)| {
                Some((
                    Self::constraint_column(left, scope)?,
                    Self::constraint_column(right, scope)?,
                ))
            })
            .collect()
    }

    fn grouped_columns(&self, scope: TableScope<'_>) -> Option<Vec<UniqueConstraintColumn>> {
        let items = self.group_by();
        if items.is_empty() {
            return None;
        }
        items
            .iter()
            .map(|item| Self::constraint_column(item, scope))
            .collect()
    }

    /// Output column by name
    pub fn output_column(&self, name: &str) -> Option<&Column> {
        self.output().column(name)
    }

    // === Rewriting ===

    /// A new SELECT with every direct subquery replaced by a placeholder:
    /// `__subqN` in FROM/JOIN, `(NULL)` after IN/EXISTS and `NULL`
    /// elsewhere.
    pub fn strip_subqueries(&self) -> Result<Select> {
        let mut sql = self.sql.clone();
        let mut counter = 1;
        for subquery in &self.subqueries {
            let placeholder = subquery.clause().placeholder(&mut counter);
            sql = replace_subquery(&sql, subquery.sql(), &placeholder);
        }

        let mut stripped = Builder::new(self.options.clone()).build_select_text(&sql, self.catalog.clone(), 0)?;
        *stripped.modifiers_mut() = self.modifiers.clone();
        Ok(stripped)
    }
}

/// Replace the first parenthesized occurrence of a subquery's text
fn replace_subquery(sql: &str, subquery: &str, placeholder: &str) -> String {
    let pattern = format!(r"\(\s*{}\s*\)", regex::escape(subquery));
    match Regex::new(&pattern) {
        Ok(re) if re.is_match(sql) => re.replacen(sql, 1, NoExpand(placeholder)).into_owned(),
        _ => sql.replacen(subquery, placeholder, 1),
    }
}

/// Top-level AND operands, looking through parentheses
fn split_conjuncts<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    match expr {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => {
            split_conjuncts(left, out);
            split_conjuncts(right, out);
        }
        Expr::Nested(inner) => split_conjuncts(inner, out),
        _ => out.push(expr),
    }
}
