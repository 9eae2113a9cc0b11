//! Query structure builder
//!
//! Turns `sqlparser` statements into set-operation trees:
//! - binds CTEs left to right into the query-local schema
//! - builds every SELECT's subqueries and derived tables eagerly
//! - degrades text that does not parse into an empty SELECT
//! - enforces the nesting depth limit

use crate::query::Cte;
use crate::select::{Relation, RelationAlias, relation_table};
use crate::set_operation::{BinaryOperation, Modifiers};
use crate::subquery::{self, Discovered};
use crate::{AnalysisOptions, Select, SetOperation, Subquery};
use sqlparser::ast::{
    Query, SetExpr, SetOperator, SetQuantifier, Statement, TableAlias, TableFactor, TableWithJoins, With,
};
use sqlparser::ast::Select as SelectNode;
use sqlparser::dialect::Dialect;
use sqlparser::parser::{Parser, ParserError};
use sqlscope_catalog::{CTE_SCHEMA, Catalog};
use sqlscope_diagnostics::{AnalysisError, Result, SemanticIssue};
use sqlscope_types::semantic::{ident_name, object_name_parts};
use std::rc::Rc;

/// A built query body with the CTEs declared on it
#[derive(Debug)]
pub(crate) struct Scoped {
    pub ctes: Vec<Cte>,
    pub tree: SetOperation,
}

pub(crate) struct Builder {
    options: Rc<AnalysisOptions>,
    dialect: Box<dyn Dialect>,
}

impl Builder {
    pub fn new(options: Rc<AnalysisOptions>) -> Self {
        let dialect = options.dialect.parser_dialect();
        Self { options, dialect }
    }

    /// Depth of a nested body, or an error past the limit
    fn enter(&self, depth: usize) -> Result<usize> {
        let next = depth + 1;
        if next > self.options.max_depth {
            return Err(AnalysisError::RecursionLimitExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(next)
    }

    fn parse_statement(&self, sql: &str) -> std::result::Result<Option<Query>, ParserError> {
        let statements = Parser::new(self.dialect.as_ref())
            .try_with_sql(sql)?
            .parse_statements()?;
        Ok(match statements.into_iter().next() {
            Some(Statement::Query(query)) => Some(*query),
            _ => None,
        })
    }

    /// The issue a failed parse is reported as; parser recursion limits
    /// are fatal
    fn parse_failure(&self, sql: &str, result: std::result::Result<Option<Query>, ParserError>) -> Result<SemanticIssue> {
        let message = match result {
            Err(ParserError::RecursionLimitExceeded) => {
                return Err(AnalysisError::RecursionLimitExceeded {
                    limit: self.options.max_depth,
                });
            }
            Err(err) => err.to_string(),
            Ok(_) if sql.trim().is_empty() => "empty query text".to_string(),
            Ok(_) => "not a SELECT statement".to_string(),
        };
        Ok(SemanticIssue::ParseFailure { message })
    }

    /// Parse and build query text
    pub fn parse(&self, sql: &str, catalog: Rc<Catalog>, depth: usize) -> Result<Scoped> {
        match self.parse_statement(sql) {
            Ok(Some(query)) => self.build_query(&query, catalog, depth),
            failed => {
                let issue = self.parse_failure(sql, failed)?;
                let select = self.degraded(sql, issue, &catalog, depth)?;
                Ok(Scoped {
                    ctes: Vec::new(),
                    tree: SetOperation::Select(Box::new(select)),
                })
            }
        }
    }

    /// Parse and build the text of a single SELECT block
    pub fn build_select_text(&self, sql: &str, catalog: Rc<Catalog>, depth: usize) -> Result<Select> {
        let failed = match self.parse_statement(sql) {
            Ok(Some(query)) => match query.body.as_ref() {
                SetExpr::Select(select) if query.with.is_none() => {
                    let mut built = self.build_select(select, &catalog, depth)?;
                    built.modifiers_mut().overlay(Modifiers::from_query(&query));
                    return Ok(built);
                }
                _ => Ok(None),
            },
            other => other,
        };
        let issue = self.parse_failure(sql, failed)?;
        self.degraded(sql, issue, &catalog, depth)
    }

    pub fn build_query(&self, query: &Query, catalog: Rc<Catalog>, depth: usize) -> Result<Scoped> {
        let (ctes, scope) = match &query.with {
            Some(with) => self.build_ctes(with, catalog, depth)?,
            None => (Vec::new(), catalog),
        };

        let mut tree = self.build_body(&query.body, &scope, depth)?;
        tree.apply_modifiers(Modifiers::from_query(query));
        Ok(Scoped { ctes, tree })
    }

    /// Build CTEs in order. Each one sees the CTEs before it; the returned
    /// catalog sees all of them.
    fn build_ctes(&self, with: &With, catalog: Rc<Catalog>, depth: usize) -> Result<(Vec<Cte>, Rc<Catalog>)> {
        if with.recursive {
            log::debug!("WITH RECURSIVE is analyzed as a plain WITH");
        }

        let mut scope = catalog;
        let mut ctes = Vec::with_capacity(with.cte_tables.len());
        for cte in &with.cte_tables {
            let alias = relation_alias(&cte.alias);
            let body = self.build_query(&cte.query, scope.clone(), self.enter(depth)?)?;
            let table = relation_table(body.tree.output(), &alias.name, &alias.columns);

            log::debug!("bound CTE {} ({} columns)", alias.name, table.columns().len());
            scope = Rc::new(scope.with_table(CTE_SCHEMA, table));
            ctes.push(Cte::new(alias.name, body.ctes, body.tree));
        }
        Ok((ctes, scope))
    }

    fn build_body(&self, body: &SetExpr, catalog: &Rc<Catalog>, depth: usize) -> Result<SetOperation> {
        match body {
            SetExpr::Select(select) => Ok(SetOperation::Select(Box::new(self.build_select(select, catalog, depth)?))),
            SetExpr::Query(query) => {
                let scoped = self.build_query(query, catalog.clone(), depth)?;
                if !scoped.ctes.is_empty() {
                    log::debug!("{} CTEs of a parenthesized operand are not kept", scoped.ctes.len());
                }
                Ok(scoped.tree)
            }
            SetExpr::SetOperation {
                op,
                set_quantifier,
                left,
                right,
            } => {
                let left = self.build_body(left, catalog, depth)?;
                let right = self.build_body(right, catalog, depth)?;
                let all = matches!(set_quantifier, SetQuantifier::All | SetQuantifier::AllByName);
                let node = BinaryOperation::new(body.to_string(), left, right, all);
                Ok(match op {
                    SetOperator::Union => SetOperation::Union(node),
                    SetOperator::Intersect => SetOperation::Intersect(node),
                    SetOperator::Except | SetOperator::Minus => SetOperation::Except(node),
                })
            }
            other => {
                let issue = SemanticIssue::ParseFailure {
                    message: "unsupported query body".to_string(),
                };
                let select = self.degraded(&other.to_string(), issue, catalog, depth)?;
                Ok(SetOperation::Select(Box::new(select)))
            }
        }
    }

    fn build_select(&self, select: &SelectNode, catalog: &Rc<Catalog>, depth: usize) -> Result<Select> {
        let found = subquery::discover(select);

        let mut subqueries = Vec::with_capacity(found.len());
        for Discovered { query, clause } in &found {
            let body = self.build_query(query, catalog.clone(), self.enter(depth)?)?;
            subqueries.push(Subquery::new(*clause, query.to_string(), body.ctes, body.tree));
        }

        let mut relations = Vec::new();
        for table in &select.from {
            collect_relations(table, &found, &mut relations);
        }

        Ok(Select::parsed(
            select.clone(),
            relations,
            subqueries,
            catalog.clone(),
            self.options.clone(),
        ))
    }

    /// An empty SELECT standing in for text that did not parse, with the
    /// subqueries its tokens reveal
    fn degraded(&self, sql: &str, issue: SemanticIssue, catalog: &Rc<Catalog>, depth: usize) -> Result<Select> {
        log::warn!("{issue}; analyzing as an empty SELECT");

        let mut subqueries = Vec::new();
        for (text, clause) in subquery::scan_subqueries(sql, self.dialect.as_ref()) {
            let body = self.parse(&text, catalog.clone(), self.enter(depth)?)?;
            subqueries.push(Subquery::new(clause, text, body.ctes, body.tree));
        }

        Ok(Select::unparsed(
            sql.trim().to_string(),
            issue,
            subqueries,
            catalog.clone(),
            self.options.clone(),
        ))
    }
}

fn relation_alias(alias: &TableAlias) -> RelationAlias {
    RelationAlias {
        name: ident_name(&alias.name),
        columns: alias.columns.iter().map(|c| ident_name(&c.name)).collect(),
    }
}

fn collect_relations(table: &TableWithJoins, found: &[Discovered<'_>], relations: &mut Vec<Relation>) {
    collect_factor(&table.relation, found, relations);
    for join in &table.joins {
        collect_factor(&join.relation, found, relations);
    }
}

fn collect_factor(factor: &TableFactor, found: &[Discovered<'_>], relations: &mut Vec<Relation>) {
    match factor {
        TableFactor::Table { name, alias, .. } => {
            let mut parts = object_name_parts(name);
            let Some(table) = parts.pop() else {
                relations.push(Relation::Other);
                return;
            };
            relations.push(Relation::Named {
                schema: parts.pop(),
                table,
                alias: alias.as_ref().map(relation_alias),
            });
        }
        TableFactor::Derived { subquery, alias, .. } => {
            let position = found.iter().position(|d| std::ptr::eq(d.query, subquery.as_ref()));
            relations.push(match position {
                Some(subquery) => Relation::Derived {
                    subquery,
                    alias: alias.as_ref().map(relation_alias),
                },
                None => Relation::Other,
            });
        }
        TableFactor::NestedJoin { table_with_joins, .. } => collect_relations(table_with_joins, found, relations),
        _ => relations.push(Relation::Other),
    }
}
