//! Subquery discovery
//!
//! A SELECT's direct subqueries are found by walking its AST. Text that does
//! not parse is scanned token by token instead, with a clause stack per
//! parenthesis level. Both paths tag a subquery the same way:
//!
//! 1. `IN (SELECT ...)` is `IN`
//! 2. `EXISTS (SELECT ...)` is `EXISTS`
//! 3. a direct operand of `= <> < > <= >=`, possibly through ANY/ALL/SOME,
//!    is `COMPARISON`
//! 4. anything else takes the clause it appears in (ON counts as JOIN)

use crate::query::Cte;
use crate::{Select, SetOperation};
use serde::Serialize;
use sqlparser::ast::{
    BinaryOperator, Expr, FunctionArg, FunctionArgExpr, FunctionArguments, JoinConstraint, JoinOperator, Query,
    SelectItem, TableFactor, TableWithJoins,
};
use sqlparser::ast::Select as SelectNode;
use sqlparser::dialect::Dialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer};
use sqlscope_catalog::{Column, Table};
use std::fmt;

/// Where a subquery appears in its enclosing SELECT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubqueryClause {
    From,
    Join,
    Where,
    Having,
    Select,
    In,
    Exists,
    Comparison,
}

impl SubqueryClause {
    /// Text standing in for the subquery when it is stripped out.
    ///
    /// FROM/JOIN placeholders are numbered through `counter`.
    pub fn placeholder(&self, counter: &mut usize) -> String {
        match self {
            SubqueryClause::From | SubqueryClause::Join => {
                let name = format!("__subq{counter}");
                *counter += 1;
                name
            }
            SubqueryClause::In | SubqueryClause::Exists => "(NULL)".to_string(),
            _ => "NULL".to_string(),
        }
    }

    /// Returns true for derived tables
    pub fn is_relation(&self) -> bool {
        matches!(self, SubqueryClause::From | SubqueryClause::Join)
    }
}

impl fmt::Display for SubqueryClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubqueryClause::From => "FROM",
            SubqueryClause::Join => "JOIN",
            SubqueryClause::Where => "WHERE",
            SubqueryClause::Having => "HAVING",
            SubqueryClause::Select => "SELECT",
            SubqueryClause::In => "IN",
            SubqueryClause::Exists => "EXISTS",
            SubqueryClause::Comparison => "COMPARISON",
        };
        write!(f, "{name}")
    }
}

/// A built subquery and the clause it was found in
#[derive(Debug)]
pub struct Subquery {
    clause: SubqueryClause,
    sql: String,
    ctes: Vec<Cte>,
    tree: SetOperation,
}

impl Subquery {
    pub(crate) fn new(clause: SubqueryClause, sql: String, ctes: Vec<Cte>, tree: SetOperation) -> Self {
        Self {
            clause,
            sql,
            ctes,
            tree,
        }
    }

    pub fn clause(&self) -> SubqueryClause {
        self.clause
    }

    /// Subquery text, without the surrounding parentheses
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// CTEs declared inside the subquery
    pub fn ctes(&self) -> &[Cte] {
        &self.ctes
    }

    pub fn tree(&self) -> &SetOperation {
        &self.tree
    }

    pub fn output(&self) -> &Table {
        self.tree.output()
    }

    /// First output column; the value of a scalar subquery
    pub fn first_column(&self) -> Option<&Column> {
        self.output().columns().first()
    }

    /// Every SELECT inside the subquery, CTE bodies first
    pub fn selects(&self) -> Vec<&Select> {
        let mut selects: Vec<&Select> = self.ctes.iter().flat_map(|c| c.tree().selects()).collect();
        selects.extend(self.tree.selects());
        selects
    }
}

// === AST discovery ===

/// A subquery found in a SELECT's AST
#[derive(Debug, Clone, Copy)]
pub(crate) struct Discovered<'a> {
    pub query: &'a Query,
    pub clause: SubqueryClause,
}

/// Direct subqueries of a SELECT, in source order
pub(crate) fn discover(select: &SelectNode) -> Vec<Discovered<'_>> {
    let mut found = Vec::new();

    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                walk_expr(expr, SubqueryClause::Select, &mut found);
            }
            _ => {}
        }
    }
    for table in &select.from {
        walk_table_with_joins(table, SubqueryClause::From, &mut found);
    }
    if let Some(selection) = &select.selection {
        walk_expr(selection, SubqueryClause::Where, &mut found);
    }
    if let Some(having) = &select.having {
        walk_expr(having, SubqueryClause::Having, &mut found);
    }

    for d in &found {
        log::trace!("found {} subquery: {}", d.clause, d.query);
    }
    found
}

fn walk_table_with_joins<'a>(table: &'a TableWithJoins, clause: SubqueryClause, found: &mut Vec<Discovered<'a>>) {
    walk_table_factor(&table.relation, clause, found);
    for join in &table.joins {
        walk_table_factor(&join.relation, SubqueryClause::Join, found);
        if let Some(JoinConstraint::On(on)) = join_constraint(&join.join_operator) {
            walk_expr(on, SubqueryClause::Join, found);
        }
    }
}

fn walk_table_factor<'a>(factor: &'a TableFactor, clause: SubqueryClause, found: &mut Vec<Discovered<'a>>) {
    match factor {
        TableFactor::Derived { subquery, .. } => found.push(Discovered {
            query: subquery,
            clause,
        }),
        TableFactor::NestedJoin { table_with_joins, .. } => walk_table_with_joins(table_with_joins, clause, found),
        _ => {}
    }
}

/// Constraint of a join, if the operator carries one
pub(crate) fn join_constraint(op: &JoinOperator) -> Option<&JoinConstraint> {
    match op {
        JoinOperator::Join(c)
        | JoinOperator::Inner(c)
        | JoinOperator::Left(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::Right(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c)
        | JoinOperator::CrossJoin(c)
        | JoinOperator::Semi(c)
        | JoinOperator::LeftSemi(c)
        | JoinOperator::RightSemi(c)
        | JoinOperator::LeftAnti(c)
        | JoinOperator::RightAnti(c) => Some(c),
        _ => None,
    }
}

fn is_comparison(op: &BinaryOperator) -> bool {
    matches!(
        op,
        BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::Gt
            | BinaryOperator::LtEq
            | BinaryOperator::GtEq
    )
}

fn walk_comparison_operand<'a>(
    expr: &'a Expr,
    clause: SubqueryClause,
    quantified: bool,
    found: &mut Vec<Discovered<'a>>,
) {
    match expr {
        Expr::Subquery(query) => found.push(Discovered {
            query,
            clause: SubqueryClause::Comparison,
        }),
        Expr::Nested(inner) if quantified => walk_comparison_operand(inner, clause, quantified, found),
        _ => walk_expr(expr, clause, found),
    }
}

fn walk_expr<'a>(expr: &'a Expr, clause: SubqueryClause, found: &mut Vec<Discovered<'a>>) {
    match expr {
        Expr::Subquery(query) => found.push(Discovered { query, clause }),
        Expr::InSubquery { expr, subquery, .. } => {
            walk_expr(expr, clause, found);
            found.push(Discovered {
                query: subquery,
                clause: SubqueryClause::In,
            });
        }
        Expr::Exists { subquery, .. } => found.push(Discovered {
            query: subquery,
            clause: SubqueryClause::Exists,
        }),

        Expr::BinaryOp { left, op, right } if is_comparison(op) => {
            walk_comparison_operand(left, clause, false, found);
            walk_comparison_operand(right, clause, false, found);
        }
        Expr::AnyOp { left, right, .. } | Expr::AllOp { left, right, .. } => {
            walk_comparison_operand(left, clause, false, found);
            walk_comparison_operand(right, clause, true, found);
        }
        Expr::BinaryOp { left, right, .. }
        | Expr::IsDistinctFrom(left, right)
        | Expr::IsNotDistinctFrom(left, right) => {
            walk_expr(left, clause, found);
            walk_expr(right, clause, found);
        }

        Expr::UnaryOp { expr, .. }
        | Expr::Nested(expr)
        | Expr::IsNull(expr)
        | Expr::IsNotNull(expr)
        | Expr::IsTrue(expr)
        | Expr::IsNotTrue(expr)
        | Expr::IsFalse(expr)
        | Expr::IsNotFalse(expr)
        | Expr::IsUnknown(expr)
        | Expr::IsNotUnknown(expr)
        | Expr::Cast { expr, .. } => walk_expr(expr, clause, found),

        Expr::Between { expr, low, high, .. } => {
            walk_expr(expr, clause, found);
            walk_expr(low, clause, found);
            walk_expr(high, clause, found);
        }
        Expr::InList { expr, list, .. } => {
            walk_expr(expr, clause, found);
            for item in list {
                walk_expr(item, clause, found);
            }
        }
        Expr::Like { expr, pattern, .. }
        | Expr::ILike { expr, pattern, .. }
        | Expr::SimilarTo { expr, pattern, .. } => {
            walk_expr(expr, clause, found);
            walk_expr(pattern, clause, found);
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(operand) = operand {
                walk_expr(operand, clause, found);
            }
            for when in conditions {
                walk_expr(&when.condition, clause, found);
                walk_expr(&when.result, clause, found);
            }
            if let Some(else_result) = else_result {
                walk_expr(else_result, clause, found);
            }
        }
        Expr::Tuple(items) => {
            for item in items {
                walk_expr(item, clause, found);
            }
        }
        Expr::Function(func) => match &func.args {
            FunctionArguments::Subquery(query) => found.push(Discovered { query, clause }),
            FunctionArguments::List(list) => {
                for arg in &list.args {
                    let arg = match arg {
                        FunctionArg::Named { arg, .. } | FunctionArg::ExprNamed { arg, .. } => arg,
                        FunctionArg::Unnamed(arg) => arg,
                    };
                    if let FunctionArgExpr::Expr(expr) = arg {
                        walk_expr(expr, clause, found);
                    }
                }
            }
            FunctionArguments::None => {}
        },
        _ => {}
    }
}

// === Token fallback ===

/// Clause state of one parenthesis level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Tagged(SubqueryClause),
    /// GROUP BY, ORDER BY and the like; subqueries here are not reported
    Untracked,
}

fn clause_keyword(keyword: Keyword) -> Option<Clause> {
    let clause = match keyword {
        Keyword::SELECT => Clause::Tagged(SubqueryClause::Select),
        Keyword::FROM => Clause::Tagged(SubqueryClause::From),
        Keyword::JOIN | Keyword::ON => Clause::Tagged(SubqueryClause::Join),
        Keyword::WHERE => Clause::Tagged(SubqueryClause::Where),
        Keyword::HAVING => Clause::Tagged(SubqueryClause::Having),
        Keyword::GROUP | Keyword::ORDER | Keyword::LIMIT | Keyword::OFFSET | Keyword::WINDOW | Keyword::QUALIFY => {
            Clause::Untracked
        }
        _ => return None,
    };
    Some(clause)
}

#[derive(Debug)]
struct Frame {
    /// Clause of the enclosing level when this parenthesis opened
    enclosing: Clause,
    /// Clause most recently entered inside this level
    current: Clause,
    /// Index of the opening parenthesis
    open: usize,
    subquery: bool,
    lead: Option<SubqueryClause>,
}

fn is_keyword(token: Option<&Token>, keywords: &[Keyword]) -> bool {
    matches!(token, Some(Token::Word(w)) if keywords.contains(&w.keyword))
}

fn is_comparison_token(token: Option<&Token>) -> bool {
    matches!(
        token,
        Some(Token::Eq | Token::Neq | Token::Lt | Token::Gt | Token::LtEq | Token::GtEq)
    )
}

fn ends_clause(token: &Token) -> bool {
    matches!(token, Token::Word(w) if clause_keyword(w.keyword).is_some())
}

/// True if `token` closes a comparison operand that ends just before it
fn ends_operand(token: Option<&Token>) -> bool {
    match token {
        None | Some(Token::RParen | Token::Comma | Token::SemiColon | Token::EOF) => true,
        Some(token) => {
            ends_clause(token)
                || is_keyword(
                    Some(token),
                    &[
                        Keyword::AND,
                        Keyword::OR,
                        Keyword::XOR,
                        Keyword::WHEN,
                        Keyword::THEN,
                        Keyword::ELSE,
                        Keyword::END,
                        Keyword::UNION,
                        Keyword::INTERSECT,
                        Keyword::EXCEPT,
                    ],
                )
        }
    }
}

/// True if `token` opens a comparison operand that starts just after it
fn starts_operand(token: Option<&Token>) -> bool {
    match token {
        None | Some(Token::LParen | Token::Comma) => true,
        Some(token) => {
            ends_clause(token)
                || is_keyword(
                    Some(token),
                    &[
                        Keyword::AND,
                        Keyword::OR,
                        Keyword::XOR,
                        Keyword::NOT,
                        Keyword::CASE,
                        Keyword::WHEN,
                        Keyword::THEN,
                        Keyword::ELSE,
                    ],
                )
        }
    }
}

struct TokenStream<'a> {
    tokens: &'a [Token],
}

impl<'a> TokenStream<'a> {
    fn prev(&self, i: usize) -> Option<(usize, &'a Token)> {
        self.tokens[..i]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, t)| !matches!(t, Token::Whitespace(_)))
    }

    fn next(&self, i: usize) -> Option<&'a Token> {
        self.tokens[i + 1..].iter().find(|t| !matches!(t, Token::Whitespace(_)))
    }

    /// Tag implied by what precedes an opening parenthesis. A comparison
    /// lead still needs the operand to end at the closing parenthesis.
    fn lead(&self, i: usize) -> Option<SubqueryClause> {
        let (j, prev) = self.prev(i)?;
        if is_keyword(Some(prev), &[Keyword::IN]) {
            return Some(SubqueryClause::In);
        }
        if is_keyword(Some(prev), &[Keyword::EXISTS]) {
            return Some(SubqueryClause::Exists);
        }
        if is_comparison_token(Some(prev)) {
            return Some(SubqueryClause::Comparison);
        }
        if is_keyword(Some(prev), &[Keyword::ANY, Keyword::ALL, Keyword::SOME])
            && is_comparison_token(self.prev(j).map(|(_, t)| t))
        {
            return Some(SubqueryClause::Comparison);
        }
        None
    }

    fn text(&self, from: usize, to: usize) -> String {
        self.tokens[from..to]
            .iter()
            .map(ToString::to_string)
            .collect::<String>()
            .trim()
            .to_string()
    }
}

/// Direct subqueries of a SELECT's text, found without parsing it.
///
/// Returns each subquery's text (without parentheses) and its tag. Text that
/// cannot even be tokenized has no subqueries.
pub fn scan_subqueries(sql: &str, dialect: &dyn Dialect) -> Vec<(String, SubqueryClause)> {
    let tokens = match Tokenizer::new(dialect, sql).tokenize() {
        Ok(tokens) => tokens,
        Err(err) => {
            log::debug!("cannot tokenize subquery text: {err}");
            return Vec::new();
        }
    };
    let stream = TokenStream { tokens: &tokens };

    let mut found = Vec::new();
    let mut stack = vec![Frame {
        enclosing: Clause::Untracked,
        current: Clause::Untracked,
        open: 0,
        subquery: false,
        lead: None,
    }];

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => {
                let clause = stack.last().map_or(Clause::Untracked, |f| f.current);
                stack.push(Frame {
                    enclosing: clause,
                    current: clause,
                    open: i,
                    subquery: is_keyword(stream.next(i), &[Keyword::SELECT, Keyword::WITH]),
                    lead: stream.lead(i),
                });
            }
            Token::RParen if stack.len() > 1 => {
                let Some(frame) = stack.pop() else { continue };
                let direct = !stack.iter().any(|f| f.subquery);
                if !frame.subquery || !direct {
                    continue;
                }
                let Clause::Tagged(enclosing) = frame.enclosing else { continue };
                let after = stream.next(i);
                let before = stream.prev(frame.open).map(|(_, t)| t);
                let tag = match frame.lead {
                    Some(SubqueryClause::Comparison) if ends_operand(after) => SubqueryClause::Comparison,
                    Some(SubqueryClause::Comparison) => enclosing,
                    Some(lead) => lead,
                    None if is_comparison_token(after) && starts_operand(before) => SubqueryClause::Comparison,
                    None => enclosing,
                };
                let text = stream.text(frame.open + 1, i);
                log::trace!("scanned {tag} subquery: {text}");
                found.push((text, tag));
            }
            Token::Word(word) => {
                if let (Some(clause), Some(frame)) = (clause_keyword(word.keyword), stack.last_mut()) {
                    frame.current = clause;
                }
            }
            _ => {}
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::ast::{SetExpr, Statement};
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;

    fn ast_tags(sql: &str) -> Vec<SubqueryClause> {
        let statements = Parser::parse_sql(&GenericDialect {}, sql).unwrap();
        let Statement::Query(query) = &statements[0] else {
            panic!("not a query");
        };
        let SetExpr::Select(select) = query.body.as_ref() else {
            panic!("not a select");
        };
        discover(select).iter().map(|d| d.clause).collect()
    }

    fn token_tags(sql: &str) -> Vec<SubqueryClause> {
        scan_subqueries(sql, &GenericDialect {})
            .into_iter()
            .map(|(_, clause)| clause)
            .collect()
    }

    #[test]
    fn test_placeholders() {
        let mut counter = 1;
        assert_eq!(SubqueryClause::From.placeholder(&mut counter), "__subq1");
        assert_eq!(SubqueryClause::Join.placeholder(&mut counter), "__subq2");
        assert_eq!(SubqueryClause::In.placeholder(&mut counter), "(NULL)");
        assert_eq!(SubqueryClause::Where.placeholder(&mut counter), "NULL");
        assert_eq!(counter, 3);
    }

    #[test]
    fn test_tags_agree() {
        let sql = "SELECT (SELECT 1), a FROM (SELECT a FROM t) x \
                   JOIN (SELECT b FROM u) y ON x.a = (SELECT max(b) FROM u) \
                   WHERE a IN (SELECT a FROM v) AND EXISTS (SELECT 1 FROM w) \
                   AND (SELECT 2) > a AND a = ANY (SELECT a FROM v) \
                   GROUP BY a HAVING count(*) > 1 OR a IN (1, 2)";
        let expected = vec![
            SubqueryClause::Select,
            SubqueryClause::From,
            SubqueryClause::Join,
            SubqueryClause::Comparison,
            SubqueryClause::In,
            SubqueryClause::Exists,
            SubqueryClause::Comparison,
            SubqueryClause::Comparison,
        ];
        assert_eq!(ast_tags(sql), expected);
        assert_eq!(token_tags(sql), expected);
    }

    #[test]
    fn test_enclosing_clause_survives_inner_keywords() {
        let sql = "SELECT * FROM (SELECT a FROM t WHERE a > 1) x JOIN (SELECT b FROM u) y ON x.a = y.b";
        assert_eq!(token_tags(sql), vec![SubqueryClause::From, SubqueryClause::Join]);
        assert_eq!(token_tags(sql), ast_tags(sql));
    }

    #[test]
    fn test_comparison_needs_whole_operand() {
        for sql in [
            "SELECT a FROM t WHERE a = (SELECT 1) + 2",
            "SELECT a FROM t WHERE 2 * (SELECT 1) > a",
            "SELECT a FROM t WHERE (SELECT 1) + 2 = a AND a = (SELECT 3)",
            "SELECT a FROM t WHERE NOT (SELECT true) = a OR a <> (SELECT 1) ORDER BY a",
        ] {
            assert_eq!(token_tags(sql), ast_tags(sql), "{sql}");
        }
        assert_eq!(
            token_tags("SELECT a FROM t WHERE a = (SELECT 1) + 2"),
            vec![SubqueryClause::Where]
        );
    }

    #[test]
    fn test_untracked_clauses_are_skipped() {
        let sql = "SELECT a FROM t ORDER BY a = (SELECT 1), a IN (SELECT b FROM u)";
        assert!(token_tags(sql).is_empty());
        assert!(ast_tags(sql).is_empty());
    }

    #[test]
    fn test_only_direct_subqueries() {
        let sql = "SELECT a FROM t WHERE a IN (SELECT a FROM u WHERE EXISTS (SELECT 1 FROM v))";
        assert_eq!(ast_tags(sql), vec![SubqueryClause::In]);
        let scanned = scan_subqueries(sql, &GenericDialect {});
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].0, "SELECT a FROM u WHERE EXISTS (SELECT 1 FROM v)");
    }

    #[test]
    fn test_scan_broken_text() {
        let scanned = scan_subqueries("SELECT FROM WHERE x NOT IN (SELECT a FROM b", &GenericDialect {});
        assert!(scanned.is_empty());

        let scanned = scan_subqueries("SELEC a FROM t WHERE x IN (SELECT a FROM b) AND", &GenericDialect {});
        assert_eq!(scanned, vec![("SELECT a FROM b".to_string(), SubqueryClause::In)]);
    }
}
