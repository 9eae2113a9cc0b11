//! SQL expression type checker
//!
//! This module types `sqlparser` expressions against the referenced tables
//! of a SELECT. It provides:
//! - Literal, column and operator typing
//! - Implicit string-to-number and string-to-date casts
//! - Aggregate and scalar function return types
//! - Diagnostics for incompatible operands, accumulated bottom-up
//!
//! The checker never fails: a problem is recorded on the result and typing
//! continues with the best kind available, so a boolean connective over a
//! broken operand is still boolean.

use crate::coercion::{comparable, error_message, parse_date, to_date, to_number, Comparison};
use crate::semantic::{column_ref, object_name_parts, resolve_column};
use crate::{ResultType, ScalarKind};
use sqlparser::ast::{
    BinaryOperator, CaseWhen, DataType, Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments, Query,
    TypedString, UnaryOperator, Value,
};
use sqlscope_catalog::Table;
use sqlscope_diagnostics::{Diagnostic, ErrorCode, SemanticIssue, SQL0200, SQL0201, SQL0202, SQL0203, SQL0204};

/// Callback typing a scalar subquery by its first output column
pub type SubqueryTyper<'a> = dyn Fn(&Query) -> ResultType + 'a;

/// Expression type checker bound to a SELECT's referenced tables
pub struct TypeChecker<'a> {
    tables: &'a [Table],
    subquery_typer: Option<&'a SubqueryTyper<'a>>,
}

impl<'a> TypeChecker<'a> {
    /// Create a checker over the given referenced tables
    pub fn new(tables: &'a [Table]) -> Self {
        Self {
            tables,
            subquery_typer: None,
        }
    }

    /// Type scalar subqueries with the given callback instead of `unknown`
    pub fn with_subquery_typer(mut self, typer: &'a SubqueryTyper<'a>) -> Self {
        self.subquery_typer = Some(typer);
        self
    }

    /// `(message, offending text)` pairs for the errors in an expression
    pub fn collect_errors(&self, expr: &Expr) -> Vec<(String, String)> {
        self.check(expr).messages()
    }

    /// Type an expression
    pub fn check(&self, expr: &Expr) -> ResultType {
        match expr {
            Expr::Value(value) => check_value(&value.value),
            Expr::Identifier(_) | Expr::CompoundIdentifier(_) => self.check_column(expr),
            Expr::Nested(inner) => self.check(inner),

            Expr::UnaryOp { op, expr: inner } => self.check_unary(expr, op, inner),
            Expr::BinaryOp { left, op, right } => self.check_binary(expr, left, op, right),

            Expr::IsNull(inner) | Expr::IsNotNull(inner) => {
                let operand = self.check(inner);
                ResultType::new(ScalarKind::Boolean)
                    .with_nullable(false)
                    .with_constant(operand.constant)
                    .with_children([operand])
            }
            Expr::IsTrue(inner)
            | Expr::IsNotTrue(inner)
            | Expr::IsFalse(inner)
            | Expr::IsNotFalse(inner)
            | Expr::IsUnknown(inner)
            | Expr::IsNotUnknown(inner) => {
                let operand = self.check(inner);
                let mut result = ResultType::new(ScalarKind::Boolean)
                    .with_nullable(false)
                    .with_constant(operand.constant);
                if !accepts_boolean(&operand) {
                    result.push_diagnostic(operand_error("boolean", operand.kind, expr));
                }
                result.with_children([operand])
            }
            Expr::IsDistinctFrom(left, right) | Expr::IsNotDistinctFrom(left, right) => {
                let (left, right) = (self.check(left), self.check(right));
                self.comparison(expr, Comparison::Equality, left, right)
                    .with_nullable(false)
            }

            Expr::InList { expr: target, list, .. } => self.check_in_list(expr, target, list),
            Expr::InSubquery { expr: target, subquery, .. } => {
                let target = self.check(target);
                let subquery = self.check_subquery(subquery);
                let mut result = ResultType::new(ScalarKind::Boolean).with_nullable(target.nullable);
                if !comparable(&target, &subquery, Comparison::Equality) {
                    result.push_diagnostic(comparison_error(target.kind, subquery.kind, expr));
                }
                result.with_children([target])
            }
            Expr::Between { expr: target, low, high, .. } => self.check_between(expr, target, low, high),
            Expr::Like { expr: target, pattern, .. }
            | Expr::ILike { expr: target, pattern, .. }
            | Expr::SimilarTo { expr: target, pattern, .. } => {
                let (target, pattern) = (self.check(target), self.check(pattern));
                let mut result = ResultType::new(ScalarKind::Boolean)
                    .with_nullable(target.nullable || pattern.nullable)
                    .with_constant(target.constant && pattern.constant);
                for operand in [&target, &pattern] {
                    if !accepts_string(operand) {
                        result.push_diagnostic(operand_error("string", operand.kind, expr));
                    }
                }
                result.with_children([target, pattern])
            }
            Expr::AnyOp { left, compare_op, right, .. } | Expr::AllOp { left, compare_op, right, .. } => {
                let (left, right) = (self.check(left), self.check(right));
                self.comparison(expr, comparison_kind(compare_op), left, right)
            }

            Expr::Cast { expr: inner, data_type, .. } => self.check_cast(expr, inner, data_type),
            Expr::TypedString(TypedString { data_type, value, .. }) => match &value.value {
                Value::SingleQuotedString(text) | Value::DoubleQuotedString(text) => {
                    check_typed_string(expr, data_type, text)
                }
                other => check_typed_string(expr, data_type, &other.to_string()),
            },
            Expr::Case {
                operand,
                conditions,
                else_result,
                ..
            } => self.check_case(expr, operand.as_deref(), conditions, else_result.as_deref()),

            Expr::Exists { .. } => ResultType::new(ScalarKind::Boolean).with_nullable(false),
            Expr::Subquery(query) => self.check_subquery(query),
            Expr::Function(func) => self.check_function(expr, func),

            Expr::Substring { expr: inner, .. } | Expr::Trim { expr: inner, .. } => {
                let operand = self.check(inner);
                ResultType::new(ScalarKind::String)
                    .with_nullable(operand.nullable)
                    .with_constant(operand.constant)
                    .with_children([operand])
            }
            Expr::Extract { expr: inner, .. } | Expr::Ceil { expr: inner, .. } | Expr::Floor { expr: inner, .. } => {
                let operand = self.check(inner);
                ResultType::new(ScalarKind::Number)
                    .with_nullable(operand.nullable)
                    .with_constant(operand.constant)
                    .with_children([operand])
            }
            Expr::Position { .. } => ResultType::new(ScalarKind::Number),
            Expr::Interval(_) => ResultType::literal(ScalarKind::Date, None),
            Expr::Tuple(items) => {
                let items: Vec<ResultType> = items.iter().map(|item| self.check(item)).collect();
                ResultType::unknown().with_children(items)
            }

            _ => unsupported(expr),
        }
    }

    fn check_column(&self, expr: &Expr) -> ResultType {
        let Some((qualifier, name)) = column_ref(expr) else {
            return unsupported(expr);
        };
        let candidates = resolve_column(qualifier.as_deref(), &name, self.tables);

        let Some(candidate) = candidates.first() else {
            let mut result = ResultType::unknown();
            if let Some(issue) = candidates.issue() {
                result.push_diagnostic(issue.to_diagnostic().with_snippet(expr.to_string()));
            }
            return result;
        };
        if candidates.len() > 1 {
            log::debug!(
                "column reference {} matches {} tables, typing against the first",
                expr,
                candidates.len()
            );
        }

        let column = candidate.column;
        ResultType::new(ScalarKind::from_sql_type(&column.data_type))
            .with_nullable(column.nullable)
            .with_constant(column.constant)
    }

    fn check_unary(&self, expr: &Expr, op: &UnaryOperator, inner: &Expr) -> ResultType {
        let operand = self.check(inner);
        match op {
            UnaryOperator::Minus | UnaryOperator::Plus => {
                let minus = matches!(op, UnaryOperator::Minus);
                let value = operand
                    .value
                    .as_ref()
                    .map(|v| if minus { format!("-{v}") } else { v.clone() });
                let mut result = ResultType::new(ScalarKind::Number)
                    .with_nullable(operand.nullable)
                    .with_constant(operand.constant)
                    .with_value(value);
                if !accepts_number(&operand) {
                    let sign = if minus { "minus" } else { "plus" };
                    result.push_diagnostic(type_error(
                        SQL0201,
                        format!("Invalid {sign} type. {}", error_message("number", operand.kind)),
                        expr,
                    ));
                }
                result.with_children([operand])
            }
            UnaryOperator::Not => {
                let mut result = ResultType::new(ScalarKind::Boolean)
                    .with_nullable(operand.nullable)
                    .with_constant(operand.constant);
                if !accepts_boolean(&operand) {
                    result.push_diagnostic(operand_error("boolean", operand.kind, expr));
                }
                result.with_children([operand])
            }
            _ => unsupported(expr).with_children([operand]),
        }
    }

    fn check_binary(&self, expr: &Expr, left: &Expr, op: &BinaryOperator, right: &Expr) -> ResultType {
        let (left, right) = (self.check(left), self.check(right));
        let nullable = left.nullable || right.nullable;
        let constant = left.constant && right.constant;

        match op {
            BinaryOperator::Plus | BinaryOperator::Minus
                if left.kind == ScalarKind::Date || right.kind == ScalarKind::Date =>
            {
                let mut result = ResultType::new(ScalarKind::Date)
                    .with_nullable(nullable)
                    .with_constant(constant);
                for operand in [&left, &right] {
                    if !(accepts_number(operand) || to_date(operand)) {
                        result.push_diagnostic(operand_error("date", operand.kind, expr));
                    }
                }
                result.with_children([left, right])
            }
            BinaryOperator::Plus
            | BinaryOperator::Minus
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo => {
                let mut result = ResultType::new(ScalarKind::Number)
                    .with_nullable(nullable)
                    .with_constant(constant);
                for operand in [&left, &right] {
                    if !accepts_number(operand) {
                        result.push_diagnostic(operand_error("number", operand.kind, expr));
                    }
                }
                result.with_children([left, right])
            }
            BinaryOperator::StringConcat => ResultType::new(ScalarKind::String)
                .with_nullable(nullable)
                .with_constant(constant)
                .with_children([left, right]),
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq => self.comparison(expr, comparison_kind(op), left, right),
            BinaryOperator::And | BinaryOperator::Or | BinaryOperator::Xor => {
                let mut result = ResultType::new(ScalarKind::Boolean)
                    .with_nullable(nullable)
                    .with_constant(constant);
                for operand in [&left, &right] {
                    if !accepts_boolean(operand) {
                        result.push_diagnostic(operand_error("boolean", operand.kind, expr));
                    }
                }
                result.with_children([left, right])
            }
            _ => unsupported(expr).with_children([left, right]),
        }
    }

    fn comparison(&self, expr: &Expr, comparison: Comparison, left: ResultType, right: ResultType) -> ResultType {
        let mut result = ResultType::new(ScalarKind::Boolean)
            .with_nullable(left.nullable || right.nullable)
            .with_constant(left.constant && right.constant);

        if !comparable(&left, &right, comparison) {
            let diagnostic = if left.kind == ScalarKind::Boolean && right.kind == ScalarKind::Boolean {
                type_error(
                    SQL0200,
                    "Invalid comparison operator. Boolean values only support = and <>.",
                    expr,
                )
            } else {
                comparison_error(left.kind, right.kind, expr)
            };
            result.push_diagnostic(diagnostic);
        }
        result.with_children([left, right])
    }

    fn check_in_list(&self, expr: &Expr, target: &Expr, list: &[Expr]) -> ResultType {
        let target = self.check(target);
        let items: Vec<ResultType> = list.iter().map(|item| self.check(item)).collect();

        let mut result = ResultType::new(ScalarKind::Boolean)
            .with_nullable(target.nullable || items.iter().any(|i| i.nullable))
            .with_constant(target.constant && items.iter().all(|i| i.constant));
        for item in &items {
            if !comparable(&target, item, Comparison::Equality) {
                result.push_diagnostic(comparison_error(target.kind, item.kind, expr));
            }
        }
        result.with_children(std::iter::once(target).chain(items))
    }

    fn check_between(&self, expr: &Expr, target: &Expr, low: &Expr, high: &Expr) -> ResultType {
        let operands = [self.check(target), self.check(low), self.check(high)];
        let [t, l, h] = &operands;

        let mut result = ResultType::new(ScalarKind::Boolean)
            .with_nullable(operands.iter().any(|o| o.nullable))
            .with_constant(operands.iter().all(|o| o.constant));
        let mismatch = [(t, l), (t, h), (l, h)]
            .into_iter()
            .find(|(a, b)| !comparable(a, b, Comparison::Ordering));
        if let Some((a, b)) = mismatch {
            result.push_diagnostic(comparison_error(a.kind, b.kind, expr));
        }
        result.with_children(operands)
    }

    fn check_cast(&self, expr: &Expr, inner: &Expr, data_type: &DataType) -> ResultType {
        let source = self.check(inner);
        let target = ScalarKind::from_sql_type(&data_type.to_string());
        let mut result = ResultType::new(target)
            .with_nullable(source.nullable)
            .with_constant(source.constant);

        if target == ScalarKind::Date {
            let valid = match source.kind {
                ScalarKind::Date | ScalarKind::Null | ScalarKind::Unknown => true,
                ScalarKind::String => source.value.is_none() || to_date(&source),
                ScalarKind::Number | ScalarKind::Boolean => false,
            };
            if valid {
                result.value = source.value.clone();
            } else {
                result.push_diagnostic(type_error(
                    SQL0203,
                    format!("Invalid cast. {}", error_message("date", source.kind)),
                    expr,
                ));
            }
        }
        result.with_children([source])
    }

    fn check_case(
        &self,
        expr: &Expr,
        operand: Option<&Expr>,
        conditions: &[CaseWhen],
        else_result: Option<&Expr>,
    ) -> ResultType {
        let operand = operand.map(|o| self.check(o));
        let mut own = Vec::new();

        let mut tests = Vec::with_capacity(conditions.len());
        let mut branches = Vec::with_capacity(conditions.len() + 1);
        for when in conditions {
            let test = self.check(&when.condition);
            match &operand {
                Some(op) if !comparable(op, &test, Comparison::Equality) => {
                    own.push(comparison_error(op.kind, test.kind, expr));
                }
                None if !accepts_boolean(&test) => own.push(operand_error("boolean", test.kind, expr)),
                _ => {}
            }
            tests.push(test);
            branches.push(self.check(&when.result));
        }
        if let Some(e) = else_result {
            branches.push(self.check(e));
        }

        let first = branches.iter().find(|b| !b.is_null());
        let kind = first.map_or(ScalarKind::Null, |b| b.kind);
        if let Some(first) = first {
            for branch in &branches {
                if !comparable(first, branch, Comparison::Equality) {
                    own.push(type_error(
                        SQL0200,
                        format!("Invalid CASE branch type. {}", error_message(first.kind, branch.kind)),
                        expr,
                    ));
                }
            }
        }

        let mut result = ResultType::new(kind)
            .with_nullable(else_result.is_none() || branches.iter().any(|b| b.nullable))
            .with_constant(
                operand.iter().all(|o| o.constant)
                    && tests.iter().all(|t| t.constant)
                    && branches.iter().all(|b| b.constant),
            );
        result.diagnostics = own;
        result.with_children(operand.into_iter().chain(tests).chain(branches))
    }

    fn check_subquery(&self, query: &Query) -> ResultType {
        match self.subquery_typer {
            Some(typer) => {
                // the subquery reports its own problems
                let mut result = typer(query).with_nullable(true);
                result.diagnostics.clear();
                result
            }
            None => ResultType::unknown(),
        }
    }

    fn check_function(&self, expr: &Expr, func: &Function) -> ResultType {
        let name = object_name_parts(&func.name)
            .last()
            .map(|n| n.to_uppercase())
            .unwrap_or_default();
        let args: Vec<ResultType> = function_args(func).into_iter().map(|a| self.check(a)).collect();
        let any_nullable = args.iter().any(|a| a.nullable);
        let all_constant = args.iter().all(|a| a.constant);

        let result = match name.as_str() {
            "COUNT" => ResultType::new(ScalarKind::Number)
                .with_nullable(false)
                .with_constant(true),
            "SUM" | "AVG" => {
                let mut result = ResultType::new(ScalarKind::Number).with_constant(true);
                if let Some(arg) = args.first().filter(|a| !accepts_number(a)) {
                    result.push_diagnostic(argument_error(&name, "number", arg.kind, expr));
                }
                result
            }
            "MIN" | "MAX" => {
                let kind = args.first().map_or(ScalarKind::Unknown, |a| a.kind);
                let mut result = ResultType::new(kind).with_constant(true);
                if kind == ScalarKind::Boolean {
                    result.push_diagnostic(argument_error(&name, "string, number or date", kind, expr));
                }
                result
            }
            "CONCAT" => {
                if !args.is_empty() && args.iter().all(ResultType::is_null) {
                    ResultType::null()
                } else {
                    ResultType::new(ScalarKind::String)
                        .with_nullable(any_nullable)
                        .with_constant(all_constant)
                }
            }
            "UPPER" | "LOWER" | "TRIM" | "LTRIM" | "RTRIM" | "SUBSTRING" | "SUBSTR" | "REPLACE" | "INITCAP" => {
                ResultType::new(ScalarKind::String)
                    .with_nullable(any_nullable)
                    .with_constant(all_constant)
            }
            "LENGTH" | "CHAR_LENGTH" | "CHARACTER_LENGTH" | "ABS" | "ROUND" | "CEIL" | "CEILING" | "FLOOR"
            | "MOD" | "POWER" | "SQRT" => ResultType::new(ScalarKind::Number)
                .with_nullable(any_nullable)
                .with_constant(all_constant),
            "COALESCE" => {
                let kind = args
                    .iter()
                    .map(|a| a.kind)
                    .find(|k| !k.is_null())
                    .unwrap_or(ScalarKind::Null);
                ResultType::new(kind)
                    .with_nullable(args.iter().all(|a| a.nullable))
                    .with_constant(all_constant)
            }
            "CURRENT_DATE" | "CURRENT_TIMESTAMP" | "CURRENT_TIME" | "NOW" | "LOCALTIMESTAMP" => {
                ResultType::literal(ScalarKind::Date, None)
            }
            _ => ResultType::unknown(),
        };
        result.with_children(args)
    }
}

/// `(message, offending text)` pairs for the errors in an expression typed
/// against the given referenced tables
pub fn collect_errors(expr: &Expr, tables: &[Table]) -> Vec<(String, String)> {
    TypeChecker::new(tables).collect_errors(expr)
}

fn check_value(value: &Value) -> ResultType {
    match value {
        Value::Number(n, _) => ResultType::literal(ScalarKind::Number, Some(n.clone())),
        Value::SingleQuotedString(s)
        | Value::DoubleQuotedString(s)
        | Value::EscapedStringLiteral(s)
        | Value::NationalStringLiteral(s) => ResultType::literal(ScalarKind::String, Some(s.clone())),
        Value::DollarQuotedString(s) => ResultType::literal(ScalarKind::String, Some(s.value.clone())),
        Value::Boolean(b) => ResultType::literal(ScalarKind::Boolean, Some(b.to_string())),
        Value::Null => ResultType::null(),
        _ => ResultType::unknown(),
    }
}

fn check_typed_string(expr: &Expr, data_type: &DataType, text: &str) -> ResultType {
    let kind = ScalarKind::from_sql_type(&data_type.to_string());
    let mut result = ResultType::literal(kind, Some(text.to_string()));
    if kind == ScalarKind::Date && parse_date(text).is_none() {
        result.push_diagnostic(type_error(
            SQL0203,
            format!("Invalid cast. {}", error_message("date", ScalarKind::String)),
            expr,
        ));
    }
    result
}

fn function_args(func: &Function) -> Vec<&Expr> {
    match &func.args {
        FunctionArguments::List(list) => list
            .args
            .iter()
            .filter_map(|arg| match arg {
                FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) | FunctionArg::Named { arg: FunctionArgExpr::Expr(e), .. } => {
                    Some(e)
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn comparison_kind(op: &BinaryOperator) -> Comparison {
    match op {
        BinaryOperator::Eq | BinaryOperator::NotEq => Comparison::Equality,
        _ => Comparison::Ordering,
    }
}

fn accepts_number(ty: &ResultType) -> bool {
    to_number(ty) || matches!(ty.kind, ScalarKind::Null | ScalarKind::Unknown)
}

fn accepts_boolean(ty: &ResultType) -> bool {
    matches!(ty.kind, ScalarKind::Boolean | ScalarKind::Null | ScalarKind::Unknown)
}

fn accepts_string(ty: &ResultType) -> bool {
    matches!(ty.kind, ScalarKind::String | ScalarKind::Null | ScalarKind::Unknown)
}

fn type_error(code: ErrorCode, message: impl Into<String>, expr: &Expr) -> Diagnostic {
    SemanticIssue::type_error(code, message, expr.to_string()).to_diagnostic()
}

fn operand_error(expected: &str, found: ScalarKind, expr: &Expr) -> Diagnostic {
    type_error(
        SQL0201,
        format!("Invalid operand type. {}", error_message(expected, found)),
        expr,
    )
}

fn comparison_error(left: ScalarKind, right: ScalarKind, expr: &Expr) -> Diagnostic {
    type_error(
        SQL0200,
        format!("Invalid comparison type. {}", error_message(left, right)),
        expr,
    )
}

fn argument_error(function: &str, expected: &str, found: ScalarKind, expr: &Expr) -> Diagnostic {
    type_error(
        SQL0202,
        format!("Invalid argument type for {function}. {}", error_message(expected, found)),
        expr,
    )
}

fn unsupported(expr: &Expr) -> ResultType {
    ResultType::unknown().with_diagnostic(Diagnostic::warning(SQL0204, "Unsupported expression.").with_snippet(expr.to_string()))
}
