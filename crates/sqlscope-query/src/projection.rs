//! Output columns of a SELECT

use sqlparser::ast::{Expr, Query, SelectItem, SelectItemQualifiedWildcardKind};
use sqlscope_catalog::{Column, normalize_identifier};
use sqlscope_types::semantic::{TableScope, column_ref, ident_name, object_name_parts};
use sqlscope_types::{ResultType, ScalarKind, TypeChecker};
use std::collections::HashSet;

/// A projected column whose name may still be pending
struct Projected {
    name: Option<String>,
    column: Column,
}

fn derived_column(kind: ScalarKind, nullable: bool, constant: bool, table_idx: Option<usize>) -> Column {
    Column::new("", kind.as_str())
        .with_nullable(nullable)
        .with_constant(constant)
        .with_table_idx(table_idx)
}

fn typed_column(result: &ResultType, table_idx: Option<usize>) -> Column {
    derived_column(result.kind, result.nullable, result.constant, table_idx)
}

/// Name for the `n`th anonymous column
pub fn anonymous_name(n: usize) -> String {
    format!("?column_{n}?")
}

/// Build the output columns of a projection list, in source order.
///
/// `subquery_column` returns the first output column of a scalar subquery.
pub fn project(
    items: &[SelectItem],
    scope: TableScope<'_>,
    checker: &TypeChecker<'_>,
    subquery_column: &dyn Fn(&Query) -> Option<Column>,
) -> Vec<Column> {
    let mut projected = Vec::new();

    for item in items {
        match item {
            SelectItem::Wildcard(_) => {
                for (idx, column) in scope.columns() {
                    let kind = ScalarKind::from_sql_type(&column.data_type);
                    projected.push(Projected {
                        name: Some(column.name.clone()),
                        column: derived_column(kind, column.nullable, false, Some(idx)),
                    });
                }
            }
            SelectItem::QualifiedWildcard(SelectItemQualifiedWildcardKind::ObjectName(name), _) => {
                let Some(qualifier) = object_name_parts(name).last().map(|q| normalize_identifier(q)) else {
                    continue;
                };
                let Some(idx) = scope.position(&qualifier) else {
                    log::debug!("no table {qualifier} for {qualifier}.*");
                    continue;
                };
                let Some(table) = scope.get(idx) else { continue };
                for column in table.columns() {
                    let kind = ScalarKind::from_sql_type(&column.data_type);
                    projected.push(Projected {
                        name: Some(column.name.clone()),
                        column: derived_column(kind, column.nullable, column.constant, Some(idx)),
                    });
                }
            }
            SelectItem::QualifiedWildcard(..) => {}
            SelectItem::ExprWithAlias { expr, alias } => {
                let name = ident_name(alias);
                // a renamed column no longer carries its source's uniqueness
                let table_idx = column_ref(expr)
                    .filter(|(_, source)| *source == name)
                    .and_then(|(q, source)| scope.owner(q.as_deref(), &source));
                projected.push(Projected {
                    name: Some(name),
                    column: typed_column(&checker.check(expr), table_idx),
                });
            }
            SelectItem::UnnamedExpr(expr) => projected.push(project_expr(expr, scope, checker, subquery_column)),
        }
    }

    name_anonymous(projected)
}

fn project_expr(
    expr: &Expr,
    scope: TableScope<'_>,
    checker: &TypeChecker<'_>,
    subquery_column: &dyn Fn(&Query) -> Option<Column>,
) -> Projected {
    if let Some((qualifier, name)) = column_ref(expr) {
        let table_idx = scope.owner(qualifier.as_deref(), &name);
        return Projected {
            name: Some(name),
            column: typed_column(&checker.check(expr), table_idx),
        };
    }

    if let Expr::Subquery(query) = expr {
        return match subquery_column(query) {
            Some(first) => {
                let kind = ScalarKind::from_sql_type(&first.data_type);
                Projected {
                    name: Some(first.name.clone()),
                    column: derived_column(kind, first.nullable, first.constant, None),
                }
            }
            None => Projected {
                name: None,
                column: derived_column(ScalarKind::Unknown, true, false, None),
            },
        };
    }

    Projected {
        name: None,
        column: typed_column(&checker.check(expr), None),
    }
}

/// Give every unnamed column a `?column_N?` name no real column uses
fn name_anonymous(projected: Vec<Projected>) -> Vec<Column> {
    let taken: HashSet<String> = projected.iter().filter_map(|p| p.name.clone()).collect();
    let mut counter = 1;

    projected
        .into_iter()
        .map(|p| {
            let mut column = p.column;
            column.name = match p.name {
                Some(name) => name,
                None => loop {
                    let candidate = anonymous_name(counter);
                    counter += 1;
                    if !taken.contains(&candidate) {
                        break candidate;
                    }
                },
            };
            column
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlparser::ast::{SetExpr, Statement};
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;
    use sqlscope_catalog::Table;

    fn tables() -> Vec<Table> {
        let mut store = Table::new("s");
        store.add_column(Column::new("sid", "integer").not_null());
        store.add_column(Column::new("sname", "varchar"));
        let mut sale = Table::new("t");
        sale.add_column(Column::new("sid", "integer"));
        sale.add_column(Column::new("price", "numeric"));
        vec![store, sale]
    }

    fn columns(sql: &str) -> Vec<Column> {
        let statements = Parser::parse_sql(&GenericDialect {}, sql).unwrap();
        let Statement::Query(query) = &statements[0] else {
            panic!("not a query");
        };
        let SetExpr::Select(select) = query.body.as_ref() else {
            panic!("not a select");
        };
        let tables = tables();
        let checker = TypeChecker::new(&tables);
        project(&select.projection, TableScope::new(&tables), &checker, &|_| None)
    }

    fn names(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_star_expands_in_table_order() {
        let cols = columns("SELECT * FROM s, t");
        assert_eq!(names(&cols), vec!["sid", "sname", "sid", "price"]);
        assert_eq!(cols[2].table_idx, Some(1));
        assert_eq!(cols[3].data_type, "number");
        assert!(!cols[0].nullable);
        assert!(cols.iter().all(|c| !c.constant));
    }

    #[test]
    fn test_qualified_star() {
        let cols = columns("SELECT t.* FROM s, t");
        assert_eq!(names(&cols), vec!["sid", "price"]);
        assert!(cols.iter().all(|c| c.table_idx == Some(1)));
    }

    #[test]
    fn test_column_and_alias_names() {
        let cols = columns(r#"SELECT SNAME, t.sid, price AS "Cost", price AS total FROM s, t"#);
        assert_eq!(names(&cols), vec!["sname", "sid", "Cost", "total"]);
        assert_eq!(cols[1].table_idx, Some(1));
        assert_eq!(cols[2].table_idx, Some(1));
    }

    #[test]
    fn test_anonymous_names_skip_real_names() {
        let cols = columns(r#"SELECT 1, price * 2 AS "?column_2?", upper(sname) FROM s, t"#);
        assert_eq!(names(&cols), vec!["?column_1?", "?column_2?", "?column_3?"]);
        assert_eq!(cols[0].data_type, "number");
        assert!(cols[0].constant);
        assert_eq!(cols[2].data_type, "string");
    }

    #[test]
    fn test_scalar_subquery_without_output() {
        let cols = columns("SELECT (SELECT 1) FROM s");
        assert_eq!(names(&cols), vec!["?column_1?"]);
        assert_eq!(cols[0].data_type, "unknown");
    }
}
