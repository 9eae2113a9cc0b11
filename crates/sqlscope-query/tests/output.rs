//! Output schema tests
//!
//! Covers:
//! - Projected column names, types and table tags
//! - Unique-constraint propagation through joins, GROUP BY and DISTINCT
//! - Derived tables and CTEs as constraint sources
//! - Set-operation constraint composition
//! - Typing expressions in the context of a SELECT

mod common;

use common::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sqlscope_catalog::{ConstraintKind, UniqueConstraint};
use sqlscope_diagnostics::SemanticIssue;
use sqlscope_types::ScalarKind;

// === Columns ===

#[test]
fn test_star_expands_every_table() {
    let query = analyze("SELECT * FROM store, transaction");

    assert_eq!(
        output_names(&query),
        vec!["sid", "sname", "street", "city", "tid", "sid", "date", "price"]
    );
    let columns = query.output().columns();
    assert_eq!(columns[5].table_idx, Some(1));
    assert_eq!(columns[6].data_type, "date");
    assert!(!columns[0].nullable);
}

#[test]
fn test_column_types_and_nullability() {
    let query = analyze("SELECT t.price, t.tid, s.sname FROM store s JOIN transaction t ON s.sid = t.sid");
    let columns = query.output().columns();

    assert_eq!(columns[0].data_type, "number");
    assert!(columns[0].nullable);
    assert!(!columns[1].nullable);
    assert_eq!(columns[2].data_type, "string");
    assert_eq!(columns[2].table_idx, Some(0));
}

#[rstest]
#[case("SELECT sid AS id FROM store", "id")]
#[case("SELECT sid AS \"Id\" FROM store", "Id")]
#[case("SELECT SID FROM store", "sid")]
#[case("SELECT count(*) FROM store", "?column_1?")]
fn test_output_names(#[case] sql: &str, #[case] expected: &str) {
    let query = analyze(sql);
    assert_eq!(output_names(&query), vec![expected]);
}

#[test]
fn test_scalar_subquery_column() {
    let query = analyze("SELECT sname, (SELECT max(price) FROM transaction) FROM store");
    let columns = query.output().columns();

    assert_eq!(columns[1].name, "?column_1?");
    assert_eq!(columns[1].data_type, "number");
}

#[test]
fn test_scalar_subquery_named_column() {
    let query = analyze("SELECT (SELECT city FROM store LIMIT 1) FROM transaction");
    assert_eq!(output_names(&query), vec!["city"]);
}

#[test]
fn test_unresolved_table_contributes_no_columns() {
    let query = analyze("SELECT * FROM nowhere");
    let select = main_select(&query);

    assert!(query.output().columns().is_empty());
    assert_eq!(select.referenced_tables()[0].name, "nowhere");
    assert_eq!(
        select.issues(),
        vec![SemanticIssue::UnresolvedTable {
            schema: None,
            table: "nowhere".to_string(),
        }]
    );
}

#[test]
fn test_unknown_schema() {
    let query = analyze("SELECT * FROM archive.store");
    assert!(matches!(
        main_select(&query).issues().as_slice(),
        [SemanticIssue::UnresolvedSchema { .. }]
    ));
}

#[test]
fn test_referenced_tables_use_aliases() {
    let query = analyze("SELECT 1 FROM store AS s, public.transaction");
    let names: Vec<&str> = main_select(&query)
        .referenced_tables()
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(names, vec!["s", "transaction"]);
}

// === Constraints ===

#[test]
fn test_primary_key_survives_projection() {
    let query = analyze("SELECT sid, sname FROM store");
    assert_eq!(
        query.output().unique_constraints(),
        &[constraint(ConstraintKind::PrimaryKey, &[("sid", 0)])]
    );
}

#[test]
fn test_hidden_key_is_dropped() {
    let query = analyze("SELECT sname, city FROM store");
    assert!(query.output().unique_constraints().is_empty());
}

#[rstest]
#[case("SELECT sname AS sid FROM store")]
#[case("SELECT sid AS id FROM store")]
#[case("SELECT s.sname AS sid FROM store s")]
fn test_renamed_column_is_not_unique(#[case] sql: &str) {
    let query = analyze(sql);
    assert!(query.output().unique_constraints().is_empty());
    assert_eq!(query.output().columns()[0].table_idx, None);
}

#[test]
fn test_alias_with_same_name_keeps_key() {
    let query = analyze("SELECT sid AS sid, sname FROM store");
    assert_eq!(
        query.output().unique_constraints(),
        &[constraint(ConstraintKind::PrimaryKey, &[("sid", 0)])]
    );
}

#[test]
fn test_join_widens_through_equality() {
    let query = analyze("SELECT t.tid, s.sid FROM store s JOIN transaction t ON s.sid = t.sid");
    assert_eq!(
        query.output().unique_constraints(),
        &[constraint(ConstraintKind::Unique, &[("sid", 0), ("tid", 1)])]
    );
}

#[test]
fn test_comma_join_uses_where_equalities() {
    let query = analyze("SELECT t.tid, t.sid FROM store s, transaction t WHERE s.sid = t.sid AND t.price > 10");
    assert_eq!(
        query.output().unique_constraints(),
        &[constraint(ConstraintKind::Unique, &[("sid", 1), ("tid", 1)])]
    );
}

#[test]
fn test_cross_join_without_projection_of_both_keys() {
    let query = analyze("SELECT s.sid FROM store s, transaction t");
    assert!(query.output().unique_constraints().is_empty());
}

#[test]
fn test_group_by_columns_are_unique() {
    let query = analyze("SELECT city, count(*) FROM store GROUP BY city");

    assert_eq!(output_names(&query), vec!["city", "?column_1?"]);
    assert_eq!(
        query.output().unique_constraints(),
        &[constraint(ConstraintKind::Unique, &[("city", 0)])]
    );
}

#[test]
fn test_group_by_expression_adds_nothing() {
    let query = analyze("SELECT upper(city) FROM store GROUP BY upper(city)");
    assert!(query.output().unique_constraints().is_empty());
}

#[test]
fn test_distinct_adds_all_constraint() {
    let query = analyze("SELECT DISTINCT city FROM store");
    assert_eq!(query.output().unique_constraints(), &[UniqueConstraint::all_rows()]);
}

#[test]
fn test_derived_table_distinct_seeds_its_columns() {
    let query = analyze("SELECT d.sid FROM (SELECT DISTINCT sid FROM transaction) AS d");
    assert_eq!(
        query.output().unique_constraints(),
        &[constraint(ConstraintKind::Unique, &[("sid", 0)])]
    );
}

#[test]
fn test_cte_constraints_are_retagged() {
    let query = analyze("WITH s AS (SELECT sid, city FROM store) SELECT * FROM s");
    assert_eq!(
        query.output().unique_constraints(),
        &[constraint(ConstraintKind::PrimaryKey, &[("sid", 0)])]
    );
}

#[test]
fn test_cte_column_rename_carries_constraint() {
    let query = analyze("WITH a(x) AS (SELECT sid FROM store) SELECT x FROM a");
    assert_eq!(
        query.output().unique_constraints(),
        &[constraint(ConstraintKind::PrimaryKey, &[("x", 0)])]
    );
}

#[rstest]
#[case("SELECT sid FROM store UNION SELECT sid FROM transaction", true)]
#[case("SELECT sid FROM store UNION ALL SELECT sid FROM transaction", false)]
fn test_union_constraints(#[case] sql: &str, #[case] unique_rows: bool) {
    let query = analyze(sql);
    let expected = if unique_rows {
        vec![UniqueConstraint::all_rows()]
    } else {
        Vec::new()
    };
    assert_eq!(query.output().unique_constraints(), expected.as_slice());
}

#[test]
fn test_except_keeps_left_constraints() {
    let query = analyze("SELECT sid FROM store EXCEPT SELECT sid FROM transaction");
    assert_eq!(
        query.output().unique_constraints(),
        &[
            constraint(ConstraintKind::PrimaryKey, &[("sid", 0)]),
            UniqueConstraint::all_rows(),
        ]
    );
}

#[test]
fn test_intersect_all_drops_row_uniqueness() {
    let query = analyze("SELECT sid FROM store INTERSECT ALL SELECT sid FROM transaction");
    assert_eq!(
        query.output().unique_constraints(),
        &[constraint(ConstraintKind::PrimaryKey, &[("sid", 0)])]
    );
}

// === Typing in context ===

#[test]
fn test_type_of_where_clause() {
    let query = analyze("SELECT sname FROM store WHERE city = 'Delft' AND sid > 3");
    let select = main_select(&query);
    let result = select.type_of(select.where_clause().unwrap());

    assert_eq!(result.kind, ScalarKind::Boolean);
    assert!(select.collect_errors(select.where_clause().unwrap()).is_empty());
}

#[test]
fn test_collect_errors_reports_offending_text() {
    let query = analyze("SELECT sname FROM store WHERE sname + 1 > 2");
    let select = main_select(&query);
    let errors = select.collect_errors(select.where_clause().unwrap());

    assert!(!errors.is_empty());
    assert!(errors[0].0.starts_with("Invalid"));
}

#[test]
fn test_scalar_subquery_typed_in_comparison() {
    let query = analyze("SELECT tid FROM transaction WHERE price > (SELECT max(price) FROM transaction)");
    let select = main_select(&query);

    let errors = select.collect_errors(select.where_clause().unwrap());
    assert!(errors.is_empty());
}

#[test]
fn test_join_equalities() {
    let query = analyze("SELECT 1 FROM store s JOIN transaction t ON s.sid = t.sid AND t.price > 3 WHERE s.city = t.date");
    let select = main_select(&query);

    assert_eq!(select.join_conditions().len(), 1);
    let pairs: Vec<(String, String)> = select
        .join_equalities()
        .into_iter()
        .map(|(l, r)| (l.to_string(), r.to_string()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("s.sid".to_string(), "t.sid".to_string()),
            ("s.city".to_string(), "t.date".to_string()),
        ]
    );
}
