//! Subquery tests
//!
//! Covers:
//! - Clause tags for every position a subquery can take
//! - Agreement between parsed and degraded discovery
//! - Subqueries with their own CTEs
//! - Stripping subqueries out of a SELECT

mod common;

use common::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sqlscope_query::SubqueryClause::{self, *};

fn tags(sql: &str) -> Vec<SubqueryClause> {
    let query = analyze(sql);
    main_select(&query).subqueries().iter().map(|s| s.clause()).collect()
}

// === Tags ===

#[rstest]
#[case("SELECT * FROM (SELECT 1 AS one) AS d", vec![From])]
#[case("SELECT 1 FROM store WHERE (SELECT true)", vec![Where])]
#[case("SELECT (SELECT 1) AS one FROM store", vec![Select])]
#[case("SELECT 1 FROM store WHERE sid IN (SELECT sid FROM transaction)", vec![In])]
#[case("SELECT 1 FROM store WHERE NOT EXISTS (SELECT 1 FROM transaction)", vec![Exists])]
#[case("SELECT 1 FROM store WHERE sid >= (SELECT min(sid) FROM transaction)", vec![Comparison])]
#[case("SELECT 1 FROM store WHERE sid = ANY (SELECT sid FROM transaction)", vec![Comparison])]
#[case(
    "SELECT city FROM store GROUP BY city HAVING count(*) > (SELECT 1) OR city IN (SELECT city FROM store)",
    vec![Comparison, In]
)]
#[case(
    "SELECT 1 FROM store s JOIN transaction t ON t.sid = s.sid AND t.tid IN (SELECT tid FROM transaction)",
    vec![In]
)]
#[case("SELECT 1 FROM store s JOIN (SELECT sid FROM transaction) AS t ON s.sid = t.sid", vec![Join])]
#[case("SELECT sid FROM store WHERE sid = (SELECT 1) + 2", vec![Where])]
fn test_clause_tags(#[case] sql: &str, #[case] expected: Vec<SubqueryClause>) {
    assert_eq!(tags(sql), expected);
}

#[test]
fn test_tags_in_source_order() {
    let sql = "SELECT (SELECT max(price) FROM transaction) AS best, sname \
               FROM store s JOIN (SELECT sid FROM transaction) AS t ON s.sid = t.sid \
               WHERE EXISTS (SELECT 1 FROM transaction) AND s.sid = (SELECT min(sid) FROM transaction)";
    assert_eq!(tags(sql), vec![Select, Join, Exists, Comparison]);
}

#[rstest]
#[case(
    "SELECT (SELECT max(price) FROM transaction) AS best, sname \
     FROM store s JOIN (SELECT sid FROM transaction) AS t ON s.sid = t.sid \
     WHERE EXISTS (SELECT 1 FROM transaction) AND s.sid = (SELECT min(sid) FROM transaction)"
)]
#[case("SELECT * FROM (SELECT 1 AS one) AS d WHERE 3 IN (SELECT 3)")]
#[case("SELECT city FROM store GROUP BY city HAVING (SELECT 1) < count(*)")]
#[case("SELECT sid FROM store WHERE sid = (SELECT 1) + 2")]
#[case("SELECT sid FROM store WHERE 2 * (SELECT 1) > sid OR sid <> (SELECT 3)")]
#[case("SELECT s.sid FROM (SELECT sid FROM store WHERE city = 'Delft') AS s JOIN (SELECT sid FROM transaction) AS t ON s.sid = t.sid")]
fn test_degraded_tags_match_parsed_tags(#[case] sql: &str) {
    let broken = format!("{sql} ORDER BY");
    let degraded = analyze(&broken);
    assert!(!main_select(&degraded).is_parsed());

    let degraded_tags: Vec<SubqueryClause> = main_select(&degraded)
        .subqueries()
        .iter()
        .map(|s| s.clause())
        .collect();
    assert_eq!(degraded_tags, tags(sql));
}

#[test]
fn test_nested_subqueries_belong_to_their_select() {
    let query = analyze(
        "SELECT 1 FROM store WHERE sid IN (SELECT sid FROM transaction WHERE price > (SELECT avg(price) FROM transaction))",
    );
    let select = main_select(&query);

    assert_eq!(select.subqueries().len(), 1);
    let inner = select.subqueries()[0].tree().as_select().unwrap();
    assert_eq!(inner.subqueries().len(), 1);
    assert_eq!(inner.subqueries()[0].clause(), Comparison);
    assert_eq!(select.selects().len(), 3);
}

#[test]
fn test_subquery_with_own_ctes() {
    let query = analyze("SELECT * FROM (WITH x AS (SELECT sid FROM store) SELECT sid FROM x) AS d");
    let subquery = &main_select(&query).subqueries()[0];

    assert_eq!(subquery.ctes().len(), 1);
    assert_eq!(subquery.ctes()[0].name(), "x");
    assert_eq!(output_names(&query), vec!["sid"]);
    // x is local to the subquery
    assert!(!main_select(&query).catalog().has_table("", "x"));
}

#[test]
fn test_clause_serializes_uppercase() {
    assert_eq!(serde_json::to_string(&Comparison).unwrap(), "\"COMPARISON\"");
    assert_eq!(Join.to_string(), "JOIN");
}

// === Stripping ===

#[rstest]
#[case(
    "SELECT sname FROM store WHERE sid IN (SELECT sid FROM transaction WHERE price > 100)",
    "SELECT sname FROM store WHERE sid IN (NULL)"
)]
#[case(
    "SELECT x.sid FROM (SELECT sid FROM store) AS x JOIN (SELECT sid FROM transaction) AS y ON x.sid = y.sid",
    "SELECT x.sid FROM __subq1 AS x JOIN __subq2 AS y ON x.sid = y.sid"
)]
#[case(
    "SELECT (SELECT max(price) FROM transaction) AS best FROM store WHERE sid = (SELECT min(sid) FROM transaction)",
    "SELECT NULL AS best FROM store WHERE sid = NULL"
)]
#[case(
    "SELECT sname FROM store WHERE EXISTS (SELECT 1 FROM transaction)",
    "SELECT sname FROM store WHERE EXISTS (NULL)"
)]
fn test_strip_subqueries(#[case] sql: &str, #[case] expected: &str) {
    let query = analyze(sql);
    let stripped = main_select(&query).strip_subqueries().unwrap();

    assert_eq!(stripped.sql(), expected);
    assert!(stripped.subqueries().is_empty());
}

#[test]
fn test_strip_keeps_modifiers_and_catalog() {
    let query = analyze("SELECT sname FROM store WHERE sid IN (SELECT sid FROM transaction) ORDER BY sname LIMIT 2");
    let stripped = main_select(&query).strip_subqueries().unwrap();

    assert_eq!(stripped.limit(), Some(2));
    assert_eq!(stripped.order_by().len(), 1);
    assert_eq!(stripped.output().columns()[0].name, "sname");
    assert!(stripped.issues().is_empty());
}
