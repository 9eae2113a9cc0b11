//! Catalog document tests
//!
//! Covers:
//! - Lossless JSON round trips
//! - Loading the document format from files
//! - Constraint and foreign key metadata

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sqlscope_catalog::*;

fn store_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.add_column("public", "store", Column::new("sid", "integer").not_null());
    catalog.add_column("public", "store", Column::new("sname", "varchar"));
    catalog.add_column(
        "public",
        "store",
        Column::new("budget", "numeric").with_precision(10, Some(2)),
    );
    catalog.add_unique_constraint("public", "store", &["sid"], ConstraintKind::PrimaryKey);

    catalog.add_column("public", "transaction", Column::new("tid", "integer").not_null());
    catalog.add_column(
        "public",
        "transaction",
        Column::new("sid", "integer").with_foreign_key(ForeignKey::new("public", "store", "sid")),
    );
    catalog.add_unique_constraint("public", "transaction", &["tid"], ConstraintKind::PrimaryKey);
    catalog
}

#[test]
fn test_round_trip_store_catalog() {
    let catalog = store_catalog();
    let json = catalog.to_json().unwrap();
    let loaded = Catalog::from_json(&json).unwrap();

    assert_eq!(loaded, catalog);
    assert!(loaded.get_table("public", "store").unwrap().is_primary_key("sid"));
    assert!(loaded.get_column("public", "transaction", "sid").unwrap().is_foreign_key());
}

#[test]
fn test_round_trip_keeps_quoted_case() {
    let mut catalog = Catalog::new();
    catalog.add_column("public", "\"Store\"", Column::new("\"SID\"", "integer"));

    let loaded = Catalog::from_json(&catalog.to_json().unwrap()).unwrap();

    assert!(loaded.has_table("public", "\"Store\""));
    assert!(loaded.get_column("public", "\"Store\"", "\"SID\"").is_some());
    assert!(!loaded.has_table("public", "store"));
}

#[test]
fn test_document_shape() {
    let json = store_catalog().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["version"], CATALOG_DOCUMENT_VERSION);
    let store = &value["schemas"]["public"]["tables"]["store"];
    assert_eq!(store["columns"]["sid"]["type"], "integer");
    assert_eq!(store["columns"]["sid"]["nullable"], false);
    assert_eq!(store["columns"]["budget"]["precision"], 10);
    assert_eq!(store["unique_constraints"][0]["kind"], "PRIMARY_KEY");
    assert_eq!(store["unique_constraints"][0]["columns"][0]["name"], "sid");
    assert!(store["unique_constraints"][0]["columns"][0]["table_idx"].is_null());

    let fk = &value["schemas"]["public"]["tables"]["transaction"]["columns"]["sid"];
    assert_eq!(fk["fk_table"], "store");
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");

    let catalog = store_catalog();
    catalog.to_file(&path).unwrap();

    assert_eq!(Catalog::from_file(&path).unwrap(), catalog);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Catalog::from_file(dir.path().join("missing.json")).unwrap_err();

    assert!(matches!(err, sqlscope_diagnostics::AnalysisError::CatalogIo { .. }));
}

const TYPES: [&str; 6] = ["integer", "varchar", "numeric", "boolean", "date", "text"];

#[derive(Debug, Clone)]
enum Step {
    Column {
        schema: String,
        table: String,
        column: String,
        type_idx: usize,
        nullable: bool,
        precision: Option<u32>,
    },
    Constraint {
        schema: String,
        table: String,
        columns: Vec<String>,
        primary: bool,
    },
}

fn name() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_]{0,6}",
        "\"[A-Z][a-zA-Z]{0,5}\"",
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (name(), name(), name(), 0..TYPES.len(), any::<bool>(), proptest::option::of(1u32..40))
            .prop_map(|(schema, table, column, type_idx, nullable, precision)| Step::Column {
                schema,
                table,
                column,
                type_idx,
                nullable,
                precision,
            }),
        1 => (name(), name(), proptest::collection::vec(name(), 1..4), any::<bool>())
            .prop_map(|(schema, table, columns, primary)| Step::Constraint {
                schema,
                table,
                columns,
                primary,
            }),
    ]
}

proptest! {
    #[test]
    fn prop_round_trip(steps in proptest::collection::vec(step(), 0..24)) {
        let mut catalog = Catalog::new();
        for step in steps {
            match step {
                Step::Column { schema, table, column, type_idx, nullable, precision } => {
                    let mut col = Column::new(column, TYPES[type_idx]).with_nullable(nullable);
                    if let Some(p) = precision {
                        col = col.with_precision(p, None);
                    }
                    catalog.add_column(&schema, &table, col);
                }
                Step::Constraint { schema, table, columns, primary } => {
                    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                    let kind = if primary { ConstraintKind::PrimaryKey } else { ConstraintKind::Unique };
                    catalog.add_unique_constraint(&schema, &table, &columns, kind);
                }
            }
        }

        let loaded = Catalog::from_json(&catalog.to_json().unwrap()).unwrap();
        prop_assert_eq!(loaded, catalog);
    }
}
