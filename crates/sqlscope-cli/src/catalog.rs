//! Catalog command implementation

use crate::output;
use anyhow::{Context, Result};
use colored::Colorize;
use sqlscope::Catalog;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Configuration for the catalog command
pub struct CatalogConfig {
    pub file: PathBuf,
    pub json: bool,
    pub output_file: Option<PathBuf>,
}

/// Validate a catalog document and print it
pub fn show(config: CatalogConfig) -> Result<()> {
    let catalog = Catalog::from_file(&config.file)
        .with_context(|| format!("Failed to load catalog: {}", config.file.display()))?;

    let content = if config.json {
        catalog.to_json().context("Failed to serialize catalog")?
    } else {
        render(&catalog)
    };
    output::write_output(&content, config.output_file.as_deref())
}

/// Schema by schema listing of a catalog
pub fn render(catalog: &Catalog) -> String {
    let mut out = String::new();
    for schema in catalog.schemas() {
        let name = if schema.name.is_empty() { "(query-local)" } else { schema.name.as_str() };
        let _ = writeln!(out, "{}", output::heading(&format!("schema {name}")));
        for table in schema.tables() {
            let _ = writeln!(out, "  {}", table.name.bold());
            for column in table.columns() {
                let mut line = format!("    {} {}", column.name, column.data_type);
                if !column.nullable {
                    line.push_str(" NOT NULL");
                }
                if let Some(fk) = &column.foreign_key {
                    let _ = write!(line, " -> {}.{}.{}", fk.schema, fk.table, fk.column);
                }
                let _ = writeln!(out, "{line}");
            }
            for constraint in table.unique_constraints() {
                let _ = writeln!(out, "    {} {}", "unique".green(), constraint);
            }
        }
    }
    out.trim_end().to_string()
}
