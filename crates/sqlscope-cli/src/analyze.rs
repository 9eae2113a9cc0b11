//! Analyze command implementation

use crate::output;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::{Value, json};
use sqlscope::{AnalysisOptions, Catalog, Query, Select, SqlDialect};
use std::fmt::Write as _;
use std::io::Read;
use std::path::PathBuf;

/// Configuration for the analyze command
pub struct AnalyzeConfig {
    pub catalog: PathBuf,
    /// SQL text, or `-` for stdin
    pub sql: String,
    pub config: Option<PathBuf>,
    pub search_path: Option<String>,
    pub max_depth: Option<usize>,
    pub dialect: Option<SqlDialect>,
    pub json: bool,
    pub output_file: Option<PathBuf>,
}

/// Analysis options from the config file, overridden by flags
pub fn load_options(config: &AnalyzeConfig) -> Result<AnalysisOptions> {
    let mut options = match &config.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => AnalysisOptions::default(),
    };

    if let Some(search_path) = &config.search_path {
        options = options.with_search_path(search_path.clone());
    }
    if let Some(max_depth) = config.max_depth {
        options = options.with_max_depth(max_depth);
    }
    if let Some(dialect) = config.dialect {
        options = options.with_dialect(dialect);
    }
    Ok(options)
}

fn read_sql(sql: &str) -> Result<String> {
    if sql != "-" {
        return Ok(sql.to_string());
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read SQL from stdin")?;
    Ok(text)
}

/// Analyze a query and print the report
pub fn analyze(config: AnalyzeConfig) -> Result<()> {
    let catalog = Catalog::from_file(&config.catalog)
        .with_context(|| format!("Failed to load catalog: {}", config.catalog.display()))?;
    let options = load_options(&config)?;
    let sql = read_sql(&config.sql)?;

    log::debug!(
        "search path {}, depth limit {}, dialect {}",
        options.search_path,
        options.max_depth,
        options.dialect
    );
    let query = Query::parse(&sql, &catalog, &options).context("Analysis failed")?;

    let content = if config.json {
        serde_json::to_string_pretty(&to_json(&query)).context("Failed to serialize JSON")?
    } else {
        render(&query)
    };
    output::write_output(&content, config.output_file.as_deref())
}

/// Human-readable report of a query
pub fn render(query: &Query) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", output::heading("Query"));
    let _ = writeln!(out, "{query}");

    for (i, select) in query.selects().into_iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", output::heading(&format!("SELECT #{}", i + 1)));
        render_select(&mut out, select);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", output::heading("Output"));
    render_table(&mut out, query.output());
    out.trim_end().to_string()
}

fn render_select(out: &mut String, select: &Select) {
    let _ = writeln!(out, "{} {}", "sql:".cyan(), select.sql());

    let tables: Vec<&str> = select.referenced_tables().iter().map(|t| t.name.as_str()).collect();
    if !tables.is_empty() {
        let _ = writeln!(out, "{} {}", "tables:".cyan(), tables.join(", "));
    }

    for subquery in select.subqueries() {
        let _ = writeln!(out, "{} [{}] {}", "subquery:".cyan(), subquery.clause(), subquery.sql());
    }

    render_table(out, select.output());

    for issue in select.issues() {
        let _ = writeln!(out, "{}", issue.to_diagnostic().render());
    }
    for (clause, expr) in [("WHERE", select.where_clause()), ("HAVING", select.having())] {
        let Some(expr) = expr else { continue };
        for diagnostic in select.type_of(expr).errors() {
            let _ = writeln!(out, "{} {}", format!("{clause}:").cyan(), diagnostic.render());
        }
    }
}

fn render_table(out: &mut String, table: &sqlscope::Table) {
    for column in table.columns() {
        let nullability = if column.nullable { "NULL" } else { "NOT NULL" };
        let _ = writeln!(out, "  {} {} {}", column.name.bold(), column.data_type, nullability.dimmed());
    }
    for constraint in table.unique_constraints() {
        let _ = writeln!(out, "  {} {}", "unique".green(), constraint);
    }
}

/// Machine-readable report of a query
pub fn to_json(query: &Query) -> Value {
    let selects: Vec<Value> = query
        .selects()
        .into_iter()
        .map(|select| {
            let subqueries: Vec<Value> = select
                .subqueries()
                .iter()
                .map(|s| json!({ "clause": s.clause(), "sql": s.sql() }))
                .collect();
            json!({
                "sql": select.sql(),
                "tables": select.referenced_tables().iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                "subqueries": subqueries,
                "output": select.output(),
                "issues": select.issues(),
            })
        })
        .collect();

    json!({
        "sql": query.sql(),
        "tree": query.main_query().to_string(),
        "selects": selects,
        "output": query.output(),
    })
}
