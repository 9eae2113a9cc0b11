//! Queries and analysis sessions

use crate::builder::Builder;
use crate::{AnalysisOptions, Select, SetOperation};
use sqlscope_catalog::{Catalog, Table, normalize_identifier};
use sqlscope_diagnostics::Result;
use std::fmt;
use std::rc::Rc;

/// A common table expression bound by a WITH clause
#[derive(Debug)]
pub struct Cte {
    name: String,
    ctes: Vec<Cte>,
    tree: SetOperation,
}

impl Cte {
    pub(crate) fn new(name: String, ctes: Vec<Cte>, tree: SetOperation) -> Self {
        Self { name, ctes, tree }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// CTEs declared inside the body
    pub fn ctes(&self) -> &[Cte] {
        &self.ctes
    }

    pub fn tree(&self) -> &SetOperation {
        &self.tree
    }

    /// Output of the body, before the alias column renames
    pub fn output(&self) -> &Table {
        self.tree.output()
    }

    pub fn selects(&self) -> Vec<&Select> {
        let mut selects: Vec<&Select> = self.ctes.iter().flat_map(Cte::selects).collect();
        selects.extend(self.tree.selects());
        selects
    }
}

/// An analyzed SQL query.
///
/// The catalog the query was parsed against is kept untouched; CTEs live
/// only in the snapshots their readers see.
#[derive(Debug)]
pub struct Query {
    sql: String,
    catalog: Rc<Catalog>,
    options: Rc<AnalysisOptions>,
    ctes: Vec<Cte>,
    main: SetOperation,
}

impl Query {
    /// Build a query from SQL text.
    ///
    /// Text that does not parse yields a query whose main node is an empty
    /// SELECT carrying a parse issue; only the depth guard fails the call.
    pub fn parse(sql: &str, catalog: &Catalog, options: &AnalysisOptions) -> Result<Self> {
        Self::build(sql, Rc::new(catalog.clone()), Rc::new(options.clone()))
    }

    fn build(sql: &str, catalog: Rc<Catalog>, options: Rc<AnalysisOptions>) -> Result<Self> {
        log::debug!("analyzing query ({} dialect): {}", options.dialect, sql.trim());
        let scoped = Builder::new(options.clone()).parse(sql, catalog.clone(), 0)?;
        Ok(Self {
            sql: sql.to_string(),
            catalog,
            options,
            ctes: scoped.ctes,
            main: scoped.tree,
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Catalog the query was parsed against, without its CTEs
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Top-level CTEs in declaration order
    pub fn ctes(&self) -> &[Cte] {
        &self.ctes
    }

    /// Top-level CTE by name. A later CTE shadows an earlier one.
    pub fn cte(&self, name: &str) -> Option<&Cte> {
        let name = normalize_identifier(name);
        self.ctes.iter().rev().find(|c| c.name == name)
    }

    pub fn main_query(&self) -> &SetOperation {
        &self.main
    }

    pub fn output(&self) -> &Table {
        self.main.output()
    }

    /// Every SELECT of the query, CTE bodies first
    pub fn selects(&self) -> Vec<&Select> {
        let mut selects: Vec<&Select> = self.ctes.iter().flat_map(Cte::selects).collect();
        selects.extend(self.main.selects());
        selects
    }

    /// A new query for corrected text, against the same catalog and options
    pub fn with_corrected_sql(&self, sql: &str) -> Result<Query> {
        Self::build(sql, self.catalog.clone(), self.options.clone())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cte in &self.ctes {
            writeln!(f, "CTE {}:", cte.name)?;
            for line in cte.tree.to_string().lines() {
                writeln!(f, "  {line}")?;
            }
        }
        write!(f, "{}", self.main)
    }
}

/// Holds the query under analysis and swaps in corrected versions
#[derive(Debug)]
pub struct Session {
    current: Query,
}

impl Session {
    pub fn new(query: Query) -> Self {
        Self { current: query }
    }

    /// Start a session from SQL text
    pub fn parse(sql: &str, catalog: &Catalog, options: &AnalysisOptions) -> Result<Self> {
        Ok(Self::new(Query::parse(sql, catalog, options)?))
    }

    pub fn current(&self) -> &Query {
        &self.current
    }

    /// Replace the current query with one built from corrected text and
    /// return the previous one. On error the current query is kept.
    pub fn apply_correction(&mut self, sql: &str) -> Result<Query> {
        let corrected = self.current.with_corrected_sql(sql)?;
        log::info!("applied correction: {}", sql.trim());
        Ok(std::mem::replace(&mut self.current, corrected))
    }

    pub fn into_current(self) -> Query {
        self.current
    }
}
