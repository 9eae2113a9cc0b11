//! Unique-constraint propagation
//!
//! Derives the uniqueness guarantees of a SELECT's output from those of its
//! referenced tables:
//! 1. Seed each table's constraints, tagged with the table's index
//! 2. Combine tables by Cartesian product of their constraints
//! 3. Add the GROUP BY column set when every grouping item is a column
//! 4. Widen constraints across `column = column` equivalence classes
//! 5. Add the ALL constraint for DISTINCT
//! 6. Keep only constraints fully visible in the projection
//!
//! A reported guarantee must hold, so every step errs on the side of
//! dropping a constraint.

use crate::disjoint_set::DisjointSet;
use indexmap::IndexSet;
use sqlscope_catalog::{Column, ConstraintKind, Table, UniqueConstraint, UniqueConstraintColumn};

/// Inputs to constraint propagation for one SELECT
#[derive(Debug, Default)]
pub struct ConstraintInputs<'a> {
    pub tables: &'a [Table],
    /// Resolved `column = column` join predicates
    pub equalities: Vec<(UniqueConstraintColumn, UniqueConstraintColumn)>,
    /// Grouped columns, when every GROUP BY item is a column
    pub group_by: Option<Vec<UniqueConstraintColumn>>,
    pub distinct: bool,
}

/// Output constraints of a SELECT projecting `output`
pub fn propagate(inputs: &ConstraintInputs<'_>, output: &[Column]) -> Vec<UniqueConstraint> {
    let mut candidates = cartesian(&seed(inputs.tables));

    if let Some(columns) = &inputs.group_by {
        candidates.push(UniqueConstraint::new(columns.iter().cloned(), ConstraintKind::Unique));
    }

    let candidates = widen(candidates, &inputs.equalities);

    let mut result: IndexSet<UniqueConstraint> = candidates
        .into_iter()
        .filter(|c| is_visible(c, output))
        .collect();

    if inputs.distinct {
        result.insert(UniqueConstraint::all_rows());
    }

    result.into_iter().collect()
}

/// Per-table constraints tagged with the table's position.
///
/// The whole-row constraint of a derived table becomes the set of all its
/// columns.
pub fn seed(tables: &[Table]) -> Vec<Vec<UniqueConstraint>> {
    tables
        .iter()
        .enumerate()
        .map(|(idx, table)| {
            table
                .unique_constraints()
                .iter()
                .map(|c| {
                    if c.is_all() {
                        table.all_columns_constraint(Some(idx), ConstraintKind::Unique)
                    } else {
                        UniqueConstraint::new(
                            c.columns
                                .iter()
                                .map(|col| UniqueConstraintColumn::new(col.name.clone(), Some(idx))),
                            c.kind,
                        )
                    }
                })
                .collect()
        })
        .collect()
}

/// One constraint per combination of one constraint from each table.
///
/// A table without constraints makes the product empty. Combined
/// constraints are plain UNIQUE; a single table keeps its kinds.
pub fn cartesian(seeds: &[Vec<UniqueConstraint>]) -> Vec<UniqueConstraint> {
    let Some((first, rest)) = seeds.split_first() else {
        return Vec::new();
    };

    let mut product = first.clone();
    for constraints in rest {
        let mut merged = Vec::with_capacity(product.len() * constraints.len());
        for left in &product {
            for right in constraints {
                merged.push(UniqueConstraint::new(
                    left.columns.iter().chain(right.columns.iter()).cloned(),
                    ConstraintKind::Unique,
                ));
            }
        }
        product = merged;
    }
    product
}

/// Widen constraints across equivalence classes of equal columns.
///
/// A constraint touching a class is extended with the whole class; every
/// variant that keeps a single member of each touched class is emitted as
/// well. Duplicates are removed, first occurrence wins.
pub fn widen(
    constraints: Vec<UniqueConstraint>,
    equalities: &[(UniqueConstraintColumn, UniqueConstraintColumn)],
) -> Vec<UniqueConstraint> {
    if equalities.is_empty() {
        return dedup(constraints);
    }

    let mut classes = DisjointSet::new();
    for (left, right) in equalities {
        classes.union(left.clone(), right.clone());
    }
    let groups: Vec<Vec<UniqueConstraintColumn>> = classes.groups().into_iter().filter(|g| g.len() > 1).collect();
    log::debug!(
        "equality groups: {:?}",
        groups
            .iter()
            .map(|g| g.iter().map(ToString::to_string).collect::<Vec<_>>())
            .collect::<Vec<_>>()
    );

    let mut result = IndexSet::new();
    for constraint in constraints {
        let touched: Vec<&Vec<UniqueConstraintColumn>> = groups
            .iter()
            .filter(|g| g.iter().any(|col| constraint.columns.contains(col)))
            .collect();
        if touched.is_empty() {
            result.insert(constraint);
            continue;
        }

        let mut widened = constraint.clone();
        for group in &touched {
            widened.columns.extend(group.iter().cloned());
        }

        let mut variants = vec![widened];
        for group in &touched {
            let mut next = Vec::with_capacity(variants.len() * (group.len() + 1));
            for variant in &variants {
                next.push(variant.clone());
                for member in group.iter() {
                    let mut narrowed = variant.clone();
                    narrowed.columns.retain(|col| !group.contains(col));
                    narrowed.columns.insert(member.clone());
                    next.push(narrowed);
                }
            }
            variants = next;
        }
        result.extend(variants);
    }
    result.into_iter().collect()
}

fn dedup(constraints: Vec<UniqueConstraint>) -> Vec<UniqueConstraint> {
    constraints
        .into_iter()
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Returns true if every constraint column is an output column with the
/// same name and table index
pub fn is_visible(constraint: &UniqueConstraint, output: &[Column]) -> bool {
    constraint.columns.iter().all(|col| {
        col.table_idx.is_some()
            && output
                .iter()
                .any(|out| out.table_idx == col.table_idx && out.name == col.name)
    })
}

// === Set operations ===

/// Output constraints of a UNION: only whole-row uniqueness survives, and
/// only without ALL
pub fn union_constraints(all: bool) -> Vec<UniqueConstraint> {
    if all {
        Vec::new()
    } else {
        vec![UniqueConstraint::all_rows()]
    }
}

/// Output constraints of INTERSECT and EXCEPT: the left operand's
/// column constraints, plus whole-row uniqueness without ALL
pub fn left_constraints(left: &[UniqueConstraint], all: bool) -> Vec<UniqueConstraint> {
    let mut result: Vec<UniqueConstraint> = left.iter().filter(|c| !c.is_all()).cloned().collect();
    if !all {
        result.push(UniqueConstraint::all_rows());
    }
    result
}
