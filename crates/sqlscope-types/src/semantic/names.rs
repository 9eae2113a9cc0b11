//! Names as they appear in the sqlparser AST

use sqlparser::ast::{Expr, Ident, ObjectName, ObjectNamePart};
use sqlscope_catalog::normalize_identifier;

/// Stored name of an identifier: quoted text keeps its case, anything else
/// is lowercased
pub fn ident_name(ident: &Ident) -> String {
    normalize_identifier(&ident.to_string())
}

/// Raw text of each part of a dotted object name, quotes included
pub fn object_name_parts(name: &ObjectName) -> Vec<String> {
    name.0
        .iter()
        .filter_map(|part| match part {
            ObjectNamePart::Identifier(ident) => Some(ident.to_string()),
            #[allow(unreachable_patterns)]
            _ => None,
        })
        .collect()
}

/// A column reference: optional table qualifier and column name, both
/// stored names.
///
/// `a`, `t.a` and `s.t.a` are column references; anything else is not.
pub fn column_ref(expr: &Expr) -> Option<(Option<String>, String)> {
    match expr {
        Expr::Identifier(ident) => Some((None, ident_name(ident))),
        Expr::CompoundIdentifier(parts) => match parts.as_slice() {
            [] => None,
            [column] => Some((None, ident_name(column))),
            [.., table, column] => Some((Some(ident_name(table)), ident_name(column))),
        },
        Expr::Nested(inner) => column_ref(inner),
        _ => None,
    }
}
