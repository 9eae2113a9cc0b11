//! Implicit cast rules
//!
//! SQL written by hand mixes literals freely: `price > '10'` and
//! `date > '11-05-2020'` are both accepted. A string operand is treated as a
//! number (or date) when its literal text parses as one; a string column with
//! no literal value never coerces.

use crate::{ResultType, ScalarKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// How two operands are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `=`, `<>`, `IN`, `IS DISTINCT FROM`
    Equality,
    /// `<`, `>`, `BETWEEN`, ...
    Ordering,
}

/// Parse the textual forms of dates accepted as implicit DATE values
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    for format in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(text, format) {
            return Some(NaiveDateTime::new(NaiveDate::default(), time));
        }
    }
    None
}

/// Returns true if the operand is a number or a numeric string literal
pub fn to_number(ty: &ResultType) -> bool {
    match ty.kind {
        ScalarKind::Number => true,
        ScalarKind::String => ty
            .value
            .as_deref()
            .is_some_and(|v| v.trim().parse::<f64>().is_ok()),
        _ => false,
    }
}

/// Returns true if the operand is a date or a date string literal
pub fn to_date(ty: &ResultType) -> bool {
    match ty.kind {
        ScalarKind::Date => true,
        ScalarKind::String => ty.value.as_deref().and_then(parse_date).is_some(),
        _ => false,
    }
}

/// Returns true if the two operands can be compared.
///
/// NULL and unclassified operands compare with anything.
pub fn comparable(left: &ResultType, right: &ResultType, comparison: Comparison) -> bool {
    use ScalarKind::{Boolean, Date, Null, Number, Unknown};

    match (left.kind, right.kind) {
        (Null | Unknown, _) | (_, Null | Unknown) => true,
        (Boolean, Boolean) => comparison == Comparison::Equality,
        (l, r) if l == r => true,
        (Number, _) | (_, Number) => to_number(left) && to_number(right),
        (Date, _) | (_, Date) => to_date(left) && to_date(right),
        _ => false,
    }
}

/// Standard "expected X, found Y" message tail
pub fn error_message(expected: impl std::fmt::Display, found: ScalarKind) -> String {
    format!("Expected type {expected}, but found type {found}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn string(value: &str) -> ResultType {
        ResultType::literal(ScalarKind::String, Some(value.to_string()))
    }

    #[rstest]
    #[case("2020-01-01")]
    #[case("11-05-2020")]
    #[case("2020/05/11")]
    #[case("11/05/2020")]
    #[case("2020-01-01 10:00:00")]
    #[case("2020-01-01T10:00:00Z")]
    #[case("January 5, 2021")]
    #[case("10:30")]
    fn test_parse_date_accepts(#[case] text: &str) {
        assert!(parse_date(text).is_some(), "{text}");
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("2020-13-45")]
    #[case("3.14")]
    fn test_parse_date_rejects(#[case] text: &str) {
        assert!(parse_date(text).is_none(), "{text}");
    }

    #[test]
    fn test_numeric_strings() {
        assert!(to_number(&string("4")));
        assert!(to_number(&string(" 0.5 ")));
        assert!(to_number(&string("1e3")));
        assert!(!to_number(&string("four")));
        assert!(!to_number(&ResultType::new(ScalarKind::String)));
        assert!(!to_number(&ResultType::new(ScalarKind::Boolean)));
    }

    #[test]
    fn test_comparable() {
        let num = ResultType::new(ScalarKind::Number);
        let boolean = ResultType::new(ScalarKind::Boolean);
        let date = ResultType::new(ScalarKind::Date);

        assert!(comparable(&num, &string("3"), Comparison::Ordering));
        assert!(!comparable(&num, &string("abc"), Comparison::Ordering));
        assert!(comparable(&date, &string("11-05-2020"), Comparison::Ordering));
        assert!(comparable(&boolean, &boolean, Comparison::Equality));
        assert!(!comparable(&boolean, &boolean, Comparison::Ordering));
        assert!(!comparable(&boolean, &num, Comparison::Equality));
        assert!(comparable(&num, &ResultType::null(), Comparison::Ordering));
        assert!(comparable(&string("a"), &ResultType::new(ScalarKind::String), Comparison::Ordering));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message("boolean", ScalarKind::Number),
            "Expected type boolean, but found type number."
        );
    }
}
