//! `BackendEvent` criteria operators.

use bench_types::CriteriaOp;
use serde_json::Value;

/// Evaluate one operator against an event field's actual value.
///
/// An operator mismatched against its value shape (e.g. `greater_than` on
/// a non-numeric value, or `in_list` where `value` is not an array) fails
/// closed — returns `false` rather than erroring, per the predicate
/// model's "unknown operator fails closed" rule generalized to shape
/// mismatches.
pub fn apply(op: CriteriaOp, actual: &Value, expected: &Value) -> bool {
    match op {
        CriteriaOp::Equals => actual == expected,
        CriteriaOp::NotEquals => actual != expected,
        CriteriaOp::Contains => contains(actual, expected),
        CriteriaOp::NotContains => !contains(actual, expected),
        CriteriaOp::GreaterThan => numeric_cmp(actual, expected, |a, b| a > b),
        CriteriaOp::LessThan => numeric_cmp(actual, expected, |a, b| a < b),
        CriteriaOp::GreaterEqual => numeric_cmp(actual, expected, |a, b| a >= b),
        CriteriaOp::LessEqual => numeric_cmp(actual, expected, |a, b| a <= b),
        CriteriaOp::InList => in_list(actual, expected),
        CriteriaOp::NotInList => !in_list(actual, expected),
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(e)) => a.contains(e.as_str()),
        (Value::Array(items), e) => items.contains(e),
        _ => false,
    }
}

fn numeric_cmp(actual: &Value, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(e)) => cmp(a, e),
        _ => false,
    }
}

fn in_list(actual: &Value, expected: &Value) -> bool {
    match expected.as_array() {
        Some(items) => items.contains(actual),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equals_and_not_equals() {
        assert!(apply(CriteriaOp::Equals, &json!("a"), &json!("a")));
        assert!(apply(CriteriaOp::NotEquals, &json!("a"), &json!("b")));
    }

    #[test]
    fn numeric_comparisons() {
        assert!(apply(CriteriaOp::GreaterThan, &json!(5), &json!(3)));
        assert!(!apply(CriteriaOp::GreaterThan, &json!(2), &json!(3)));
        assert!(apply(CriteriaOp::LessEqual, &json!(3), &json!(3)));
    }

    #[test]
    fn numeric_comparison_on_non_numeric_fails_closed() {
        assert!(!apply(CriteriaOp::GreaterThan, &json!("x"), &json!(3)));
    }

    #[test]
    fn in_list_requires_expected_to_be_a_sequence() {
        assert!(apply(CriteriaOp::InList, &json!("b"), &json!(["a", "b"])));
        assert!(!apply(CriteriaOp::InList, &json!("b"), &json!("b")));
    }

    #[test]
    fn contains_on_string_and_array() {
        assert!(apply(CriteriaOp::Contains, &json!("hello world"), &json!("world")));
        assert!(apply(CriteriaOp::Contains, &json!([1, 2, 3]), &json!(2)));
    }
}
