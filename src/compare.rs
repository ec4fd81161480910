//! Typed comparison across dynamically-typed event values.
//!
//! The relation is partial: only number/number and
//! string/string pairs carry a real ordering, and every other pair
//! (including cross-type pairs and booleans) compares as `Less`. Callers
//! use it for equality checks and strict-less ordering, never as a total
//! order, so sorts built on it must be stable.

use std::cmp::Ordering;

use serde_json::{Number, Value};

pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(lhs), Value::Number(rhs)) => compare_numbers(lhs, rhs),
        (Value::String(lhs), Value::String(rhs)) => lhs.cmp(rhs),
        _ => Ordering::Less,
    }
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal
}

fn compare_numbers(lhs: &Number, rhs: &Number) -> Ordering {
    if let (Some(l), Some(r)) = (lhs.as_i64(), rhs.as_i64()) {
        return l.cmp(&r);
    }
    if lhs.is_f64() && rhs.is_f64() {
        return compare_floats(lhs.as_f64().unwrap_or(f64::NAN), rhs.as_f64().unwrap_or(f64::NAN));
    }
    // Mixed representations (integer vs float, or integers beyond i64)
    // compare as doubles.
    compare_floats(lhs.as_f64().unwrap_or(0.0), rhs.as_f64().unwrap_or(0.0))
}

// IEEE ordering; any comparison involving NaN is Greater, so NaN sorts
// after every finite value.
fn compare_floats(l: f64, r: f64) -> Ordering {
    if l == r {
        Ordering::Equal
    } else if l < r {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers_compare_arithmetically() {
        assert_eq!(compare_values(&json!(1), &json!(2)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(2)), Ordering::Equal);
        assert_eq!(compare_values(&json!(3), &json!(2)), Ordering::Greater);
        assert_eq!(
            compare_values(&json!(i64::MIN), &json!(i64::MAX)),
            Ordering::Less
        );
    }

    #[test]
    fn floats_follow_ieee_ordering() {
        assert_eq!(compare_values(&json!(1.5), &json!(2.5)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2.5)), Ordering::Equal);
        assert_eq!(compare_values(&json!(2.5), &json!(1.5)), Ordering::Greater);
    }

    #[test]
    fn nan_sorts_after_everything() {
        let nan = Value::from(f64::NAN);
        // serde_json renders NaN as null, which falls into the cross-type
        // branch; build the comparison at the float level instead.
        assert!(nan.is_null());
        assert_eq!(super::compare_floats(f64::NAN, 1.0), Ordering::Greater);
        assert_eq!(super::compare_floats(1.0, f64::NAN), Ordering::Greater);
    }

    #[test]
    fn mixed_number_representations_compare_as_doubles() {
        assert_eq!(compare_values(&json!(2), &json!(2.0)), Ordering::Equal);
        assert_eq!(compare_values(&json!(1), &json!(1.5)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
    }

    #[test]
    fn strings_compare_lexicographically() {
        assert_eq!(compare_values(&json!("a"), &json!("b")), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("b")), Ordering::Equal);
        assert_eq!(compare_values(&json!("ba"), &json!("b")), Ordering::Greater);
    }

    #[test]
    fn all_other_pairs_compare_less() {
        assert_eq!(compare_values(&json!(true), &json!(true)), Ordering::Less);
        assert_eq!(compare_values(&json!(null), &json!(null)), Ordering::Less);
        assert_eq!(compare_values(&json!(1), &json!("1")), Ordering::Less);
        assert_eq!(compare_values(&json!("1"), &json!(1)), Ordering::Less);
        assert_eq!(
            compare_values(&json!([1, 2]), &json!([1, 2])),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&json!({"a": 1}), &json!({"a": 1})),
            Ordering::Less
        );
    }

    #[test]
    fn equality_helper_tracks_compare() {
        assert!(values_equal(&json!("us"), &json!("us")));
        assert!(!values_equal(&json!("us"), &json!("eu")));
        // Booleans never compare equal under the partial relation.
        assert!(!values_equal(&json!(true), &json!(true)));
    }
}
