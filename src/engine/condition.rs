//! Conditional guard evaluation.
//!
//! Guards read their own field through the accessor, rewrite it
//! independently of the main pipeline and compare with numeric coercion:
//! both sides are read as the narrowest of int, float, string that fits
//! both, and absence counts as infinitely negative.

use std::cmp::Ordering;

use super::{accessor, transform};
use crate::descriptor::{CompareOp, CondValue, Condition};
use crate::record::{Record, Scalar};

/// Evaluate one guard against the record. A false guard skips the node
/// entirely; it does not trigger the fallback.
pub(crate) fn holds(condition: &Condition, record: &Record) -> bool {
    let extracted = accessor::read(record, &condition.field);
    let values: Vec<Scalar> = if condition.rewrite.is_empty() {
        extracted.into_iter().collect()
    } else {
        extracted
            .iter()
            .filter_map(|scalar| transform::rewrite_scalar(scalar, &condition.rewrite))
            .map(Scalar::Str)
            .collect()
    };

    if values.is_empty() {
        return condition.op.holds_for_absent();
    }

    match (&condition.value, condition.op) {
        (CondValue::None, CompareOp::Exists) => true,
        (CondValue::One(expected), op) => values.iter().any(|value| compare(value, expected, op)),
        (CondValue::Many(list), CompareOp::Eq) => values
            .iter()
            .any(|value| list.iter().any(|expected| equal(value, expected))),
        (CondValue::Many(list), CompareOp::Neq) => !values
            .iter()
            .any(|value| list.iter().any(|expected| equal(value, expected))),
        // remaining shapes are rejected at load time
        _ => {
            debug_assert!(false, "condition shape not caught by the loader");
            false
        }
    }
}

fn compare(a: &Scalar, b: &Scalar, op: CompareOp) -> bool {
    let ordering = scalar_cmp(a, b);
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Neq => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Exists => true,
    }
}

#[inline]
fn equal(a: &Scalar, b: &Scalar) -> bool {
    scalar_cmp(a, b) == Ordering::Equal
}

/// Numeric order when both sides are numeric, lexicographic otherwise
fn scalar_cmp(a: &Scalar, b: &Scalar) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        if let Some(ordering) = x.partial_cmp(&y) {
            return ordering;
        }
    }
    a.render().cmp(&b.render())
}
