//! Input record model.
//!
//! A record is one JSON object presenting two logical views at once: the
//! flat view (its top-level keys) and, when the configured MARC key holds
//! an object, the MARC view (tag -> subfield map, pre-parsed upstream).
//! The engine only ever borrows the record; evaluation never mutates it.

use std::fmt;

use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::error::EvalError;

/// SmallVec for extracted values - avoids heap allocation for common cases (<= 4 values)
pub type ScalarSeq = SmallVec<[Scalar; 4]>;

/// A single typed value extracted from a record.
///
/// The original type is kept so that conditions can compare numerically;
/// the transformer renders to strings on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Read a scalar out of a JSON value. Containers and nulls yield `None`;
    /// booleans are kept in their string form.
    pub fn from_value(value: &Value) -> Option<Scalar> {
        match value {
            Value::String(s) => Some(Scalar::Str(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Scalar::Int(i))
                } else {
                    n.as_f64().map(Scalar::Float)
                }
            }
            Value::Bool(b) => Some(Scalar::Str(b.to_string())),
            _ => None,
        }
    }

    /// String rendering used by the transformer and templates
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Numeric reading, for integers and floats as well as numeric strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Str(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Integer reading, only when the value is an integer or an integral string
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            Scalar::Float(_) => None,
            Scalar::Str(s) => s.trim().parse::<i64>().ok(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

/// Borrowed view over one input record
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    flat: &'a Map<String, Value>,
    marc: Option<&'a Map<String, Value>>,
}

impl<'a> Record<'a> {
    /// Wrap a JSON object as a record. The MARC view is attached when
    /// `marc_key` holds an object; any other shape under that key means the
    /// record simply has no MARC view.
    pub fn new(root: &'a Value, marc_key: &str) -> Result<Record<'a>, EvalError> {
        let flat = root.as_object().ok_or(EvalError::MalformedRecord)?;
        let marc = flat.get(marc_key).and_then(Value::as_object);
        Ok(Record { flat, marc })
    }

    /// The flat view: the record's own top-level map
    #[inline]
    pub fn flat(&self) -> &'a Map<String, Value> {
        self.flat
    }

    /// The MARC view, when present
    #[inline]
    pub fn marc(&self) -> Option<&'a Map<String, Value>> {
        self.marc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_from_json_values() {
        assert_eq!(
            Scalar::from_value(&json!("abc")),
            Some(Scalar::Str("abc".to_string()))
        );
        assert_eq!(Scalar::from_value(&json!(42)), Some(Scalar::Int(42)));
        assert_eq!(Scalar::from_value(&json!(1.5)), Some(Scalar::Float(1.5)));
        assert_eq!(
            Scalar::from_value(&json!(true)),
            Some(Scalar::Str("true".to_string()))
        );
        assert_eq!(Scalar::from_value(&json!(null)), None);
        assert_eq!(Scalar::from_value(&json!([1, 2])), None);
        assert_eq!(Scalar::from_value(&json!({"a": 1})), None);
    }

    #[test]
    fn scalar_rendering_is_shortest_form() {
        assert_eq!(Scalar::Int(7).render(), "7");
        assert_eq!(Scalar::Float(51.33).render(), "51.33");
        assert_eq!(Scalar::Str("x".into()).render(), "x");
    }

    #[test]
    fn record_requires_an_object() {
        assert!(Record::new(&json!([1, 2]), "fullrecord").is_err());
        assert!(Record::new(&json!("nope"), "fullrecord").is_err());
        assert!(Record::new(&json!({"id": "1"}), "fullrecord").is_ok());
    }

    #[test]
    fn marc_view_is_attached_only_for_objects() {
        let with = json!({"id": "1", "fullrecord": {"001": {"none": "x"}}});
        let record = Record::new(&with, "fullrecord").unwrap();
        assert!(record.marc().is_some());

        let without = json!({"id": "1", "fullrecord": "raw marc blob"});
        let record = Record::new(&without, "fullrecord").unwrap();
        assert!(record.marc().is_none());

        let renamed = json!({"id": "1", "marc21": {"001": {"none": "x"}}});
        let record = Record::new(&renamed, "marc21").unwrap();
        assert!(record.marc().is_some());
    }
}
