//! Uniform value extraction against either record view.
//!
//! One operation: read a compiled field path out of a record, yielding an
//! ordered scalar sequence. Missing keys and absent views read as empty,
//! never as an error.

use serde_json::Value;

use crate::descriptor::{FieldPath, SubfieldCode};
use crate::record::{Record, Scalar, ScalarSeq};

/// Read a field path. Order within multi-value fields is preserved; MARC
/// field repetitions concatenate in record order.
pub(crate) fn read(record: &Record, path: &FieldPath) -> ScalarSeq {
    match path {
        FieldPath::Flat(key) => read_flat(record, key),
        FieldPath::Marc { tag, code } => read_marc(record, tag, code),
    }
}

fn read_flat(record: &Record, key: &str) -> ScalarSeq {
    let mut out = ScalarSeq::new();
    match record.flat().get(key) {
        None => {}
        Some(Value::Array(items)) => {
            for item in items {
                if let Some(scalar) = Scalar::from_value(item) {
                    out.push(scalar);
                }
            }
        }
        Some(other) => {
            if let Some(scalar) = Scalar::from_value(other) {
                out.push(scalar);
            }
        }
    }
    out
}

fn read_marc(record: &Record, tag: &str, code: &SubfieldCode) -> ScalarSeq {
    let mut out = ScalarSeq::new();
    let Some(marc) = record.marc() else {
        return out;
    };
    let Some(entry) = marc.get(tag) else {
        return out;
    };

    match entry {
        Value::Array(repetitions) => {
            for repetition in repetitions {
                collect_subfield(repetition, code, &mut out);
            }
        }
        single => collect_subfield(single, code, &mut out),
    }
    out
}

fn collect_subfield(repetition: &Value, code: &SubfieldCode, out: &mut ScalarSeq) {
    match repetition {
        Value::Object(subfields) => match subfields.get(&code.as_key()) {
            Some(Value::Array(items)) => {
                for item in items {
                    if let Some(scalar) = Scalar::from_value(item) {
                        out.push(scalar);
                    }
                }
            }
            Some(other) => {
                if let Some(scalar) = Scalar::from_value(other) {
                    out.push(scalar);
                }
            }
            None => {}
        },
        // a bare scalar field only answers the `none` address
        other => {
            if matches!(code, SubfieldCode::NoCode) {
                if let Some(scalar) = Scalar::from_value(other) {
                    out.push(scalar);
                }
            }
        }
    }
}
