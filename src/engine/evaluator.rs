//! Node orchestration: guard, extract, transform, emit, recurse.
//!
//! One node evaluation runs the fixed algorithm: conditional guard,
//! extraction with alternatives, fallback or discard on emptiness, the
//! transformer pipeline (or the joined variant), UUID suffixes, object
//! construction and sub-node recursion per emitted triple.

use super::{accessor, condition, transform, WarningSink};
use crate::descriptor::{CompiledNode, Join, ObjectKind, Requirement};
use crate::error::EvalError;
use crate::record::Record;
use crate::triple::{Triple, TripleObject};

/// Evaluate one node against one record under the given subject.
///
/// `Err(RecordDiscarded)` propagates from mandatory nodes that stayed
/// empty through every path; the driver drops the whole record then.
pub(crate) fn evaluate_node(
    node: &CompiledNode,
    subject: &str,
    record: &Record,
    sink: &mut WarningSink,
) -> Result<Vec<Triple>, EvalError> {
    if let Some(guard) = &node.condition {
        if !condition::holds(guard, record) {
            // a false guard skips the node, fallback included
            return Ok(Vec::new());
        }
    }

    let mut values = accessor::read(record, &node.field);
    if values.is_empty() {
        for alternative in &node.alternatives {
            values = accessor::read(record, alternative);
            if !values.is_empty() {
                break;
            }
        }
    }

    if values.is_empty() {
        if let Some(fallback) = &node.fallback {
            // predicate and requirement were inherited at compile time
            return evaluate_node(fallback, subject, record, sink);
        }
        return match node.required {
            Requirement::Mandatory => Err(EvalError::RecordDiscarded {
                node: node.label.clone(),
            }),
            Requirement::Optional => Ok(Vec::new()),
        };
    }

    let pairs: Vec<(String, String)> = match &node.join {
        Some(join) => join_objects(node, join, &values, record, sink),
        None => transform::apply(node, &values, record)
            .into_iter()
            .map(|object| (node.predicate.clone(), object))
            .collect(),
    };

    let uuid_predicate = (!node.uuid_predicate_fields.is_empty())
        .then(|| transform::derive_uuid(record, &node.uuid_predicate_fields));
    let uuid_object = (!node.uuid_object_fields.is_empty())
        .then(|| transform::derive_uuid(record, &node.uuid_object_fields));

    let mut triples = Vec::with_capacity(pairs.len());
    for (mut predicate, mut object) in pairs {
        if let Some(suffix) = &uuid_predicate {
            predicate.push_str(suffix);
        }
        if let Some(suffix) = &uuid_object {
            object.push_str(suffix);
        }
        if node.kind == ObjectKind::Uri && object.is_empty() {
            // IRIs must be non-empty, empty literals are an authoring choice
            continue;
        }

        let object = match node.kind {
            ObjectKind::Uri => TripleObject::uri(object),
            ObjectKind::Literal => TripleObject::literal(object, node.tag.clone()),
        };
        let triple = Triple::new(subject, predicate, object);

        let sub_subject = triple.object.lexical().to_string();
        triples.push(triple);
        for sub in &node.sub_nodes {
            triples.extend(evaluate_node(sub, &sub_subject, record, sink)?);
        }
    }
    Ok(triples)
}

/// The joined variant of the pipeline: values pair positionally with the
/// joined field, the mapping step is skipped and each pair selects its own
/// predicate. A length mismatch contributes nothing but a warning.
fn join_objects(
    node: &CompiledNode,
    join: &Join,
    values: &crate::record::ScalarSeq,
    record: &Record,
    sink: &mut WarningSink,
) -> Vec<(String, String)> {
    let joined = accessor::read(record, &join.field);
    if joined.len() != values.len() {
        sink.push(
            &node.label,
            format!(
                "`joined_field` yielded {} values for {} extracted, skipping the node",
                joined.len(),
                values.len()
            ),
        );
        return Vec::new();
    }

    let mut pairs = Vec::with_capacity(values.len());
    for (value, partner) in values.iter().zip(joined.iter()) {
        let rendered = value.render();
        if !transform::passes_match(&rendered, &node.rewrite) {
            continue;
        }
        let finished = transform::finish_value(&rendered, &node.rewrite);
        let expanded = match &node.insert {
            Some(template) => transform::expand_insert(template, &finished, record),
            None => vec![finished],
        };
        // a miss in the joined map inherits the node's own predicate
        let predicate = join
            .map
            .get(&partner.render())
            .cloned()
            .unwrap_or_else(|| node.predicate.clone());
        for object in expanded {
            let object = node.static_field.clone().unwrap_or(object);
            pairs.push((predicate.clone(), object));
        }
    }
    pairs
}

/// Run the head node and demand exactly one surviving object, the record
/// subject
pub(crate) fn derive_subject(
    head: &CompiledNode,
    record: &Record,
    sink: &mut WarningSink,
) -> Result<String, EvalError> {
    let triples = match evaluate_node(head, "", record, sink) {
        Ok(triples) => triples,
        Err(EvalError::RecordDiscarded { .. }) => return Err(EvalError::SubjectMissing),
        Err(other) => return Err(other),
    };
    match triples.as_slice() {
        [] => Err(EvalError::SubjectMissing),
        [only] => Ok(only.object.lexical().to_string()),
        many => Err(EvalError::SubjectAmbiguous { count: many.len() }),
    }
}
