//! The value transformer: pure per-value string operations.
//!
//! Pipeline order is fixed: match filter, mapping, cut+replace, affixes,
//! template insertion, static replacement. Field refs and `if_*` guards
//! reuse the same rewrite steps minus the mapping.

use uuid::Uuid;

use super::accessor;
use crate::descriptor::{CompiledNode, FieldPath, InsertTemplate, Rewrite};
use crate::record::{Record, Scalar, ScalarSeq};

/// Step 1: does the value survive the `match` filter?
#[inline]
pub(crate) fn passes_match(value: &str, rewrite: &Rewrite) -> bool {
    rewrite
        .matcher
        .as_ref()
        .map_or(true, |matcher| matcher.is_match(value))
}

/// Steps 3 and 4: substitute all `cut` occurrences with `replace`, then
/// wrap with the affixes
pub(crate) fn finish_value(value: &str, rewrite: &Rewrite) -> String {
    let cut = match &rewrite.cut {
        Some(cut) => cut.replace_all(value, rewrite.replace.as_str()),
        None => value.into(),
    };
    if rewrite.prepend.is_empty() && rewrite.append.is_empty() {
        cut.into_owned()
    } else {
        format!("{}{}{}", rewrite.prepend, cut, rewrite.append)
    }
}

/// Full rewrite of one value, as used by field refs and `if_*` guards:
/// match filter, cut+replace, affixes. `None` means filtered out.
pub(crate) fn rewrite_scalar(scalar: &Scalar, rewrite: &Rewrite) -> Option<String> {
    let rendered = scalar.render();
    if !passes_match(&rendered, rewrite) {
        return None;
    }
    Some(finish_value(&rendered, rewrite))
}

/// Run pipeline steps 1 to 5 plus the static replacement over an extracted
/// value sequence, yielding the node's object strings.
pub(crate) fn apply(node: &CompiledNode, values: &ScalarSeq, record: &Record) -> Vec<String> {
    let mut out: Vec<String> = values
        .iter()
        .map(Scalar::render)
        .filter(|value| passes_match(value, &node.rewrite))
        .collect();

    if let Some(mapping) = &node.mapping {
        out = mapping.apply(&out);
    }

    out = out
        .iter()
        .map(|value| finish_value(value, &node.rewrite))
        .collect();

    if let Some(template) = &node.insert {
        out = out
            .iter()
            .flat_map(|value| expand_insert(template, value, record))
            .collect();
    }

    if let Some(constant) = &node.static_field {
        // the values had to exist, but the constant replaces every one of them
        out = out.iter().map(|_| constant.clone()).collect();
    }

    out
}

/// Step 5: resolve the template's additional slots and substitute into the
/// `{}` placeholders positionally.
///
/// Every add field runs its own rewrite. An empty slot drops the value;
/// multi-value slots expand to a cartesian product in slot order with the
/// last slot varying fastest. A template whose placeholder count did not
/// match at load time yields nothing.
pub(crate) fn expand_insert(
    template: &InsertTemplate,
    value: &str,
    record: &Record,
) -> Vec<String> {
    if !template.enabled {
        return Vec::new();
    }

    let mut slots: Vec<Vec<String>> = Vec::with_capacity(1 + template.add_fields.len());
    slots.push(vec![value.to_string()]);
    for add in &template.add_fields {
        let resolved: Vec<String> = accessor::read(record, &add.field)
            .iter()
            .filter_map(|scalar| rewrite_scalar(scalar, &add.rewrite))
            .collect();
        if resolved.is_empty() {
            return Vec::new();
        }
        slots.push(resolved);
    }

    cartesian_fill(&template.parts, &slots)
}

fn cartesian_fill(parts: &[String], slots: &[Vec<String>]) -> Vec<String> {
    let combinations = slots.iter().map(Vec::len).product();
    let mut out = Vec::with_capacity(combinations);
    let mut cursor = vec![0usize; slots.len()];

    loop {
        let mut rendered = String::new();
        for (i, part) in parts.iter().enumerate() {
            rendered.push_str(part);
            if i < slots.len() {
                rendered.push_str(&slots[i][cursor[i]]);
            }
        }
        out.push(rendered);

        // odometer advance, last slot fastest
        let mut pos = slots.len();
        loop {
            if pos == 0 {
                return out;
            }
            pos -= 1;
            cursor[pos] += 1;
            if cursor[pos] < slots[pos].len() {
                break;
            }
            cursor[pos] = 0;
        }
    }
}

/// Deterministic v5 UUID over the concatenated values of the listed
/// fields, in list order, without separator
pub(crate) fn derive_uuid(record: &Record, fields: &[FieldPath]) -> String {
    let mut name = String::new();
    for field in fields {
        for scalar in accessor::read(record, field) {
            name.push_str(&scalar.render());
        }
    }
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}
