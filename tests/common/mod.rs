use serde_json::{json, Value};
use spcht_rs::{Evaluated, Spcht};

/// Compile a descriptor document, panicking on authoring mistakes
#[allow(dead_code)]
pub fn compile(doc: Value) -> Spcht {
    Spcht::from_value(&doc, None).expect("descriptor compiles")
}

/// A descriptor with the default flat head and a single body node
#[allow(dead_code)]
pub fn single_node_descriptor(node: Value) -> Value {
    json!({
        "id_source": "flat",
        "id_field": "id",
        "nodes": [node]
    })
}

/// The object lexical values of an evaluation, in emission order
#[allow(dead_code)]
pub fn objects(out: &Evaluated) -> Vec<String> {
    out.triples
        .iter()
        .map(|triple| triple.object.lexical().to_string())
        .collect()
}

/// The predicates of an evaluation, in emission order
#[allow(dead_code)]
pub fn predicates(out: &Evaluated) -> Vec<String> {
    out.triples
        .iter()
        .map(|triple| triple.predicate.clone())
        .collect()
}
