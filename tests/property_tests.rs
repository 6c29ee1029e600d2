//! Engine-wide laws: determinism, purity, ordering, fallback, mapping,
//! join, absence and UUID behavior

mod common;

use common::{compile, objects, single_node_descriptor};
use serde_json::json;
use spcht_rs::EvalError;
use uuid::Uuid;

#[test]
fn evaluation_is_deterministic() {
    let engine = compile(single_node_descriptor(json!({
        "source": "flat",
        "field": "ctrlnum",
        "predicate": "P:ctrl",
        "required": "optional",
        "cut": "^\\([^)]*\\)",
        "replace": "",
        "sub_nodes": [{
            "source": "flat",
            "field": "sigil",
            "predicate": "P:sigil",
            "required": "optional"
        }]
    })));
    let record = json!({
        "id": "1",
        "ctrlnum": ["(DE-627)657", "(DE-576)965"],
        "sigil": "DE-15"
    });

    let first = engine.process_data(&record, "g:").unwrap();
    let second = engine.process_data(&record, "g:").unwrap();
    assert_eq!(first, second);
}

#[test]
fn evaluation_does_not_mutate_the_record() {
    let engine = compile(single_node_descriptor(json!({
        "source": "flat",
        "field": "title",
        "predicate": "P:title",
        "required": "optional",
        "prepend": "t:"
    })));
    let record = json!({"id": "1", "title": ["A", "B"]});
    let snapshot = record.clone();

    engine.process_data(&record, "").unwrap();
    assert_eq!(record, snapshot);
}

#[test]
fn value_order_survives_filtering() {
    let engine = compile(single_node_descriptor(json!({
        "source": "flat",
        "field": "codes",
        "predicate": "P:code",
        "required": "optional",
        "match": "^\\d+$"
    })));
    let record = json!({"id": "1", "codes": ["10", "x", "20", "y", "30"]});
    let out = engine.process_data(&record, "").unwrap();
    assert_eq!(objects(&out), vec!["10", "20", "30"]);
}

#[test]
fn exhausted_paths_of_a_mandatory_node_always_discard() {
    let engine = compile(single_node_descriptor(json!({
        "source": "flat",
        "field": "a",
        "alternatives": ["b", "c"],
        "predicate": "P:x",
        "required": "mandatory",
        "fallback": {
            "source": "flat",
            "field": "d",
            "fallback": {"source": "flat", "field": "e"}
        }
    })));
    let err = engine
        .process_data(&json!({"id": "1", "unrelated": "x"}), "")
        .unwrap_err();
    assert!(matches!(err, EvalError::RecordDiscarded { .. }));
}

#[test]
fn mapping_default_fires_exactly_once_without_hits() {
    let node = json!({
        "source": "flat",
        "field": "role",
        "predicate": "P:role",
        "required": "optional",
        "mapping": {"aut": "U:aut"},
        "mapping_settings": {"$default": "U:unknown"}
    });

    let engine = compile(single_node_descriptor(node));
    let out = engine
        .process_data(&json!({"id": "1", "role": ["xyz", "abc", "qqq"]}), "")
        .unwrap();
    assert_eq!(objects(&out), vec!["U:unknown"]);

    let out = engine
        .process_data(&json!({"id": "1", "role": ["aut", "xyz"]}), "")
        .unwrap();
    assert_eq!(objects(&out), vec!["U:aut"]);
}

#[test]
fn join_length_law() {
    let node = json!({
        "source": "flat",
        "field": "people",
        "joined_field": "roles",
        "joined_map": {"aut": "P:aut", "edt": "P:edt"},
        "predicate": "P:contributor",
        "required": "optional"
    });
    let engine = compile(single_node_descriptor(node));

    // unequal lengths evaluate to nothing, with a warning
    let out = engine
        .process_data(
            &json!({"id": "1", "people": ["A", "B", "C"], "roles": ["aut"]}),
            "",
        )
        .unwrap();
    assert!(out.triples.is_empty());
    assert_eq!(out.warnings.len(), 1);

    // equal lengths emit exactly len(field) triples
    let out = engine
        .process_data(
            &json!({"id": "1", "people": ["A", "B", "C"], "roles": ["aut", "edt", "zzz"]}),
            "",
        )
        .unwrap();
    assert_eq!(out.triples.len(), 3);
    assert!(out.warnings.is_empty());
}

#[test]
fn absence_truth_table() {
    let emits = |condition: &str| {
        let engine = compile(single_node_descriptor(json!({
            "source": "flat",
            "field": "title",
            "predicate": "P:title",
            "required": "optional",
            "if_field": "gone",
            "if_condition": condition,
            "if_value": "5"
        })));
        let out = engine
            .process_data(&json!({"id": "1", "title": "T"}), "")
            .unwrap();
        !out.triples.is_empty()
    };

    assert!(!emits("=="));
    assert!(!emits(">"));
    assert!(!emits(">="));
    assert!(emits("!="));
    assert!(emits("<"));
    assert!(emits("<="));
}

#[test]
fn uuid_suffixes_are_stable_across_instances() {
    let node = json!({
        "source": "flat",
        "field": "inst",
        "predicate": "P:loc",
        "required": "optional",
        "append_uuid_predicate_fields": ["lat", "lon"],
        "append_uuid_object_fields": ["lat", "lon"]
    });
    let record = json!({"id": "1", "inst": "DE-15", "lat": "51.33", "lon": "12.37"});

    let first = compile(single_node_descriptor(node.clone()))
        .process_data(&record, "")
        .unwrap();
    let second = compile(single_node_descriptor(node))
        .process_data(&record, "")
        .unwrap();
    assert_eq!(first.triples, second.triples);

    let suffix = Uuid::new_v5(&Uuid::NAMESPACE_OID, b"51.3312.37").to_string();
    assert_eq!(first.triples[0].predicate, format!("P:loc{suffix}"));
    assert_eq!(first.triples[0].object.lexical(), format!("DE-15{suffix}"));
}

#[test]
fn every_sub_triple_subject_is_a_parent_object() {
    let engine = compile(single_node_descriptor(json!({
        "source": "flat",
        "field": "branches",
        "predicate": "P:branch",
        "required": "optional",
        "prepend": "org:",
        "sub_nodes": [{
            "source": "flat",
            "field": "labels",
            "predicate": "P:label",
            "required": "optional"
        }]
    })));
    let record = json!({
        "id": "1",
        "branches": ["01", "02", "03"],
        "labels": ["east", "west"]
    });
    let out = engine.process_data(&record, "").unwrap();

    let parent_objects: Vec<&str> = out
        .triples
        .iter()
        .filter(|t| t.predicate == "P:branch")
        .map(|t| t.object.lexical())
        .collect();
    assert_eq!(parent_objects.len(), 3);

    for sub in out.triples.iter().filter(|t| t.predicate == "P:label") {
        assert!(parent_objects.contains(&sub.subject.as_str()));
    }
    // each of the 3 parent objects fans out into 2 label triples
    assert_eq!(out.triples.len(), 3 + 6);
}
