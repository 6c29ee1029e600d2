//! Evaluation against the MARC view of a record

mod common;

use common::objects;
use serde_json::json;
use spcht_rs::{EngineConfig, EvalError, Spcht};

fn marc_descriptor() -> Spcht {
    Spcht::from_value(
        &json!({
            "id_source": "marc",
            "id_field": "001:none",
            "nodes": [
                {
                    "source": "marc",
                    "field": "100:a",
                    "predicate": "P:creator",
                    "required": "optional"
                },
                {
                    "source": "marc",
                    "field": "264:b",
                    "predicate": "P:publisher",
                    "required": "optional"
                },
                {
                    "source": "marc",
                    "field": "100:i1",
                    "predicate": "P:name-kind",
                    "required": "optional"
                }
            ]
        }),
        None,
    )
    .expect("descriptor compiles")
}

fn marc_record() -> serde_json::Value {
    json!({
        "title": "Faust",
        "fullrecord": {
            "001": {"none": "0-657059196"},
            "100": {"a": "Goethe, Johann Wolfgang von", "i1": "1"},
            "264": [
                {"a": "Leipzig", "b": "Reclam"},
                {"a": "Stuttgart", "b": "Insel"}
            ]
        }
    })
}

#[test]
fn subject_and_fields_come_from_the_marc_view() {
    let out = marc_descriptor()
        .process_data(&marc_record(), "https://data.example/")
        .unwrap();

    assert_eq!(out.subject, "https://data.example/0-657059196");
    assert_eq!(
        objects(&out),
        vec!["Goethe, Johann Wolfgang von", "Reclam", "Insel", "1"]
    );
}

#[test]
fn records_without_the_marc_view_discard_on_a_marc_head() {
    let out = marc_descriptor().process_data(&json!({"title": "Faust"}), "");
    assert_eq!(out.unwrap_err(), EvalError::SubjectMissing);
}

#[test]
fn the_marc_key_is_configurable() {
    let engine = marc_descriptor().with_config(EngineConfig::new().with_marc_key("marc"));
    let mut record = marc_record();
    let view = record
        .as_object_mut()
        .unwrap()
        .remove("fullrecord")
        .unwrap();
    record["marc"] = view;

    let out = engine.process_data(&record, "").unwrap();
    assert_eq!(out.subject, "0-657059196");
    assert_eq!(out.triples.len(), 4);
}

#[test]
fn marc_and_flat_nodes_mix_in_one_descriptor() {
    let engine = Spcht::from_value(
        &json!({
            "id_source": "flat",
            "id_field": "title",
            "nodes": [
                {
                    "source": "flat",
                    "field": "title",
                    "predicate": "P:title",
                    "required": "mandatory"
                },
                {
                    "source": "marc",
                    "field": "100:a",
                    "predicate": "P:creator",
                    "required": "optional",
                    "cut": ",.*$",
                    "replace": ""
                }
            ]
        }),
        None,
    )
    .unwrap();

    let out = engine.process_data(&marc_record(), "").unwrap();
    assert_eq!(objects(&out), vec!["Faust", "Goethe"]);
}
