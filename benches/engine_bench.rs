use std::time::Instant;

use serde_json::{json, Value};
use spcht_rs::Spcht;

fn benchmark_operation<F>(name: &str, iterations: usize, mut op: F)
where
    F: FnMut(),
{
    let start = Instant::now();
    for _ in 0..iterations {
        op();
    }
    let duration = start.elapsed();
    let avg_micros = duration.as_micros() as f64 / iterations as f64;
    println!(
        "{:<40} {:>10} iterations in {:>8.2}ms (avg: {:>8.2}µs)",
        name,
        iterations,
        duration.as_secs_f64() * 1000.0,
        avg_micros
    );
}

fn descriptor() -> Value {
    json!({
        "id_source": "flat",
        "id_field": "id",
        "nodes": [
            {
                "source": "flat",
                "field": "title",
                "predicate": "P:title",
                "required": "mandatory"
            },
            {
                "source": "flat",
                "field": "ctrlnum",
                "predicate": "P:ctrl",
                "required": "optional",
                "cut": "^\\([^)]*\\)",
                "replace": ""
            },
            {
                "source": "flat",
                "field": "role",
                "predicate": "P:role",
                "required": "optional",
                "mapping": {"aut": "U:aut", "edt": "U:edt"},
                "mapping_settings": {"$default": "U:unknown"}
            },
            {
                "source": "marc",
                "field": "264:b",
                "predicate": "P:publisher",
                "required": "optional"
            }
        ]
    })
}

fn record() -> Value {
    json!({
        "id": "0-657059196",
        "title": "Faust",
        "ctrlnum": ["(DE-627)657059196", "(DE-576)9657059194", "(DE-599)GBV657059196"],
        "role": ["aut", "xyz"],
        "fullrecord": {
            "001": {"none": "0-657059196"},
            "264": [{"b": "Reclam"}, {"b": "Insel"}]
        }
    })
}

fn main() {
    let doc = descriptor();
    let data = record();

    benchmark_operation("descriptor compile", 1_000, || {
        let _ = Spcht::from_value(&doc, None).unwrap();
    });

    let engine = Spcht::from_value(&doc, None).unwrap();
    benchmark_operation("process single record", 10_000, || {
        let _ = engine.process_data(&data, "https://data.example/").unwrap();
    });

    let batch: Vec<Value> = (0..100).map(|_| data.clone()).collect();
    benchmark_operation("process batch of 100", 100, || {
        let _ = engine.process_batch(&batch, "https://data.example/");
    });
}
