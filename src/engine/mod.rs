//! The evaluation engine: a pure function of (compiled descriptor, record).
//!
//! The engine holds no state between records; a compiled descriptor is
//! immutable and safe to share across threads. Evaluation performs no I/O
//! and never mutates the input record.

pub(crate) mod accessor;
pub(crate) mod condition;
pub(crate) mod evaluator;
pub(crate) mod transform;


use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::descriptor::CompiledDescriptor;
use crate::error::{EvalError, EvaluationWarning};
use crate::record::Record;
use crate::triple::Triple;

/// Everything one record evaluated to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluated {
    /// The prefixed subject all body triples were emitted under
    pub subject: String,
    /// Emitted triples in node, then value order
    pub triples: Vec<Triple>,
    /// Non-fatal authoring issues observed on the way
    pub warnings: Vec<EvaluationWarning>,
}

/// Collects evaluation warnings and forwards them to `tracing`
pub(crate) struct WarningSink {
    items: Vec<EvaluationWarning>,
    log: bool,
}

impl WarningSink {
    pub(crate) fn new(log: bool) -> Self {
        Self {
            items: Vec::new(),
            log,
        }
    }

    pub(crate) fn push(&mut self, node: &str, detail: impl Into<String>) {
        let warning = EvaluationWarning::new(node, detail);
        if self.log {
            warn!(node = %warning.node, detail = %warning.detail, "evaluation warning");
        }
        self.items.push(warning);
    }

    pub(crate) fn into_items(self) -> Vec<EvaluationWarning> {
        self.items
    }
}

/// Evaluate one record: derive the subject through the head node, then
/// run every body node in order. A mandatory discard drops the whole
/// record, emitting nothing.
pub(crate) fn process(
    descriptor: &CompiledDescriptor,
    config: &EngineConfig,
    data: &Value,
    subject_prefix: &str,
) -> Result<Evaluated, EvalError> {
    let record = Record::new(data, &config.marc_key)?;
    let mut sink = WarningSink::new(config.log_warnings);

    let raw_subject = evaluator::derive_subject(&descriptor.head, &record, &mut sink)?;
    let subject = format!("{subject_prefix}{raw_subject}");

    let mut triples = Vec::new();
    for node in &descriptor.nodes {
        match evaluator::evaluate_node(node, &subject, &record, &mut sink) {
            Ok(emitted) => triples.extend(emitted),
            Err(error) => {
                debug!(%error, "record discarded");
                return Err(error);
            }
        }
    }

    Ok(Evaluated {
        subject,
        triples,
        warnings: sink.into_items(),
    })
}
