//! Spcht descriptor engine - declarative record-to-RDF transformation
//!
//! This library evaluates a declarative descriptor document against flat
//! (and MARC21-shaped) records and emits RDF triples:
//! - Descriptors are loaded, validated and regex-compiled once; the
//!   compiled form is immutable and shareable across threads
//! - Evaluation is a pure function of (descriptor, record): no I/O, no
//!   caches, no mutation of the input record
//! - Mapping reference files are resolved and inlined at load time
//! - Per-record outcomes carry the emitted triples and any authoring
//!   warnings; mandatory nodes without a value discard the whole record

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod record;
pub mod triple;

use std::path::Path;

use serde_json::Value;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use descriptor::{CompiledDescriptor, CompiledNode};
pub use engine::Evaluated;
pub use error::{EvalError, EvaluationWarning, LoadError};
pub use record::{Record, Scalar};
pub use triple::{Triple, TripleObject};

/// A compiled descriptor plus engine configuration, ready to turn records
/// into triples
#[derive(Debug)]
pub struct Spcht {
    descriptor: CompiledDescriptor,
    config: EngineConfig,
}

impl Spcht {
    /// Load a descriptor from a JSON file. `$ref` and `joined_map_ref`
    /// entries resolve relative to the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let descriptor = descriptor::parse::load_descriptor_file(path.as_ref())?;
        Ok(Self {
            descriptor,
            config: EngineConfig::default(),
        })
    }

    /// Compile an already-parsed descriptor document. Without a `base_dir`
    /// any mapping reference is a load error.
    pub fn from_value(doc: &Value, base_dir: Option<&Path>) -> Result<Self, LoadError> {
        let descriptor = descriptor::parse::load_descriptor(doc, base_dir)?;
        Ok(Self {
            descriptor,
            config: EngineConfig::default(),
        })
    }

    /// Compile a descriptor from JSON text (no reference resolution)
    pub fn from_json_str(text: &str) -> Result<Self, LoadError> {
        let doc: Value = serde_json::from_str(text)?;
        Self::from_value(&doc, None)
    }

    /// Swap in a non-default configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Evaluate one record. The subject derived by the head node is
    /// prefixed with `subject_prefix` before any triple is emitted.
    pub fn process_data(&self, data: &Value, subject_prefix: &str) -> Result<Evaluated, EvalError> {
        engine::process(&self.descriptor, &self.config, data, subject_prefix)
    }

    /// Evaluate a batch of records, one result per record. With the
    /// `parallel` feature the batch is processed on the rayon pool.
    #[cfg(not(feature = "parallel"))]
    pub fn process_batch(
        &self,
        records: &[Value],
        subject_prefix: &str,
    ) -> Vec<Result<Evaluated, EvalError>> {
        records
            .iter()
            .map(|record| self.process_data(record, subject_prefix))
            .collect()
    }

    /// Evaluate a batch of records, one result per record. With the
    /// `parallel` feature the batch is processed on the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn process_batch(
        &self,
        records: &[Value],
        subject_prefix: &str,
    ) -> Vec<Result<Evaluated, EvalError>> {
        use rayon::prelude::*;
        records
            .par_iter()
            .map(|record| self.process_data(record, subject_prefix))
            .collect()
    }

    /// The compiled, immutable descriptor
    pub fn descriptor(&self) -> &CompiledDescriptor {
        &self.descriptor
    }

    /// The active engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Every field path the descriptor can touch; callers use this to
    /// request only the needed columns from their index
    pub fn referenced_fields(&self) -> Vec<String> {
        self.descriptor.referenced_fields()
    }

    /// Total node count including head, fallbacks and sub-nodes
    pub fn node_count(&self) -> usize {
        self.descriptor.node_count()
    }
}
