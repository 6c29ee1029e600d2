//! Error taxonomy for descriptor loading and record evaluation.
//!
//! Loading problems are fatal and abort the load. Evaluation problems are
//! per record: a discard carries the offending node, warnings ride along
//! with the emitted triples.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Fatal problems detected while loading and compiling a descriptor.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Descriptor or mapping file could not be read from disk
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Document is not parsable JSON
    #[error("failed to parse descriptor: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required key is absent from a node
    #[error("node `{node}` is missing required key `{key}`")]
    MissingKey { node: String, key: &'static str },

    /// A key outside the recognized set (and not `comment`-prefixed)
    #[error("node `{node}` has unknown key `{key}`")]
    UnknownKey { node: String, key: String },

    /// A recognized key holds a value of the wrong shape or range
    #[error("node `{node}`: {detail}")]
    BadValue { node: String, detail: String },

    /// A `match`, `cut`, `if_*` or `$regex` mapping pattern does not compile
    #[error("node `{node}`: regex `{pattern}` does not compile: {source}")]
    BadRegex {
        node: String,
        pattern: String,
        source: regex::Error,
    },

    /// A MARC field path is not of the `FFF:SS` form
    #[error("node `{node}`: malformed MARC path `{path}`, expected \"FFF:SS\"")]
    BadMarcPath { node: String, path: String },

    /// `if_condition` is not a recognized lexeme
    #[error("node `{node}`: unknown condition `{lexeme}`")]
    BadCondition { node: String, lexeme: String },

    /// A `$ref` or `joined_map_ref` file is missing or unreadable
    #[error("mapping reference {path:?} could not be resolved: {detail}")]
    RefUnresolved { path: PathBuf, detail: String },

    /// A referenced mapping file is not a single flat string mapping
    #[error("mapping reference {path:?} is not a flat key/value mapping")]
    RefShape { path: PathBuf },
}

/// Per-record evaluation failures.
///
/// A discarded record contributes zero triples; the caller decides whether
/// to skip, retry or abort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A mandatory node yielded no value through any of its paths
    #[error("record discarded: mandatory node `{node}` produced no value")]
    RecordDiscarded { node: String },

    /// The head node could not derive a subject identifier
    #[error("record discarded: no subject id could be derived")]
    SubjectMissing,

    /// The head node derived more than one subject identifier
    #[error("subject derivation yielded {count} values, expected exactly one")]
    SubjectAmbiguous { count: usize },

    /// The record root is not a JSON object
    #[error("record root must be a JSON object")]
    MalformedRecord,
}

/// Non-fatal authoring issue observed while evaluating one record.
///
/// The offending sub-expression contributes nothing; the rest of the
/// record is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationWarning {
    /// Label of the node the warning originated from
    pub node: String,
    /// Human-readable description of what was skipped and why
    pub detail: String,
}

impl EvaluationWarning {
    pub(crate) fn new(node: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            detail: detail.into(),
        }
    }
}
