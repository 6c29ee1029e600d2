//! Emitted triple model.
//!
//! The engine emits plain `(subject, predicate, object)` triples. Objects
//! are either IRIs (unvalidated here) or literals with an optional
//! datatype or language tag. Serialization is a consumer concern.

use std::fmt;

use serde::Serialize;

/// Object position of a triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TripleObject {
    /// An IRI reference
    Uri { value: String },
    /// A literal with an optional datatype/language tag
    Literal {
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
    },
}

impl TripleObject {
    pub fn uri(value: impl Into<String>) -> Self {
        TripleObject::Uri {
            value: value.into(),
        }
    }

    pub fn literal(value: impl Into<String>, tag: Option<String>) -> Self {
        TripleObject::Literal {
            value: value.into(),
            tag,
        }
    }

    /// The lexical value, regardless of object kind. Sub-nodes use this as
    /// their subject.
    #[inline]
    pub fn lexical(&self) -> &str {
        match self {
            TripleObject::Uri { value } => value,
            TripleObject::Literal { value, .. } => value,
        }
    }

    #[inline]
    pub fn is_uri(&self) -> bool {
        matches!(self, TripleObject::Uri { .. })
    }
}

/// One emitted (subject, predicate, object) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: TripleObject,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: TripleObject,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

impl fmt::Display for Triple {
    /// Debug-friendly rendering, loosely N-Triples shaped
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            TripleObject::Uri { value } => {
                write!(f, "<{}> <{}> <{}>", self.subject, self.predicate, value)
            }
            TripleObject::Literal { value, tag: None } => {
                write!(f, "<{}> <{}> \"{}\"", self.subject, self.predicate, value)
            }
            TripleObject::Literal {
                value,
                tag: Some(tag),
            } => write!(
                f,
                "<{}> <{}> \"{}\"^^{}",
                self.subject, self.predicate, value, tag
            ),
        }
    }
}
