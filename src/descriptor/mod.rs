//! Compiled descriptor model.
//!
//! A descriptor is loaded once, validated, regex-compiled and reference
//! mappings inlined; the result is an immutable owned node tree that is
//! safe to share across threads. Parsing lives in [`parse`], mapping
//! compilation in [`mapping`].

pub mod mapping;
pub mod parse;

use std::fmt;

use indexmap::IndexSet;
use regex::Regex;

use crate::record::Scalar;

pub use mapping::CompiledMapping;

/// Which view of the record a node reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Flat,
    Marc,
}

impl Source {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "flat" => Some(Source::Flat),
            "marc" => Some(Source::Marc),
            _ => None,
        }
    }
}

/// Whether an empty node discards the whole record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Mandatory,
    Optional,
}

impl Requirement {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "mandatory" => Some(Requirement::Mandatory),
            "optional" => Some(Requirement::Optional),
            _ => None,
        }
    }
}

/// Object kind of the emitted triples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Literal,
    Uri,
}

impl ObjectKind {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "literal" => Some(ObjectKind::Literal),
            "uri" => Some(ObjectKind::Uri),
            _ => None,
        }
    }
}

/// Subfield address within one MARC field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubfieldCode {
    /// A single-character subfield code such as `a` or `0`
    Code(char),
    /// Indicator 1
    Ind1,
    /// Indicator 2
    Ind2,
    /// The field value when there is no subfield structure
    NoCode,
}

impl SubfieldCode {
    /// The record key this address reads, `"i1"`, `"i2"`, `"none"` or the code itself
    pub fn as_key(&self) -> String {
        match self {
            SubfieldCode::Code(c) => c.to_string(),
            SubfieldCode::Ind1 => "i1".to_string(),
            SubfieldCode::Ind2 => "i2".to_string(),
            SubfieldCode::NoCode => "none".to_string(),
        }
    }
}

/// Compiled field path, already bound to its source view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    /// A key of the flat view
    Flat(String),
    /// A `"FFF:SS"` address into the MARC view
    Marc { tag: String, code: SubfieldCode },
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Flat(key) => f.write_str(key),
            FieldPath::Marc { tag, code } => write!(f, "{tag}:{}", code.as_key()),
        }
    }
}

/// Per-value rewrite steps shared by nodes, field refs and `if_*` guards.
///
/// `matcher` filters, `cut` substitutes all occurrences with `replace`,
/// the affixes wrap the result. Applied in exactly that order.
#[derive(Debug, Clone, Default)]
pub struct Rewrite {
    pub matcher: Option<Regex>,
    pub cut: Option<Regex>,
    pub replace: String,
    pub prepend: String,
    pub append: String,
}

impl Rewrite {
    /// True when no step is configured
    pub fn is_empty(&self) -> bool {
        self.matcher.is_none()
            && self.cut.is_none()
            && self.prepend.is_empty()
            && self.append.is_empty()
    }
}

/// A reduced node used inside `insert_add_fields`: an extraction path plus
/// its own rewrite steps
#[derive(Debug, Clone)]
pub struct FieldRef {
    pub field: FieldPath,
    pub rewrite: Rewrite,
}

/// Compiled `insert_into` template
#[derive(Debug, Clone)]
pub struct InsertTemplate {
    /// Template text split at its `{}` placeholders
    pub parts: Vec<String>,
    /// Additional slots, resolved per evaluation
    pub add_fields: Vec<FieldRef>,
    /// False when the placeholder count did not match at load time;
    /// a disabled template yields nothing
    pub enabled: bool,
}

impl InsertTemplate {
    /// Number of `{}` placeholders in the template
    pub fn arity(&self) -> usize {
        self.parts.len() - 1
    }
}

/// Comparison operator of an `if_*` guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Exists,
}

impl CompareOp {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Neq),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "exi" => Some(CompareOp::Exists),
            _ => None,
        }
    }

    /// Truth value against a field that yielded nothing. Absence counts as
    /// infinitely negative, so the "smaller than" family holds.
    pub fn holds_for_absent(&self) -> bool {
        matches!(self, CompareOp::Neq | CompareOp::Lt | CompareOp::Le)
    }
}

/// Comparison value of an `if_*` guard
#[derive(Debug, Clone, PartialEq)]
pub enum CondValue {
    /// No value, only legal for `exi`
    None,
    One(Scalar),
    Many(Vec<Scalar>),
}

/// Compiled conditional guard
#[derive(Debug, Clone)]
pub struct Condition {
    pub field: FieldPath,
    pub op: CompareOp,
    pub value: CondValue,
    pub rewrite: Rewrite,
}

/// Compiled `joined_field` + `joined_map` pair
#[derive(Debug, Clone)]
pub struct Join {
    /// Field paired positionally with the main field
    pub field: FieldPath,
    /// Paired value -> predicate; a miss inherits the node's base predicate
    pub map: ahash::AHashMap<String, String>,
}

/// One compiled node of the descriptor.
///
/// Fallback and sub-node trees are owned; nodes are immutable after
/// compilation and no cycles are expressible.
#[derive(Debug, Clone)]
pub struct CompiledNode {
    /// Authoring label used in warnings and discard reasons
    pub label: String,
    pub source: Source,
    pub field: FieldPath,
    pub predicate: String,
    pub required: Requirement,
    pub kind: ObjectKind,
    /// Datatype or language tag for literal objects
    pub tag: Option<String>,
    /// Alternative extraction paths, tried in order when the main field is
    /// empty; the node's own rewrite steps apply to whichever path won
    pub alternatives: Vec<FieldPath>,
    /// Full replacement node tried when every path yielded nothing
    pub fallback: Option<Box<CompiledNode>>,
    pub rewrite: Rewrite,
    pub mapping: Option<CompiledMapping>,
    pub insert: Option<InsertTemplate>,
    /// Constant that replaces every surviving value
    pub static_field: Option<String>,
    pub join: Option<Join>,
    pub condition: Option<Condition>,
    /// Fields whose concatenated values derive a v5 UUID appended to the predicate
    pub uuid_predicate_fields: Vec<FieldPath>,
    /// Fields whose concatenated values derive a v5 UUID appended to each object
    pub uuid_object_fields: Vec<FieldPath>,
    /// Nodes evaluated once per emitted object, with that object as subject
    pub sub_nodes: Vec<CompiledNode>,
}

impl CompiledNode {
    fn collect_fields<'a>(&'a self, out: &mut IndexSet<String>) {
        out.insert(self.field.to_string());
        for alt in &self.alternatives {
            out.insert(alt.to_string());
        }
        if let Some(join) = &self.join {
            out.insert(join.field.to_string());
        }
        if let Some(cond) = &self.condition {
            out.insert(cond.field.to_string());
        }
        if let Some(insert) = &self.insert {
            for add in &insert.add_fields {
                out.insert(add.field.to_string());
            }
        }
        for path in self
            .uuid_predicate_fields
            .iter()
            .chain(&self.uuid_object_fields)
        {
            out.insert(path.to_string());
        }
        if let Some(fallback) = &self.fallback {
            fallback.collect_fields(out);
        }
        for sub in &self.sub_nodes {
            sub.collect_fields(out);
        }
    }

    fn count(&self) -> usize {
        1 + self.fallback.as_deref().map_or(0, CompiledNode::count)
            + self.sub_nodes.iter().map(CompiledNode::count).sum::<usize>()
    }
}

/// Fully compiled, immutable descriptor
#[derive(Debug, Clone)]
pub struct CompiledDescriptor {
    /// The node deriving the record subject; constrained to one value
    pub head: CompiledNode,
    /// Body nodes, evaluated in authoring order
    pub nodes: Vec<CompiledNode>,
}

impl CompiledDescriptor {
    /// Every field path this descriptor can touch, in first-use order.
    /// Callers use this to request only the needed columns from their index.
    pub fn referenced_fields(&self) -> Vec<String> {
        let mut out = IndexSet::new();
        self.head.collect_fields(&mut out);
        for node in &self.nodes {
            node.collect_fields(&mut out);
        }
        out.into_iter().collect()
    }

    /// Total node count including head, fallbacks and sub-nodes
    pub fn node_count(&self) -> usize {
        self.head.count() + self.nodes.iter().map(CompiledNode::count).sum::<usize>()
    }
}
