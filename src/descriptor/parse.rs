//! Descriptor loading, validation and compilation.
//!
//! The raw document is deserialized into permissive `Raw*` shapes, then
//! compiled into the immutable tree of [`CompiledNode`]s. Everything that
//! can fail for authoring reasons fails here, once, before any record is
//! evaluated: unknown keys, missing slots, uncompilable regexes,
//! unresolvable mapping references and malformed MARC paths.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::mapping::{self, CompiledMapping, MappingSettings};
use super::{
    CompareOp, CompiledDescriptor, CompiledNode, CondValue, Condition, FieldPath, FieldRef,
    InsertTemplate, Join, ObjectKind, Requirement, Rewrite, Source, SubfieldCode,
};
use crate::error::LoadError;
use crate::record::Scalar;

/// Shape of a MARC field address: three digits, then a subfield code,
/// an indicator or `none`
static MARC_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{3}):([a-zA-Z0-9]|i1|i2|none)$").expect("static regex"));

/// Load and compile a descriptor from a file. Mapping references resolve
/// relative to the file's directory.
pub fn load_descriptor_file(path: &Path) -> Result<CompiledDescriptor, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Value = serde_json::from_str(&text)?;
    load_descriptor(&doc, path.parent())
}

/// Compile an already-parsed descriptor document. `base_dir` anchors
/// `$ref`/`joined_map_ref` resolution; without one, any reference is a
/// load error.
pub fn load_descriptor(doc: &Value, base_dir: Option<&Path>) -> Result<CompiledDescriptor, LoadError> {
    let root = doc.as_object().ok_or_else(|| LoadError::BadValue {
        node: "$root".to_string(),
        detail: "descriptor root must be an object".to_string(),
    })?;

    let mut head_map = serde_json::Map::new();
    let mut raw_nodes: Vec<RawNode> = Vec::new();

    for (key, value) in root {
        if key == "nodes" {
            raw_nodes =
                Vec::<RawNode>::deserialize(value).map_err(|e| LoadError::BadValue {
                    node: "$root".to_string(),
                    detail: format!("`nodes` must be a list of node objects: {e}"),
                })?;
        } else if let Some(slot) = key.strip_prefix("id_") {
            // per-head variants of the node slots, id_field -> field etc.
            head_map.insert(slot.to_string(), value.clone());
        } else if !key.starts_with("comment") {
            return Err(LoadError::UnknownKey {
                node: "$root".to_string(),
                key: key.clone(),
            });
        }
    }

    let raw_head =
        RawNode::deserialize(&Value::Object(head_map)).map_err(LoadError::Parse)?;
    let head = compile_node(raw_head, Position::Head, None, base_dir)?;

    let mut nodes = Vec::with_capacity(raw_nodes.len());
    for raw in raw_nodes {
        nodes.push(compile_node(raw, Position::Body, None, base_dir)?);
    }

    Ok(CompiledDescriptor { head, nodes })
}

/// Where a node sits in the tree; governs which slots are demanded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Head,
    Body,
    Fallback,
    Sub,
}

/// Predicate and requirement a fallback node inherits from its parent
struct Inherited<'a> {
    predicate: &'a str,
    required: Requirement,
}

/// Raw node as authored. Every slot is optional here; validation decides
/// what is demanded where. Unmatched keys land in `extra`.
#[derive(Debug, Default, Deserialize)]
struct RawNode {
    name: Option<String>,
    source: Option<String>,
    field: Option<String>,
    predicate: Option<String>,
    required: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    tag: Option<String>,
    alternatives: Option<Vec<String>>,
    fallback: Option<Box<RawNode>>,
    #[serde(rename = "match")]
    matcher: Option<String>,
    cut: Option<String>,
    replace: Option<String>,
    prepend: Option<String>,
    append: Option<String>,
    insert_into: Option<String>,
    insert_add_fields: Option<Vec<RawFieldRef>>,
    static_field: Option<String>,
    mapping: Option<IndexMap<String, Value>>,
    mapping_settings: Option<IndexMap<String, Value>>,
    joined_field: Option<String>,
    joined_map: Option<IndexMap<String, Value>>,
    joined_map_ref: Option<String>,
    if_field: Option<String>,
    if_condition: Option<String>,
    if_value: Option<Value>,
    if_match: Option<String>,
    if_cut: Option<String>,
    if_replace: Option<String>,
    if_prepend: Option<String>,
    if_append: Option<String>,
    append_uuid_predicate_fields: Option<Vec<String>>,
    append_uuid_object_fields: Option<Vec<String>>,
    sub_nodes: Option<Vec<RawNode>>,
    #[serde(flatten)]
    extra: IndexMap<String, Value>,
}

/// `insert_add_fields` entry: either a bare field name or a reduced node
/// with its own rewrite steps
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFieldRef {
    Name(String),
    Full {
        field: String,
        #[serde(rename = "match")]
        matcher: Option<String>,
        cut: Option<String>,
        replace: Option<String>,
        prepend: Option<String>,
        append: Option<String>,
        #[serde(flatten)]
        extra: IndexMap<String, Value>,
    },
}

fn compile_node(
    raw: RawNode,
    position: Position,
    inherited: Option<Inherited<'_>>,
    base_dir: Option<&Path>,
) -> Result<CompiledNode, LoadError> {
    let label = match (&raw.name, &raw.field, position) {
        (Some(name), _, _) => name.clone(),
        (None, _, Position::Head) => "$head".to_string(),
        (None, Some(field), _) => field.clone(),
        (None, None, _) => "$unnamed".to_string(),
    };

    for key in raw.extra.keys() {
        if !key.starts_with("comment") {
            return Err(LoadError::UnknownKey {
                node: label.clone(),
                key: key.clone(),
            });
        }
    }

    let source_key = if position == Position::Head { "id_source" } else { "source" };
    let field_key = if position == Position::Head { "id_field" } else { "field" };

    let source = raw
        .source
        .as_deref()
        .ok_or(LoadError::MissingKey {
            node: label.clone(),
            key: source_key,
        })
        .and_then(|s| {
            Source::parse(s).ok_or_else(|| LoadError::BadValue {
                node: label.clone(),
                detail: format!("`source` must be \"flat\" or \"marc\", got `{s}`"),
            })
        })?;

    let field = raw
        .field
        .as_deref()
        .ok_or(LoadError::MissingKey {
            node: label.clone(),
            key: field_key,
        })
        .and_then(|s| parse_field_path(&label, source, s))?;

    let predicate = match (&raw.predicate, position) {
        (Some(p), _) => p.clone(),
        // the head emits no real triples, its objects become subjects
        (None, Position::Head) => "$subject".to_string(),
        (None, Position::Fallback) => inherited
            .as_ref()
            .map(|i| i.predicate.to_string())
            .unwrap_or_default(),
        (None, _) => {
            return Err(LoadError::MissingKey {
                node: label,
                key: "predicate",
            })
        }
    };

    let required = match position {
        // an empty head always discards the record
        Position::Head => Requirement::Mandatory,
        // a fallback's own `required` is ignored, the parent's governs
        Position::Fallback => inherited
            .as_ref()
            .map(|i| i.required)
            .unwrap_or(Requirement::Optional),
        _ => raw
            .required
            .as_deref()
            .ok_or(LoadError::MissingKey {
                node: label.clone(),
                key: "required",
            })
            .and_then(|s| {
                Requirement::parse(s).ok_or_else(|| LoadError::BadValue {
                    node: label.clone(),
                    detail: format!("`required` must be \"mandatory\" or \"optional\", got `{s}`"),
                })
            })?,
    };

    let kind = match raw.kind.as_deref() {
        None => ObjectKind::Literal,
        Some(s) => ObjectKind::parse(s).ok_or_else(|| LoadError::BadValue {
            node: label.clone(),
            detail: format!("`type` must be \"literal\" or \"uri\", got `{s}`"),
        })?,
    };
    if kind == ObjectKind::Uri && raw.tag.is_some() {
        return Err(LoadError::BadValue {
            node: label,
            detail: "`tag` only applies to literal objects, not `type` = \"uri\"".to_string(),
        });
    }

    let rewrite = compile_rewrite(
        &label,
        raw.matcher.as_deref(),
        raw.cut.as_deref(),
        raw.replace.clone(),
        raw.prepend.clone(),
        raw.append.clone(),
    )?;

    let mut alternatives = Vec::new();
    for alt in raw.alternatives.as_deref().unwrap_or_default() {
        alternatives.push(parse_field_path(&label, source, alt)?);
    }

    let mapping = compile_node_mapping(&label, &raw, base_dir)?;
    let insert = compile_insert(&label, source, &raw)?;
    let join = compile_join(&label, source, &raw, base_dir)?;
    let condition = compile_condition(&label, source, &raw)?;

    let uuid_predicate_fields = flat_paths(raw.append_uuid_predicate_fields.as_deref());
    let uuid_object_fields = flat_paths(raw.append_uuid_object_fields.as_deref());

    let mut sub_nodes = Vec::new();
    for sub in raw.sub_nodes.unwrap_or_default() {
        sub_nodes.push(compile_node(sub, Position::Sub, None, base_dir)?);
    }

    let fallback = match raw.fallback {
        None => None,
        Some(fb) => Some(Box::new(compile_node(
            *fb,
            Position::Fallback,
            Some(Inherited {
                predicate: &predicate,
                required,
            }),
            base_dir,
        )?)),
    };

    Ok(CompiledNode {
        label,
        source,
        field,
        predicate,
        required,
        kind,
        tag: raw.tag,
        alternatives,
        fallback,
        rewrite,
        mapping,
        insert,
        static_field: raw.static_field,
        join,
        condition,
        uuid_predicate_fields,
        uuid_object_fields,
        sub_nodes,
    })
}

fn compile_regex(node: &str, pattern: &str) -> Result<Regex, LoadError> {
    Regex::new(pattern).map_err(|source| LoadError::BadRegex {
        node: node.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_rewrite(
    node: &str,
    matcher: Option<&str>,
    cut: Option<&str>,
    replace: Option<String>,
    prepend: Option<String>,
    append: Option<String>,
) -> Result<Rewrite, LoadError> {
    Ok(Rewrite {
        matcher: matcher.map(|p| compile_regex(node, p)).transpose()?,
        cut: cut.map(|p| compile_regex(node, p)).transpose()?,
        replace: replace.unwrap_or_default(),
        prepend: prepend.unwrap_or_default(),
        append: append.unwrap_or_default(),
    })
}

fn parse_field_path(node: &str, source: Source, path: &str) -> Result<FieldPath, LoadError> {
    match source {
        Source::Flat => Ok(FieldPath::Flat(path.to_string())),
        Source::Marc => {
            let caps = MARC_PATH
                .captures(path)
                .ok_or_else(|| LoadError::BadMarcPath {
                    node: node.to_string(),
                    path: path.to_string(),
                })?;
            let code = match &caps[2] {
                "i1" => SubfieldCode::Ind1,
                "i2" => SubfieldCode::Ind2,
                "none" => SubfieldCode::NoCode,
                code => SubfieldCode::Code(code.chars().next().expect("single char by regex")),
            };
            Ok(FieldPath::Marc {
                tag: caps[1].to_string(),
                code,
            })
        }
    }
}

/// UUID derivation fields are plain flat-view keys
fn flat_paths(names: Option<&[String]>) -> Vec<FieldPath> {
    names
        .unwrap_or_default()
        .iter()
        .map(|n| FieldPath::Flat(n.clone()))
        .collect()
}

/// Render scalar-valued map entries to strings, rejecting containers
fn string_entries(
    node: &str,
    what: &str,
    raw: &IndexMap<String, Value>,
) -> Result<IndexMap<String, String>, LoadError> {
    let mut out = IndexMap::with_capacity(raw.len());
    for (key, value) in raw {
        let scalar = Scalar::from_value(value).ok_or_else(|| LoadError::BadValue {
            node: node.to_string(),
            detail: format!("`{what}` value for key `{key}` must be a scalar"),
        })?;
        out.insert(key.clone(), scalar.render());
    }
    Ok(out)
}

fn parse_mapping_settings(
    node: &str,
    raw: Option<&IndexMap<String, Value>>,
) -> Result<MappingSettings, LoadError> {
    let mut settings = MappingSettings::default();
    let Some(raw) = raw else {
        return Ok(settings);
    };

    for (key, value) in raw {
        match key.as_str() {
            "$default" => {
                settings.default =
                    Some(
                        Scalar::from_value(value)
                            .ok_or_else(|| LoadError::BadValue {
                                node: node.to_string(),
                                detail: "`$default` must be a scalar".to_string(),
                            })?
                            .render(),
                    )
            }
            "$inherit" => settings.inherit = settings_bool(node, key, value)?,
            "$casesens" => settings.casesens = Some(settings_bool(node, key, value)?),
            "$regex" => settings.regex = settings_bool(node, key, value)?,
            "$ref" => {
                settings.ref_path = Some(
                    value
                        .as_str()
                        .ok_or_else(|| LoadError::BadValue {
                            node: node.to_string(),
                            detail: "`$ref` must be a relative file path".to_string(),
                        })?
                        .to_string(),
                )
            }
            other if other.starts_with('$') => {
                warn!(node, key = other, "ignoring unknown mapping setting");
            }
            other => {
                return Err(LoadError::BadValue {
                    node: node.to_string(),
                    detail: format!("`mapping_settings` key `{other}` is not recognized"),
                })
            }
        }
    }
    Ok(settings)
}

fn settings_bool(node: &str, key: &str, value: &Value) -> Result<bool, LoadError> {
    value.as_bool().ok_or_else(|| LoadError::BadValue {
        node: node.to_string(),
        detail: format!("`{key}` must be a boolean"),
    })
}

/// Resolve a mapping reference relative to the descriptor's directory
fn resolve_ref_entries(
    node: &str,
    ref_path: &str,
    base_dir: Option<&Path>,
) -> Result<IndexMap<String, String>, LoadError> {
    let Some(base) = base_dir else {
        return Err(LoadError::RefUnresolved {
            path: PathBuf::from(ref_path),
            detail: format!("node `{node}` references a file but the descriptor has no directory"),
        });
    };
    mapping::resolve_ref(&base.join(ref_path))
}

fn compile_node_mapping(
    label: &str,
    raw: &RawNode,
    base_dir: Option<&Path>,
) -> Result<Option<CompiledMapping>, LoadError> {
    let settings = parse_mapping_settings(label, raw.mapping_settings.as_ref())?;
    if raw.mapping.is_none() && settings.ref_path.is_none() {
        return Ok(None);
    }

    // referenced entries first, local entries win on collision
    let mut entries = match &settings.ref_path {
        Some(ref_path) => resolve_ref_entries(label, ref_path, base_dir)?,
        None => IndexMap::new(),
    };
    if let Some(local) = &raw.mapping {
        for (key, value) in string_entries(label, "mapping", local)? {
            entries.insert(key, value);
        }
    }

    CompiledMapping::compile(label, entries, &settings).map(Some)
}

fn compile_insert(
    label: &str,
    source: Source,
    raw: &RawNode,
) -> Result<Option<InsertTemplate>, LoadError> {
    let Some(template) = &raw.insert_into else {
        if raw.insert_add_fields.is_some() {
            return Err(LoadError::BadValue {
                node: label.to_string(),
                detail: "`insert_add_fields` requires `insert_into`".to_string(),
            });
        }
        return Ok(None);
    };

    let mut add_fields = Vec::new();
    for entry in raw.insert_add_fields.as_deref().unwrap_or_default() {
        add_fields.push(compile_field_ref(label, source, entry)?);
    }

    let parts: Vec<String> = template.split("{}").map(str::to_string).collect();
    let placeholders = parts.len() - 1;
    let enabled = placeholders == 1 + add_fields.len();
    if !enabled {
        warn!(
            node = label,
            placeholders,
            add_fields = add_fields.len(),
            "`insert_into` placeholder count does not match, template disabled"
        );
    }

    Ok(Some(InsertTemplate {
        parts,
        add_fields,
        enabled,
    }))
}

fn compile_field_ref(
    node: &str,
    source: Source,
    raw: &RawFieldRef,
) -> Result<FieldRef, LoadError> {
    match raw {
        RawFieldRef::Name(name) => Ok(FieldRef {
            field: parse_field_path(node, source, name)?,
            rewrite: Rewrite::default(),
        }),
        RawFieldRef::Full {
            field,
            matcher,
            cut,
            replace,
            prepend,
            append,
            extra,
        } => {
            for key in extra.keys() {
                if !key.starts_with("comment") {
                    return Err(LoadError::UnknownKey {
                        node: node.to_string(),
                        key: key.clone(),
                    });
                }
            }
            Ok(FieldRef {
                field: parse_field_path(node, source, field)?,
                rewrite: compile_rewrite(
                    node,
                    matcher.as_deref(),
                    cut.as_deref(),
                    replace.clone(),
                    prepend.clone(),
                    append.clone(),
                )?,
            })
        }
    }
}

fn compile_join(
    label: &str,
    source: Source,
    raw: &RawNode,
    base_dir: Option<&Path>,
) -> Result<Option<Join>, LoadError> {
    let Some(joined_field) = &raw.joined_field else {
        if raw.joined_map.is_some() || raw.joined_map_ref.is_some() {
            return Err(LoadError::BadValue {
                node: label.to_string(),
                detail: "`joined_map` requires `joined_field`".to_string(),
            });
        }
        return Ok(None);
    };
    if raw.joined_map.is_none() && raw.joined_map_ref.is_none() {
        return Err(LoadError::BadValue {
            node: label.to_string(),
            detail: "`joined_field` requires `joined_map` or `joined_map_ref`".to_string(),
        });
    }

    let mut entries = match &raw.joined_map_ref {
        Some(ref_path) => resolve_ref_entries(label, ref_path, base_dir)?,
        None => IndexMap::new(),
    };
    if let Some(local) = &raw.joined_map {
        for (key, value) in string_entries(label, "joined_map", local)? {
            entries.insert(key, value);
        }
    }

    Ok(Some(Join {
        field: parse_field_path(label, source, joined_field)?,
        map: entries.into_iter().collect(),
    }))
}

fn compile_condition(
    label: &str,
    source: Source,
    raw: &RawNode,
) -> Result<Option<Condition>, LoadError> {
    let Some(if_field) = &raw.if_field else {
        let stray = raw.if_condition.is_some()
            || raw.if_value.is_some()
            || raw.if_match.is_some()
            || raw.if_cut.is_some()
            || raw.if_replace.is_some()
            || raw.if_prepend.is_some()
            || raw.if_append.is_some();
        if stray {
            return Err(LoadError::BadValue {
                node: label.to_string(),
                detail: "`if_*` keys require `if_field`".to_string(),
            });
        }
        return Ok(None);
    };

    let lexeme = raw.if_condition.as_deref().ok_or(LoadError::MissingKey {
        node: label.to_string(),
        key: "if_condition",
    })?;
    let op = CompareOp::parse(lexeme).ok_or_else(|| LoadError::BadCondition {
        node: label.to_string(),
        lexeme: lexeme.to_string(),
    })?;

    let value = match (&raw.if_value, op) {
        (None, CompareOp::Exists) => CondValue::None,
        (Some(_), CompareOp::Exists) => {
            return Err(LoadError::BadValue {
                node: label.to_string(),
                detail: "`exi` does not take an `if_value`".to_string(),
            })
        }
        (None, _) => {
            return Err(LoadError::MissingKey {
                node: label.to_string(),
                key: "if_value",
            })
        }
        (Some(Value::Array(items)), _) => {
            if !matches!(op, CompareOp::Eq | CompareOp::Neq) {
                return Err(LoadError::BadValue {
                    node: label.to_string(),
                    detail: format!("a list `if_value` only supports `==` and `!=`, got `{lexeme}`"),
                });
            }
            let mut scalars = Vec::with_capacity(items.len());
            for item in items {
                scalars.push(Scalar::from_value(item).ok_or_else(|| LoadError::BadValue {
                    node: label.to_string(),
                    detail: "`if_value` list entries must be scalars".to_string(),
                })?);
            }
            CondValue::Many(scalars)
        }
        (Some(value), _) => CondValue::One(Scalar::from_value(value).ok_or_else(|| {
            LoadError::BadValue {
                node: label.to_string(),
                detail: "`if_value` must be a scalar or a list of scalars".to_string(),
            }
        })?),
    };

    Ok(Some(Condition {
        field: parse_field_path(label, source, if_field)?,
        op,
        value,
        rewrite: compile_rewrite(
            label,
            raw.if_match.as_deref(),
            raw.if_cut.as_deref(),
            raw.if_replace.clone(),
            raw.if_prepend.clone(),
            raw.if_append.clone(),
        )?,
    }))
}
