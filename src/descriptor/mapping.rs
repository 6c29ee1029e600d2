//! Value mappings: inline tables, their settings and referenced mapping files.
//!
//! A mapping rewrites extracted values before the cut/replace step. Its
//! behavior is tuned by `mapping_settings` and it may pull entries from a
//! referenced file, inlined once at load with local entries winning.

use std::fs;
use std::path::Path;

use ahash::AHashMap;
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::error::LoadError;
use crate::record::Scalar;

/// Parsed `mapping_settings` with their authoring defaults
#[derive(Debug, Clone, Default)]
pub(crate) struct MappingSettings {
    pub default: Option<String>,
    pub inherit: bool,
    pub regex: bool,
    /// `$casesens` defaults to true
    pub casesens: Option<bool>,
    pub ref_path: Option<String>,
}

impl MappingSettings {
    pub(crate) fn case_sensitive(&self) -> bool {
        self.casesens.unwrap_or(true)
    }
}

/// Compiled key -> value mapping with its lookup behavior
#[derive(Debug, Clone)]
pub struct CompiledMapping {
    /// Exact-match table; keys are case-folded when `$casesens` is false
    exact: AHashMap<String, String>,
    /// Pattern table in authoring order, used under `$regex`
    patterns: Vec<(Regex, String)>,
    /// `$default`: emitted once when no value of an evaluation matched
    pub default: Option<String>,
    /// `$inherit`: misses pass through unchanged (shadowed by `$default`)
    pub inherit: bool,
    casesens: bool,
}

impl CompiledMapping {
    /// Compile merged mapping entries under the given settings. Regex keys
    /// must compile; that failure is fatal at load time.
    pub(crate) fn compile(
        node: &str,
        entries: IndexMap<String, String>,
        settings: &MappingSettings,
    ) -> Result<Self, LoadError> {
        let casesens = settings.case_sensitive();
        let mut exact = AHashMap::with_capacity(entries.len());
        let mut patterns = Vec::new();

        if settings.regex {
            for (pattern, target) in entries {
                let compiled = RegexBuilder::new(&pattern)
                    .case_insensitive(!casesens)
                    .build()
                    .map_err(|source| LoadError::BadRegex {
                        node: node.to_string(),
                        pattern: pattern.clone(),
                        source,
                    })?;
                patterns.push((compiled, target));
            }
        } else {
            for (key, target) in entries {
                let key = if casesens { key } else { key.to_lowercase() };
                exact.insert(key, target);
            }
        }

        Ok(Self {
            exact,
            patterns,
            default: settings.default.clone(),
            inherit: settings.inherit,
            casesens,
        })
    }

    /// Look one value up; `None` is a miss
    pub fn lookup(&self, value: &str) -> Option<&str> {
        if !self.patterns.is_empty() {
            return self
                .patterns
                .iter()
                .find(|(pattern, _)| pattern.is_match(value))
                .map(|(_, target)| target.as_str());
        }
        if self.casesens {
            self.exact.get(value).map(String::as_str)
        } else {
            self.exact.get(&value.to_lowercase()).map(String::as_str)
        }
    }

    /// Apply the mapping to a whole value sequence.
    ///
    /// Hits replace their value in order. With `$default` set, misses emit
    /// nothing and the default fires exactly once, only when no value of
    /// the sequence matched. Without a default, `$inherit` passes misses
    /// through unchanged and otherwise misses are dropped.
    pub fn apply(&self, values: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(values.len());
        let mut hits = 0usize;
        for value in values {
            if let Some(mapped) = self.lookup(value) {
                hits += 1;
                out.push(mapped.to_string());
            } else if self.default.is_none() && self.inherit {
                out.push(value.clone());
            }
        }
        if hits == 0 {
            if let Some(default) = &self.default {
                return vec![default.clone()];
            }
        }
        out
    }
}

/// Read a referenced mapping file: a single flat string -> scalar object,
/// resolved relative to the descriptor's directory by the caller.
pub(crate) fn resolve_ref(path: &Path) -> Result<IndexMap<String, String>, LoadError> {
    let text = fs::read_to_string(path).map_err(|e| LoadError::RefUnresolved {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let doc: Value = serde_json::from_str(&text).map_err(|e| LoadError::RefUnresolved {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let map = doc.as_object().ok_or_else(|| LoadError::RefShape {
        path: path.to_path_buf(),
    })?;
    let mut entries = IndexMap::with_capacity(map.len());
    for (key, value) in map {
        let scalar = Scalar::from_value(value).ok_or_else(|| LoadError::RefShape {
            path: path.to_path_buf(),
        })?;
        entries.insert(key.clone(), scalar.render());
    }
    Ok(entries)
}
