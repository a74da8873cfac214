//! Declarative join specifications and their in-process interpreter.
//!
//! A [`JoinSpec`] names a base collection and an ordered list of
//! [`LookupStep`]s. Each step adds an array field (`as`) holding every
//! document of `from` whose `foreign_field` equals the current document's
//! `local_field`. Steps compose left to right; a later step's local field
//! may be a dot path into an array produced by an earlier one.
//!
//! [`apply_lookups`] evaluates a spec against documents held in memory,
//! following the matching rules of a MongoDB `$lookup` stage:
//!
//! - a dot path walks through arrays, collecting every reachable value;
//! - an array-valued local key matches if any element matches;
//! - integers and floats compare numerically;
//! - a null or missing local key matches foreign documents whose field is
//!   null or missing;
//! - no match yields an empty array, never null.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::table::Record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupStep {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    #[serde(rename = "as")]
    pub as_field: String,
}

impl LookupStep {
    pub fn new(from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        Self {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub base: String,
    pub lookups: Vec<LookupStep>,
}

impl JoinSpec {
    /// Base collection followed by every `from`, without duplicates.
    pub fn referenced_collections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = vec![self.base.as_str()];
        for step in &self.lookups {
            if !names.contains(&step.from.as_str()) {
                names.push(step.from.as_str());
            }
        }
        names
    }
}

/// Collects every value reachable at `path`, descending into arrays.
pub fn resolve_path(doc: &Record, path: &str) -> Vec<Value> {
    let mut current: Vec<&Value> = Vec::new();
    let mut segments = path.split('.');
    let first = match segments.next() {
        Some(s) => s,
        None => return Vec::new(),
    };
    match doc.get(first) {
        Some(v) => current.push(v),
        None => return Vec::new(),
    }
    for segment in segments {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(v) = map.get(segment) {
                        next.push(v);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Value::Object(map) = item {
                            if let Some(v) = map.get(segment) {
                                next.push(v);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }

    let mut out = Vec::new();
    for value in current {
        match value {
            Value::Array(items) => out.extend(items.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    out
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

fn matches_any(locals: &[Value], foreign: &[Value]) -> bool {
    let local_null = locals.is_empty() || locals.iter().all(Value::is_null);
    let foreign_null = foreign.is_empty() || foreign.iter().all(Value::is_null);
    if local_null {
        return foreign_null;
    }
    locals
        .iter()
        .any(|l| !l.is_null() && foreign.iter().any(|f| scalar_eq(l, f)))
}

/// Runs `steps` over `base`, resolving each `from` through `resolve`.
/// An unresolvable collection behaves as an empty one.
pub fn apply_lookups<'a, F>(base: &[Record], steps: &[LookupStep], resolve: F) -> Vec<Record>
where
    F: Fn(&str) -> Option<&'a [Record]>,
{
    let mut docs: Vec<Record> = base.to_vec();
    for step in steps {
        let foreign = resolve(&step.from).unwrap_or(&[]);
        let foreign_keys: Vec<Vec<Value>> = foreign
            .iter()
            .map(|f| resolve_path(f, &step.foreign_field))
            .collect();
        for doc in docs.iter_mut() {
            let locals = resolve_path(doc, &step.local_field);
            let joined: Vec<Value> = foreign
                .iter()
                .zip(&foreign_keys)
                .filter(|(_, keys)| matches_any(&locals, keys))
                .map(|(f, _)| Value::Object(f.clone()))
                .collect();
            doc.insert(step.as_field.clone(), Value::Array(joined));
        }
    }
    docs
}
