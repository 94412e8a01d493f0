//! The document-database collaborator boundary.
//!
//! [`DocumentDatabase`] is the seam between the adapter and its wire glue:
//! a real deployment implements it with REST calls against a document
//! database; tests run against [`MemoryDocumentDb`], which implements the
//! selector semantics in memory over the same serialized query format.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::Value;

use weave_store::{StoreError, StoreResult};

use crate::document::Document;

/// A collection of JSON documents addressable by ID and queryable with a
/// Mango-style `{selector, sort, skip, limit}` query.
///
/// Contract for `find`: results are filtered by the selector, ordered by
/// the sort spec (documents missing a sort field order last, regardless of
/// direction), then sliced by `skip` and `limit`.
pub trait DocumentDatabase: Send + Sync {
    /// Fetch one document by ID. `Ok(None)` when absent.
    fn get(&self, id: &str) -> StoreResult<Option<Document>>;

    /// Insert or overwrite a document.
    fn put(&self, document: &Document) -> StoreResult<()>;

    /// Delete a document, returning the previous one if any.
    fn delete(&self, id: &str) -> StoreResult<Option<Document>>;

    /// Run a query; `query` is the serialized JSON of a
    /// [`LinkQuery`](crate::selector::LinkQuery) or
    /// [`MapQuery`](crate::selector::MapQuery).
    fn find(&self, query: &Value) -> StoreResult<Vec<Document>>;
}

/// In-memory document collection for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryDocumentDb {
    docs: RwLock<BTreeMap<String, Value>>,
}

impl MemoryDocumentDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().expect("database lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentDatabase for MemoryDocumentDb {
    fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        let docs = self
            .docs
            .read()
            .map_err(|_| StoreError::Internal("database lock poisoned".into()))?;
        docs.get(id)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|e| StoreError::Backend(e.to_string()))
            })
            .transpose()
    }

    fn put(&self, document: &Document) -> StoreResult<()> {
        let value =
            serde_json::to_value(document).map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut docs = self
            .docs
            .write()
            .map_err(|_| StoreError::Internal("database lock poisoned".into()))?;
        docs.insert(document.id.clone(), value);
        Ok(())
    }

    fn delete(&self, id: &str) -> StoreResult<Option<Document>> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| StoreError::Internal("database lock poisoned".into()))?;
        docs.remove(id)
            .map(|value| {
                serde_json::from_value(value).map_err(|e| StoreError::Backend(e.to_string()))
            })
            .transpose()
    }

    fn find(&self, query: &Value) -> StoreResult<Vec<Document>> {
        let docs = self
            .docs
            .read()
            .map_err(|_| StoreError::Internal("database lock poisoned".into()))?;

        let selector = query.get("selector").and_then(Value::as_object);
        let mut matches: Vec<Value> = docs
            .values()
            .filter(|doc| match selector {
                Some(selector) => matches_selector(doc, selector),
                None => true,
            })
            .cloned()
            .collect();
        drop(docs);

        if let Some(sort_specs) = query.get("sort").and_then(Value::as_array) {
            matches.sort_by(|a, b| compare_by_specs(a, b, sort_specs));
        }

        let skip = query.get("skip").and_then(Value::as_u64).unwrap_or(0) as usize;
        let limit = query
            .get("limit")
            .and_then(Value::as_u64)
            .map(|l| l as usize)
            .unwrap_or(usize::MAX);

        matches
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|value| {
                serde_json::from_value(value).map_err(|e| StoreError::Backend(e.to_string()))
            })
            .collect()
    }
}

/// Resolve a dotted path (`link.meta.process`) inside a document.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn matches_selector(doc: &Value, selector: &serde_json::Map<String, Value>) -> bool {
    selector
        .iter()
        .all(|(path, condition)| matches_condition(lookup(doc, path), condition))
}

fn matches_condition(actual: Option<&Value>, condition: &Value) -> bool {
    let operators = match condition.as_object() {
        Some(obj) if obj.keys().any(|k| k.starts_with('$')) => obj,
        // A plain value is an equality match.
        _ => return actual == Some(condition),
    };

    operators.iter().all(|(op, operand)| match op.as_str() {
        "$exists" => operand.as_bool() == Some(actual.is_some()),
        "$eq" => actual == Some(operand),
        "$in" => match (actual, operand.as_array()) {
            (Some(actual), Some(candidates)) => candidates.contains(actual),
            _ => false,
        },
        "$all" => match (actual.and_then(Value::as_array), operand.as_array()) {
            (Some(actual), Some(required)) => required.iter().all(|v| actual.contains(v)),
            _ => false,
        },
        _ => false,
    })
}

fn compare_by_specs(a: &Value, b: &Value, specs: &[Value]) -> Ordering {
    for spec in specs {
        let Some(spec) = spec.as_object() else { continue };
        for (path, direction) in spec {
            let descending = direction.as_str() == Some("desc");
            let ordering = match (lookup(a, path), lookup(b, path)) {
                (None, None) => Ordering::Equal,
                // Missing fields order last regardless of direction.
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(x), Some(y)) => {
                    let ordering = compare_values(x, y);
                    if descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
    }
    Ordering::Equal
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (a, b) => a.to_string().cmp(&b.to_string()),
    }
}
