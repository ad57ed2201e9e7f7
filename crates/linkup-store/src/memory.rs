//! In-process document store.
//!
//! Keeps every collection in memory behind a `tokio` lock and evaluates
//! structured queries locally. Used by tests and for local development
//! without a Firestore project. Nothing survives a restart.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::query::ops;
use crate::store::{check_doc_id, is_valid_doc_id, DocumentStore};
use crate::types::{Document, Fields, Filter, StructuredQuery, Value};

const NAME_PREFIX: &str = "projects/memory/databases/(default)/documents";

/// Documents keyed by collection path, then by document id.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    fn document_name(collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", NAME_PREFIX, collection, doc_id)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_document(&self, collection: &str, doc_id: &str) -> StoreResult<Option<Document>> {
        if !is_valid_doc_id(doc_id) {
            return Ok(None);
        }
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|c| c.get(doc_id))
            .cloned())
    }

    async fn batch_get_documents(
        &self,
        collection: &str,
        doc_ids: &[String],
    ) -> StoreResult<Vec<Document>> {
        let guard = self.collections.read().await;
        let Some(docs) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(doc_ids.iter().filter_map(|id| docs.get(id).cloned()).collect())
    }

    async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: Fields,
    ) -> StoreResult<Document> {
        check_doc_id(doc_id)?;
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        if docs.contains_key(doc_id) {
            return Err(StoreError::AlreadyExists(format!("{}/{}", collection, doc_id)));
        }

        let now = Utc::now().to_rfc3339();
        let doc = Document {
            name: Some(Self::document_name(collection, doc_id)),
            fields: Some(fields),
            create_time: Some(now.clone()),
            update_time: Some(now),
        };
        docs.insert(doc_id.to_string(), doc.clone());
        Ok(doc)
    }

    async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: Fields,
        update_mask: Option<Vec<String>>,
    ) -> StoreResult<Document> {
        check_doc_id(doc_id)?;
        let mut guard = self.collections.write().await;
        let doc = guard
            .get_mut(collection)
            .and_then(|c| c.get_mut(doc_id))
            .ok_or_else(|| StoreError::not_found(format!("{}/{}", collection, doc_id)))?;

        match update_mask {
            Some(mask) => {
                let mut fields = fields;
                let current = doc.fields.get_or_insert_with(Fields::new);
                for path in mask {
                    // Masked fields absent from the payload are removed.
                    match fields.remove(&path) {
                        Some(value) => current.insert(path, value),
                        None => current.remove(&path),
                    };
                }
            }
            None => doc.fields = Some(fields),
        }
        doc.update_time = Some(Utc::now().to_rfc3339());
        Ok(doc.clone())
    }

    async fn delete_document(&self, collection: &str, doc_id: &str) -> StoreResult<()> {
        if let Some(docs) = self.collections.write().await.get_mut(collection) {
            docs.remove(doc_id);
        }
        Ok(())
    }

    async fn run_query(
        &self,
        parent_path: &str,
        query: StructuredQuery,
    ) -> StoreResult<Vec<Document>> {
        let collection_id = query
            .collection_id()
            .ok_or_else(|| StoreError::request_failed("query has no collection"))?;
        let path = if parent_path.is_empty() {
            collection_id.to_string()
        } else {
            format!("{}/{}", parent_path, collection_id)
        };

        let guard = self.collections.read().await;
        let mut matched: Vec<Document> = guard
            .get(&path)
            .map(|docs| {
                docs.values()
                    .filter(|doc| {
                        query
                            .r#where
                            .as_ref()
                            .map(|f| matches_filter(doc, f))
                            .unwrap_or(true)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(guard);

        if let Some(orders) = &query.order_by {
            // Documents without an ordered field are excluded, as Firestore does.
            matched.retain(|doc| orders.iter().all(|o| doc.field(&o.field.field_path).is_some()));
            matched.sort_by(|a, b| {
                for order in orders {
                    let path = &order.field.field_path;
                    let ord = match (a.field(path), b.field(path)) {
                        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                        _ => Ordering::Equal,
                    };
                    let ord = if order.direction == "DESCENDING" {
                        ord.reverse()
                    } else {
                        ord
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit.max(0) as usize);
        }

        debug!(collection = %path, returned = matched.len(), "memory query");
        Ok(matched)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn matches_filter(doc: &Document, filter: &Filter) -> bool {
    if let Some(composite) = &filter.composite_filter {
        return match composite.op.as_str() {
            ops::AND => composite.filters.iter().all(|f| matches_filter(doc, f)),
            _ => composite.filters.iter().any(|f| matches_filter(doc, f)),
        };
    }

    let Some(field_filter) = &filter.field_filter else {
        return true;
    };
    let Some(actual) = doc.field(&field_filter.field.field_path) else {
        return false;
    };
    let expected = &field_filter.value;

    match field_filter.op.as_str() {
        ops::EQUAL => values_equal(actual, expected),
        ops::NOT_EQUAL => !actual.is_null() && !values_equal(actual, expected),
        ops::LESS_THAN => compare_values(actual, expected) == Some(Ordering::Less),
        ops::LESS_THAN_OR_EQUAL => matches!(
            compare_values(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        ops::GREATER_THAN => compare_values(actual, expected) == Some(Ordering::Greater),
        ops::GREATER_THAN_OR_EQUAL => matches!(
            compare_values(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        ops::ARRAY_CONTAINS => actual
            .array_items()
            .iter()
            .any(|item| values_equal(item, expected)),
        _ => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match compare_values(a, b) {
        Some(ord) => ord == Ordering::Equal,
        None => a == b,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::IntegerValue(s) => s.parse::<i64>().ok().map(|i| i as f64),
        Value::DoubleValue(d) => Some(*d),
        _ => None,
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::TimestampValue(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.into()),
        _ => None,
    }
}

/// Order two values of the same kind; `None` for incomparable kinds.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::StringValue(x), Value::StringValue(y)) => Some(x.cmp(y)),
        (Value::BooleanValue(x), Value::BooleanValue(y)) => Some(x.cmp(y)),
        (Value::TimestampValue(_), Value::TimestampValue(_)) => {
            Some(as_timestamp(a)?.cmp(&as_timestamp(b)?))
        }
        (Value::NullValue(()), Value::NullValue(())) => Some(Ordering::Equal),
        _ => as_number(a)?.partial_cmp(&as_number(b)?),
    }
}
