//! Firestore document and value types.
//!
//! These mirror the Firestore REST wire format and are shared by every store
//! backend, so repositories only ever deal with one document shape.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linkup_models::{
    ApplicationId, ChatId, CommentId, InvitationId, JobId, MessageId, NotificationId, PostId,
    UserId,
};

use crate::error::{StoreError, StoreResult};

/// Document fields keyed by field name.
pub type Fields = HashMap<String, Value>;

/// Firestore document value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Fields>,
}

impl Value {
    /// Elements of an array value; empty for anything else.
    pub fn array_items(&self) -> &[Value] {
        match self {
            Value::ArrayValue(ArrayValue { values: Some(values) }) => values,
            _ => &[],
        }
    }

    /// Fields of a map value.
    pub fn map_fields(&self) -> Option<&Fields> {
        match self {
            Value::MapValue(MapValue { fields }) => fields.as_ref(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::NullValue(()))
    }
}

/// Firestore document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Document fields
    #[serde(default)]
    pub fields: Option<Fields>,
    /// Create time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Update time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: Fields) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }

    /// Document id: the last segment of the resource name.
    pub fn id(&self) -> Option<&str> {
        self.name.as_deref().and_then(|n| n.rsplit('/').next())
    }

    /// Raw field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.as_ref().and_then(|f| f.get(name))
    }

    /// Typed field value; `None` when absent, null or of the wrong type.
    pub fn get<T: FromFirestoreValue>(&self, name: &str) -> Option<T> {
        self.field(name).and_then(T::from_firestore_value)
    }

    /// Typed field value that must be present.
    pub fn require<T: FromFirestoreValue>(&self, name: &str) -> StoreResult<T> {
        self.get(name).ok_or_else(|| {
            StoreError::invalid_document(format!(
                "{} is missing field '{}'",
                self.name.as_deref().unwrap_or("<unnamed>"),
                name
            ))
        })
    }

    /// Typed array field; missing fields read as empty.
    pub fn get_vec<T: FromFirestoreValue>(&self, name: &str) -> Vec<T> {
        self.field(name)
            .map(|v| v.array_items().iter().filter_map(T::from_firestore_value).collect())
            .unwrap_or_default()
    }

    /// String field, empty when absent.
    pub fn string(&self, name: &str) -> String {
        self.get(name).unwrap_or_default()
    }

    /// Timestamp field, falling back to the store's own timestamps.
    pub fn timestamp(&self, name: &str) -> DateTime<Utc> {
        self.get(name)
            .or_else(|| {
                self.create_time
                    .as_deref()
                    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                    .map(|dt| dt.into())
            })
            .unwrap_or_else(Utc::now)
    }

    /// Enumeration field stored as its string form; default when absent or unknown.
    pub fn parsed<T: std::str::FromStr + Default>(&self, name: &str) -> T {
        self.get::<String>(name)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

/// Document ids for a batch read.
pub fn doc_ids<T: AsRef<str>>(ids: &[T]) -> Vec<String> {
    ids.iter().map(|id| id.as_ref().to_string()).collect()
}

// ============================================================================
// Batch Get
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetDocumentsRequest {
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetDocumentsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<String>,
}

// ============================================================================
// Structured Queries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_descendants: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeFilter {
    pub op: String,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite_filter: Option<CompositeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_filter: Option<FieldFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub field: FieldReference,
    pub direction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub r#where: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<Order>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
}

// ============================================================================
// Conversions
// ============================================================================

/// Convert a Rust value to Firestore Value.
pub trait ToFirestoreValue {
    fn to_firestore_value(&self) -> Value;
}

impl ToFirestoreValue for String {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.clone())
    }
}

impl ToFirestoreValue for &str {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.to_string())
    }
}

impl ToFirestoreValue for i64 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}

impl ToFirestoreValue for u32 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue((*self as i64).to_string())
    }
}

impl ToFirestoreValue for bool {
    fn to_firestore_value(&self) -> Value {
        Value::BooleanValue(*self)
    }
}

impl ToFirestoreValue for DateTime<Utc> {
    fn to_firestore_value(&self) -> Value {
        Value::TimestampValue(self.to_rfc3339())
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Option<T> {
    fn to_firestore_value(&self) -> Value {
        match self {
            Some(v) => v.to_firestore_value(),
            None => Value::NullValue(()),
        }
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Vec<T> {
    fn to_firestore_value(&self) -> Value {
        Value::ArrayValue(ArrayValue {
            values: Some(self.iter().map(|v| v.to_firestore_value()).collect()),
        })
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for [T] {
    fn to_firestore_value(&self) -> Value {
        Value::ArrayValue(ArrayValue {
            values: Some(self.iter().map(|v| v.to_firestore_value()).collect()),
        })
    }
}

impl ToFirestoreValue for Fields {
    fn to_firestore_value(&self) -> Value {
        Value::MapValue(MapValue {
            fields: Some(self.clone()),
        })
    }
}

/// Convert Firestore Value to Rust type.
pub trait FromFirestoreValue: Sized {
    fn from_firestore_value(value: &Value) -> Option<Self>;
}

impl FromFirestoreValue for String {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromFirestoreValue for i64 {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::IntegerValue(s) => s.parse().ok(),
            Value::DoubleValue(f) => Some(*f as i64),
            _ => None,
        }
    }
}

impl FromFirestoreValue for u32 {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::IntegerValue(s) => s.parse().ok(),
            Value::DoubleValue(f) => Some(*f as u32),
            _ => None,
        }
    }
}

impl FromFirestoreValue for bool {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromFirestoreValue for DateTime<Utc> {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::TimestampValue(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.into()),
            _ => None,
        }
    }
}

impl FromFirestoreValue for Fields {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        value.map_fields().cloned()
    }
}

macro_rules! id_value {
    ($($id:ty),* $(,)?) => {
        $(
            impl ToFirestoreValue for $id {
                fn to_firestore_value(&self) -> Value {
                    Value::StringValue(self.as_str().to_string())
                }
            }

            impl FromFirestoreValue for $id {
                fn from_firestore_value(value: &Value) -> Option<Self> {
                    String::from_firestore_value(value).map(<$id>::from)
                }
            }
        )*
    };
}

id_value!(
    UserId,
    PostId,
    CommentId,
    JobId,
    ApplicationId,
    ChatId,
    MessageId,
    NotificationId,
    InvitationId,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_wire_format() {
        let v = Value::StringValue("x".to_string());
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"stringValue":"x"}"#);

        let null = Value::NullValue(());
        assert_eq!(serde_json::to_string(&null).unwrap(), r#"{"nullValue":null}"#);
    }

    #[test]
    fn test_document_helpers() {
        let mut fields = Fields::new();
        fields.insert("title".to_string(), "hello".to_firestore_value());
        fields.insert(
            "likes".to_string(),
            vec![UserId::from("a"), UserId::from("b")].to_firestore_value(),
        );
        let mut doc = Document::new(fields);
        doc.name = Some("projects/p/databases/(default)/documents/posts/abc".to_string());

        assert_eq!(doc.id(), Some("abc"));
        assert_eq!(doc.get::<String>("title").as_deref(), Some("hello"));
        assert_eq!(doc.get_vec::<UserId>("likes").len(), 2);
        assert!(doc.get_vec::<UserId>("missing").is_empty());
        assert!(doc.require::<String>("missing").is_err());
    }

    #[test]
    fn test_query_serializes_where_keyword() {
        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: "posts".to_string(),
                all_descendants: None,
            }],
            r#where: Some(Filter {
                composite_filter: None,
                field_filter: Some(FieldFilter {
                    field: FieldReference {
                        field_path: "author".to_string(),
                    },
                    op: "EQUAL".to_string(),
                    value: Value::StringValue("u1".to_string()),
                }),
            }),
            order_by: None,
            limit: Some(10),
        };
        let json = serde_json::to_value(&query).unwrap();
        assert!(json.get("where").is_some());
        assert_eq!(json["from"][0]["collectionId"], "posts");
        assert_eq!(json["limit"], 10);
    }
}
