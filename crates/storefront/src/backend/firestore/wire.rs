//! Wire types for the Firestore REST document API.
//!
//! Firestore wraps every field in a typed value envelope
//! (`{"stringValue": "..."}`, `{"integerValue": "3"}` - note integers are
//! JSON strings on the wire). Queries go through `:runQuery` with a
//! structured query body. Only the small slice of the protocol this
//! application uses is modeled.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Firestore typed value envelope.
///
/// Exactly one variant field is set on a well-formed value; reading
/// accessors are lenient because the original data was written by a client
/// that did not keep field types consistent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integer_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boolean_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null_value: Option<String>,
}

impl Value {
    /// A string value.
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self {
            string_value: Some(s.into()),
            ..Self::default()
        }
    }

    /// An integer value (serialized as a string per the protocol).
    #[must_use]
    pub fn integer(i: i64) -> Self {
        Self {
            integer_value: Some(i.to_string()),
            ..Self::default()
        }
    }

    /// A timestamp value in RFC 3339.
    #[must_use]
    pub fn timestamp(t: DateTime<Utc>) -> Self {
        Self {
            timestamp_value: Some(t.to_rfc3339()),
            ..Self::default()
        }
    }

    /// Read as a string, if the value carries one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.string_value.as_deref()
    }

    /// Read as an integer. Accepts `integerValue`, an integral
    /// `doubleValue`, or a numeric `stringValue`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        if let Some(s) = &self.integer_value {
            return s.parse().ok();
        }
        if let Some(d) = self.double_value {
            if d.fract() == 0.0 && d.abs() < 9_007_199_254_740_992.0 {
                #[allow(clippy::cast_possible_truncation)]
                return Some(d as i64);
            }
            return None;
        }
        self.string_value.as_deref().and_then(|s| s.parse().ok())
    }

    /// Read as a timestamp from `timestampValue` or an RFC 3339 string.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self
            .timestamp_value
            .as_deref()
            .or(self.string_value.as_deref())?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Collapse to a plain JSON value for lenient numeric parsing
    /// (prices arrive as strings or numbers depending on who wrote them).
    #[must_use]
    pub fn as_json(&self) -> serde_json::Value {
        if let Some(s) = &self.string_value {
            return serde_json::Value::String(s.clone());
        }
        if let Some(s) = &self.integer_value {
            if let Ok(i) = s.parse::<i64>() {
                return serde_json::Value::from(i);
            }
        }
        if let Some(d) = self.double_value {
            return serde_json::Value::from(d);
        }
        serde_json::Value::Null
    }
}

/// A Firestore document: a resource name plus a map of field envelopes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Full resource name, e.g.
    /// `projects/p/databases/(default)/documents/books/abc123`.
    /// Absent when sending a create request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    /// Build a document body from fields (for create/patch requests).
    #[must_use]
    pub fn from_fields(fields: BTreeMap<String, Value>) -> Self {
        Self { name: None, fields }
    }

    /// The document's ID: the last segment of its resource name.
    #[must_use]
    pub fn doc_id(&self) -> Option<&str> {
        self.name.as_deref()?.rsplit('/').next()
    }

    /// Read a field's envelope.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Response shape for `GET .../documents/{collection}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// `:runQuery` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub field_filter: FieldFilter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: String,
    pub value: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

/// One streamed `:runQuery` result. Items without a `document` are
/// bookkeeping entries (read time only) and are skipped.
#[derive(Debug, Deserialize)]
pub struct RunQueryItem {
    #[serde(default)]
    pub document: Option<Document>,
}

/// Error body the REST API returns on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: ApiError,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
}

/// Build an equality query over one collection field.
#[must_use]
pub fn eq_query(collection: &str, field: &str, value: Value, limit: Option<i32>) -> RunQueryRequest {
    RunQueryRequest {
        structured_query: StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: collection.to_string(),
            }],
            filter: Some(Filter {
                field_filter: FieldFilter {
                    field: FieldReference {
                        field_path: field.to_string(),
                    },
                    op: "EQUAL".to_string(),
                    value,
                },
            }),
            limit,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_integer_is_stringly_typed() {
        let v = Value::integer(3);
        let json = serde_json::to_value(&v).expect("serialize");
        assert_eq!(json, serde_json::json!({ "integerValue": "3" }));
        assert_eq!(v.as_i64(), Some(3));
    }

    #[test]
    fn test_value_lenient_integer_reads() {
        let from_double: Value = serde_json::from_value(serde_json::json!({
            "doubleValue": 2.0
        }))
        .expect("deserialize");
        assert_eq!(from_double.as_i64(), Some(2));

        let from_string: Value = serde_json::from_value(serde_json::json!({
            "stringValue": "5"
        }))
        .expect("deserialize");
        assert_eq!(from_string.as_i64(), Some(5));

        let fractional: Value = serde_json::from_value(serde_json::json!({
            "doubleValue": 2.5
        }))
        .expect("deserialize");
        assert_eq!(fractional.as_i64(), None);
    }

    #[test]
    fn test_document_id_from_resource_name() {
        let doc = Document {
            name: Some("projects/p/databases/(default)/documents/books/abc123".to_string()),
            fields: BTreeMap::new(),
        };
        assert_eq!(doc.doc_id(), Some("abc123"));
    }

    #[test]
    fn test_eq_query_shape() {
        let req = eq_query("carts", "userId", Value::string("u1"), Some(10));
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "structuredQuery": {
                    "from": [{ "collectionId": "carts" }],
                    "where": {
                        "fieldFilter": {
                            "field": { "fieldPath": "userId" },
                            "op": "EQUAL",
                            "value": { "stringValue": "u1" }
                        }
                    },
                    "limit": 10
                }
            })
        );
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let now = Utc::now();
        let v = Value::timestamp(now);
        let back = v.as_timestamp().expect("timestamp");
        assert_eq!(back.timestamp(), now.timestamp());
    }
}
