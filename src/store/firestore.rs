//! Cloud Firestore over its REST v1 interface.
//!
//! Documents are plain JSON objects on our side and typed Firestore values
//! (`stringValue`, `doubleValue`, ...) on the wire.

use super::{Document, DocumentStore, RemoveOutcome, StoredDocument};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

const PAGE_SIZE: u32 = 300;

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub base_url: String,
    pub project_id: String,
    /// OAuth2 bearer token, supplied out-of-band.
    pub token: String,
}

pub struct FirestoreStore {
    client: reqwest::Client,
    config: FirestoreConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreStore {
    /// Builds the client and probes the collection once so an unusable token
    /// or project is caught at startup.
    pub async fn connect(config: FirestoreConfig, probe_collection: &str) -> Result<Self> {
        let store = Self {
            client: reqwest::Client::new(),
            config,
        };

        let response = store
            .client
            .get(store.collection_url(probe_collection))
            .bearer_auth(&store.config.token)
            .query(&[("pageSize", "1")])
            .send()
            .await
            .context("Failed to reach Firestore")?;
        ensure_success(response, "probe Firestore collection").await?;

        Ok(store)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id,
            collection
        )
    }
}

async fn ensure_success(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("Failed to {}: {} {}", action, status, body.trim());
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>> {
        let url = self.collection_url(collection);
        let page_size = PAGE_SIZE.to_string();
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", page_size.clone())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.config.token)
                .query(&query)
                .send()
                .await
                .context("Failed to reach Firestore")?;
            let page: ListDocumentsResponse = ensure_success(response, "list documents")
                .await?
                .json()
                .await
                .context("Failed to decode Firestore document list")?;

            for doc in page.documents {
                match decode_document(doc) {
                    Ok(stored) => documents.push(stored),
                    Err(e) => tracing::warn!("Skipping Firestore document: {:#}", e),
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<String> {
        let response = self
            .client
            .post(self.collection_url(collection))
            .bearer_auth(&self.config.token)
            .json(&json!({ "fields": encode_fields(&document) }))
            .send()
            .await
            .context("Failed to reach Firestore")?;
        let created: FirestoreDocument = ensure_success(response, "create document")
            .await?
            .json()
            .await
            .context("Failed to decode created Firestore document")?;

        Ok(document_id(&created.name).to_string())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<RemoveOutcome> {
        // A slash would address a subcollection path, not a document here.
        if id.is_empty() || id.contains('/') {
            return Ok(RemoveOutcome::Missing);
        }

        // Without the precondition Firestore acknowledges deletes of missing
        // documents.
        let response = self
            .client
            .delete(format!("{}/{}", self.collection_url(collection), id))
            .bearer_auth(&self.config.token)
            .query(&[("currentDocument.exists", "true")])
            .send()
            .await
            .context("Failed to reach Firestore")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(RemoveOutcome::Missing);
        }
        ensure_success(response, "delete document").await?;
        Ok(RemoveOutcome::Removed)
    }
}

/// The trailing segment of `projects/p/databases/(default)/documents/c/<id>`.
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn decode_document(doc: FirestoreDocument) -> Result<StoredDocument> {
    let mut fields = Document::new();
    for (key, value) in doc.fields {
        let decoded = decode_value(&value)
            .with_context(|| format!("Unsupported value for field '{}' in {}", key, doc.name))?;
        fields.insert(key, decoded);
    }
    Ok(StoredDocument {
        id: document_id(&doc.name).to_string(),
        fields,
    })
}

pub(crate) fn encode_fields(document: &Document) -> Map<String, Value> {
    document
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

pub(crate) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub(crate) fn decode_value(value: &Value) -> Result<Value> {
    let Some((kind, inner)) = value.as_object().and_then(|obj| obj.iter().next()) else {
        bail!("expected a typed Firestore value, got {}", value);
    };

    let decoded = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or(false)),
        "stringValue" | "timestampValue" | "referenceValue" => inner.clone(),
        "integerValue" => {
            // 64-bit integers travel as strings.
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().context("malformed integerValue")?,
                other => other.as_i64().context("malformed integerValue")?,
            };
            Value::Number(parsed.into())
        }
        "doubleValue" => {
            let f = inner.as_f64().context("malformed doubleValue")?;
            Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
        }
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Value::Array(values)
        }
        "mapValue" => {
            let mut map = Map::new();
            if let Some(fields) = inner.get("fields").and_then(Value::as_object) {
                for (key, field) in fields {
                    map.insert(key.clone(), decode_value(field)?);
                }
            }
            Value::Object(map)
        }
        other => bail!("unknown Firestore value type '{}'", other),
    };

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::extract::Query;
    use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::{Json, Router};
    use std::collections::HashMap;

    const DOCUMENTS_PREFIX: &str = "projects/demo/databases/(default)/documents";

    fn wire_document(id: &str, name: &str, amount: f64) -> Value {
        json!({
            "name": format!("{}/expenses/{}", DOCUMENTS_PREFIX, id),
            "fields": {
                "name": {"stringValue": name},
                "amount": {"doubleValue": amount},
            },
        })
    }

    /// A two-page `expenses` collection for project `demo`. Only the token
    /// `owner` is accepted, and only `missing` is absent on delete.
    async fn fake_firestore(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
        body: Bytes,
    ) -> Response {
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some("Bearer owner");
        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"code": 401, "status": "UNAUTHENTICATED"}})),
            )
                .into_response();
        }

        let collection = format!("/v1/{}/expenses", DOCUMENTS_PREFIX);
        let Some(rest) = uri.path().strip_prefix(collection.as_str()) else {
            return StatusCode::NOT_FOUND.into_response();
        };

        match rest {
            "" if method == Method::GET => {
                let page = match params.get("pageToken").map(String::as_str) {
                    None => json!({
                        "documents": [wire_document("a1", "Bus", 2.75)],
                        "nextPageToken": "page-2",
                    }),
                    Some("page-2") => json!({
                        "documents": [
                            wire_document("b2", "Rent", 900.0),
                            {
                                "name": format!("{}/expenses/c3", DOCUMENTS_PREFIX),
                                "fields": {
                                    "where": {"geoPointValue": {"latitude": 1.0, "longitude": 2.0}},
                                },
                            },
                        ],
                    }),
                    Some(_) => return StatusCode::BAD_REQUEST.into_response(),
                };
                Json(page).into_response()
            }
            "" if method == Method::POST => {
                let request: Value = serde_json::from_slice(&body).unwrap_or_default();
                if request["fields"]["name"]["stringValue"].is_null() {
                    return StatusCode::BAD_REQUEST.into_response();
                }
                Json(json!({
                    "name": format!("{}/expenses/new-id", DOCUMENTS_PREFIX),
                    "fields": request["fields"],
                }))
                .into_response()
            }
            id if method == Method::DELETE => {
                if params.get("currentDocument.exists").map(String::as_str) != Some("true") {
                    return StatusCode::BAD_REQUEST.into_response();
                }
                if id == "/missing" {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({"error": {"code": 404, "status": "NOT_FOUND"}})),
                    )
                        .into_response()
                } else {
                    Json(json!({})).into_response()
                }
            }
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        }
    }

    async fn spawn_fake_firestore(token: &str) -> FirestoreConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().fallback(fake_firestore))
                .await
                .unwrap();
        });
        FirestoreConfig {
            base_url: format!("http://{}/v1", addr),
            project_id: "demo".to_string(),
            token: token.to_string(),
        }
    }

    #[tokio::test]
    async fn test_connect_rejects_unauthorized_token() {
        let config = spawn_fake_firestore("expired").await;
        let err = FirestoreStore::connect(config, "expenses").await.err().unwrap();
        let message = format!("{:#}", err);
        assert!(message.contains("probe Firestore collection"));
        assert!(message.contains("401"));
    }

    #[tokio::test]
    async fn test_list_follows_page_tokens_and_skips_undecodable_documents() {
        let config = spawn_fake_firestore("owner").await;
        let store = FirestoreStore::connect(config, "expenses").await.unwrap();

        let docs = store.list("expenses").await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b2"]);
        assert_eq!(docs[1].fields["amount"], 900.0);
    }

    #[tokio::test]
    async fn test_insert_returns_id_from_document_name() {
        let config = spawn_fake_firestore("owner").await;
        let store = FirestoreStore::connect(config, "expenses").await.unwrap();

        let doc = json!({"name": "Coffee", "amount": 4.5});
        let id = store
            .insert("expenses", doc.as_object().unwrap().clone())
            .await
            .unwrap();
        assert_eq!(id, "new-id");
    }

    #[tokio::test]
    async fn test_remove_maps_precondition_failure_to_missing() {
        let config = spawn_fake_firestore("owner").await;
        let store = FirestoreStore::connect(config, "expenses").await.unwrap();

        assert_eq!(
            store.remove("expenses", "a1").await.unwrap(),
            RemoveOutcome::Removed
        );
        assert_eq!(
            store.remove("expenses", "missing").await.unwrap(),
            RemoveOutcome::Missing
        );
    }

    #[tokio::test]
    async fn test_remove_rejects_ids_that_are_not_one_path_segment() {
        let config = spawn_fake_firestore("owner").await;
        let store = FirestoreStore::connect(config, "expenses").await.unwrap();

        // The fake would acknowledge both paths if they were sent.
        assert_eq!(
            store.remove("expenses", "a1/history/h1").await.unwrap(),
            RemoveOutcome::Missing
        );
        assert_eq!(
            store.remove("expenses", "").await.unwrap(),
            RemoveOutcome::Missing
        );
    }

    #[test]
    fn test_encode_expense_document() {
        let doc = json!({
            "name": "Coffee",
            "amount": 4.5,
            "category": "Food",
            "date": "2025-01-01T08:00:00+00:00",
            "user_id": null,
        });
        let encoded = encode_fields(doc.as_object().unwrap());

        assert_eq!(encoded["name"], json!({"stringValue": "Coffee"}));
        assert_eq!(encoded["amount"], json!({"doubleValue": 4.5}));
        assert_eq!(encoded["user_id"], json!({"nullValue": null}));
    }

    #[test]
    fn test_whole_amounts_encode_as_integers() {
        assert_eq!(encode_value(&json!(20)), json!({"integerValue": "20"}));
    }

    #[test]
    fn test_decode_typed_values() {
        assert_eq!(decode_value(&json!({"integerValue": "42"})).unwrap(), json!(42));
        assert_eq!(decode_value(&json!({"doubleValue": 11.5})).unwrap(), json!(11.5));
        assert_eq!(
            decode_value(&json!({"timestampValue": "2024-02-01T00:00:00Z"})).unwrap(),
            json!("2024-02-01T00:00:00Z")
        );
        assert_eq!(decode_value(&json!({"nullValue": null})).unwrap(), Value::Null);
        assert_eq!(
            decode_value(&json!({"mapValue": {"fields": {"a": {"booleanValue": true}}}}))
                .unwrap(),
            json!({"a": true})
        );
        assert!(decode_value(&json!({"geoPointValue": {}})).is_err());
        assert!(decode_value(&json!("bare")).is_err());
    }

    #[test]
    fn test_decode_document_takes_id_from_name() {
        let doc: FirestoreDocument = serde_json::from_value(json!({
            "name": "projects/demo/databases/(default)/documents/expenses/abc123",
            "fields": {
                "name": {"stringValue": "Bus"},
                "amount": {"doubleValue": 2.75},
            },
            "createTime": "2025-01-01T00:00:00Z",
        }))
        .unwrap();

        let stored = decode_document(doc).unwrap();
        assert_eq!(stored.id, "abc123");
        assert_eq!(stored.fields["name"], "Bus");
        assert_eq!(stored.fields["amount"], 2.75);
    }

    #[test]
    fn test_collection_url() {
        let store = FirestoreStore {
            client: reqwest::Client::new(),
            config: FirestoreConfig {
                base_url: "http://localhost:8080/v1/".to_string(),
                project_id: "demo".to_string(),
                token: "owner".to_string(),
            },
        };
        assert_eq!(
            store.collection_url("expenses"),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents/expenses"
        );
    }
}
