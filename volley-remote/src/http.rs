//! HTTP implementation of [`RemoteStore`] against the document REST API.
//!
//! Documents live at `{base}/documents/{collection}/{id}`; queries and
//! atomic transforms go through `documents:runQuery` and
//! `documents:commit`. Uses reqwest with JSON serialization.

use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::store::{CreateOutcome, DeleteOutcome, Direction, Filter, OrderBy, RemoteStore};
use crate::value::Document;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// HTTP client for the remote document store.
pub struct HttpRemoteStore {
    client: Client,
    config: RemoteConfig,
    /// Optional bearer token set after sign-in (auth itself is out of
    /// scope here).
    auth_token: Arc<RwLock<Option<String>>>,
}

impl HttpRemoteStore {
    pub fn new(config: RemoteConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            config,
            auth_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets the bearer token used for subsequent requests.
    pub async fn set_auth_token(&self, token: String) {
        *self.auth_token.write().await = Some(token);
    }

    pub async fn clear_auth_token(&self) {
        *self.auth_token.write().await = None;
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/documents/{collection}/{id}", self.config.api_base_url)
    }

    async fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_token.read().await.as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Maps a non-success response to `RemoteError::Api` with the status
    /// and (truncated) body for the logs.
    async fn api_error(resp: reqwest::Response) -> RemoteError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        RemoteError::Api(format!("{status}: {snippet}"))
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn ping(&self) -> RemoteResult<()> {
        let url = format!("{}/health", self.config.api_base_url);
        let resp = self.client.get(&url).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(RemoteError::Unavailable(format!(
                "health check returned {}",
                resp.status()
            )))
        }
    }

    async fn get(&self, collection: &str, id: &str) -> RemoteResult<Option<Document>> {
        let req = self.client.get(self.doc_url(collection, id));
        let resp = self.apply_auth(req).await.send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let body: serde_json::Value = resp.json().await?;
                Ok(Some(Document::from_wire(&body)?))
            }
            _ => Err(Self::api_error(resp).await),
        }
    }

    async fn create_with_id(
        &self,
        collection: &str,
        id: &str,
        doc: &Document,
    ) -> RemoteResult<CreateOutcome> {
        let url = format!("{}/documents/{collection}", self.config.api_base_url);
        let req = self
            .client
            .post(&url)
            .query(&[("documentId", id)])
            .json(&doc.to_wire());
        let resp = self.apply_auth(req).await.send().await?;

        match resp.status() {
            // A duplicate create with our own id is a completed retry
            StatusCode::CONFLICT => {
                debug!(collection, id, "create hit existing document");
                Ok(CreateOutcome::AlreadyExists)
            }
            s if s.is_success() => Ok(CreateOutcome::Created),
            _ => Err(Self::api_error(resp).await),
        }
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        doc: &Document,
        field_mask: &[&str],
    ) -> RemoteResult<()> {
        let mask: Vec<(&str, &str)> = field_mask
            .iter()
            .map(|f| ("updateMask.fieldPaths", *f))
            .collect();
        let req = self
            .client
            .patch(self.doc_url(collection, id))
            .query(&mask)
            .json(&doc.to_wire());
        let resp = self.apply_auth(req).await.send().await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(resp).await)
        }
    }

    async fn run_query(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
        limit: Option<usize>,
    ) -> RemoteResult<Vec<(String, Document)>> {
        let mut query = json!({ "from": [{ "collectionId": collection }] });

        if let Some(f) = filter {
            query["where"] = filter_to_wire(f);
        }
        // No composite indexes: an OR filter cannot carry server-side
        // ordering, so drop it and let the caller sort in memory
        match order_by {
            Some(o) if filter.is_none_or(|f| !f.is_disjunction()) => {
                query["orderBy"] = json!([{
                    "field": { "fieldPath": o.field },
                    "direction": match o.direction {
                        Direction::Ascending => "ASCENDING",
                        Direction::Descending => "DESCENDING",
                    },
                }]);
            }
            Some(o) => {
                warn!(collection, field = %o.field, "dropping orderBy on disjunctive filter");
            }
            None => {}
        }
        if let Some(lim) = limit {
            query["limit"] = json!(lim);
        }

        let url = format!("{}/documents:runQuery", self.config.api_base_url);
        let req = self
            .client
            .post(&url)
            .json(&json!({ "structuredQuery": query }));
        let resp = self.apply_auth(req).await.send().await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        let body: serde_json::Value = resp.json().await?;
        let entries = body
            .as_array()
            .ok_or_else(|| RemoteError::Decode("runQuery response is not an array".into()))?;

        let mut results = Vec::new();
        for entry in entries {
            // Entries without a document are progress/readTime markers
            let Some(doc_json) = entry.get("document") else {
                continue;
            };
            let name = doc_json
                .get("name")
                .and_then(|n| n.as_str())
                .ok_or_else(|| RemoteError::Decode("query document missing name".into()))?;
            let id = name
                .rsplit('/')
                .next()
                .unwrap_or(name)
                .to_string();
            results.push((id, Document::from_wire(doc_json)?));
        }
        Ok(results)
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<DeleteOutcome> {
        let req = self.client.delete(self.doc_url(collection, id));
        let resp = self.apply_auth(req).await.send().await?;

        match resp.status() {
            // Already gone is an acceptable terminal state
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            s if s.is_success() => Ok(DeleteOutcome::Deleted),
            _ => Err(Self::api_error(resp).await),
        }
    }

    async fn transform_increment(
        &self,
        collection: &str,
        id: &str,
        field_path: &str,
        delta: i64,
    ) -> RemoteResult<()> {
        let url = format!("{}/documents:commit", self.config.api_base_url);
        let body = json!({
            "writes": [{
                "transform": {
                    "document": format!("{collection}/{id}"),
                    "fieldTransforms": [{
                        "fieldPath": field_path,
                        "increment": { "integerValue": delta.to_string() },
                    }],
                },
            }],
        });
        let req = self.client.post(&url).json(&body);
        let resp = self.apply_auth(req).await.send().await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(resp).await)
        }
    }
}

fn filter_to_wire(filter: &Filter) -> serde_json::Value {
    match filter {
        Filter::FieldEq { field, value } => json!({
            "fieldFilter": {
                "field": { "fieldPath": field },
                "op": "EQUAL",
                "value": value.to_wire(),
            },
        }),
        Filter::Or(filters) => json!({
            "compositeFilter": {
                "op": "OR",
                "filters": filters.iter().map(filter_to_wire).collect::<Vec<_>>(),
            },
        }),
    }
}
