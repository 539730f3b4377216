//! Qdrant adapter over the REST API
//!
//! Points carry payload `{page_content, metadata}`. Point ids must be UUIDs
//! or integers, so a caller id that isn't a UUID is mapped to a name-based
//! UUID (v5); the same caller id always maps to the same point.
//!
//! Collections default to cosine distance. For cosine and dot product Qdrant
//! reports similarity directly; for Euclid it reports the distance, which is
//! converted with [`DistanceMetric::score_from_distance`]. The strict score
//! threshold is applied client side (Qdrant's own `score_threshold` is
//! inclusive).
//!
//! Full-text search uses the `page_content` text index: a scroll with a
//! `match.text` condition. Scroll results carry no relevance score, so
//! full-text hits are returned in engine order without a `score` key.

pub mod filter;

use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use strata_vdb_concurrency::{CollectionProvisioner, Coordination};
use strata_vdb_core::{
    assign_ids, check_aligned, rank, Candidate, DistanceMetric, Document, Embedding, Metadata,
    SearchOptions, VdbError, VdbResult, VectorStore, VectorType, DOCUMENT_ID_KEY, DOC_ID_KEY,
};
use uuid::Uuid;

use crate::transport::{HttpTransport, Method, UreqTransport};

const BACKEND: &str = "qdrant";
const CONTENT_KEY: &str = "page_content";
const METADATA_KEY: &str = "metadata";

/// Connection settings for a Qdrant server
#[derive(Debug, Clone, PartialEq)]
pub struct QdrantConfig {
    /// Server URL, e.g. `http://localhost:6333`
    pub url: String,
    /// API key sent as `api-key`
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Distance used for new collections
    pub metric: DistanceMetric,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        QdrantConfig {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            timeout: Duration::from_secs(20),
            metric: DistanceMetric::Cosine,
        }
    }
}

impl QdrantConfig {
    /// Reject settings that can never produce a working client
    pub fn validate(&self) -> VdbResult<()> {
        if self.url.trim().is_empty() {
            return Err(VdbError::configuration("qdrant url is required"));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(VdbError::configuration(format!(
                "qdrant url must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        Ok(())
    }

    /// Build the HTTP transport (no network I/O)
    pub fn transport(&self) -> VdbResult<UreqTransport> {
        self.validate()?;
        let mut transport = UreqTransport::new(BACKEND, &self.url, self.timeout);
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            transport = transport.with_header("api-key", key);
        }
        Ok(transport)
    }
}

/// Qdrant's name for a distance metric
pub fn distance_name(metric: DistanceMetric) -> &'static str {
    match metric {
        DistanceMetric::Cosine => "Cosine",
        DistanceMetric::Euclidean => "Euclid",
        DistanceMetric::DotProduct => "Dot",
    }
}

/// Point id for a caller id
pub fn point_id(id: &str) -> String {
    match Uuid::parse_str(id) {
        Ok(uuid) => uuid.to_string(),
        Err(_) => Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string(),
    }
}

/// Qdrant-backed vector store
///
/// # Thread Safety
///
/// `Send + Sync`; stateless apart from the transport and provisioner.
pub struct QdrantVector {
    collection_name: String,
    metric: DistanceMetric,
    transport: Arc<dyn HttpTransport>,
    provisioner: CollectionProvisioner,
}

impl std::fmt::Debug for QdrantVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantVector")
            .field("collection_name", &self.collection_name)
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}

impl QdrantVector {
    /// Adapter for `collection_name` on the server described by `config`
    pub fn new(
        collection_name: impl Into<String>,
        config: &QdrantConfig,
        coordination: &Coordination,
    ) -> VdbResult<Self> {
        Ok(Self::with_transport(
            collection_name,
            Arc::new(config.transport()?),
            coordination.provisioner(),
        )
        .with_metric(config.metric))
    }

    /// Adapter over an explicit transport
    pub fn with_transport(
        collection_name: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        provisioner: CollectionProvisioner,
    ) -> Self {
        QdrantVector {
            collection_name: collection_name.into(),
            metric: DistanceMetric::Cosine,
            transport,
            provisioner,
        }
    }

    /// Builder: distance metric for new collections
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    fn path(&self, suffix: &str) -> String {
        format!("/collections/{}{}", self.collection_name, suffix)
    }

    fn send(&self, method: Method, suffix: &str, body: Option<JsonValue>) -> VdbResult<Option<JsonValue>> {
        self.transport
            .request(method, &self.path(suffix), body.as_ref())?
            .into_success(BACKEND)
    }

    /// Like `send`, but a missing collection yields `Ok(None)`
    fn send_existing(&self, method: Method, suffix: &str, body: JsonValue) -> VdbResult<Option<JsonValue>> {
        let response = self.transport.request(method, &self.path(suffix), Some(&body))?;
        if response.is_not_found() {
            return Ok(None);
        }
        response.into_success(BACKEND)
    }

    fn get_or_create(&self, dimension: usize) -> VdbResult<()> {
        if self
            .transport
            .request(Method::Get, &self.path(""), None)?
            .is_success()
        {
            return Ok(());
        }

        let response = self.transport.request(
            Method::Put,
            &self.path(""),
            Some(&json!({"vectors": {"size": dimension, "distance": distance_name(self.metric)}})),
        )?;
        // 409: someone else created it in between
        if response.status != 409 {
            response.into_success(BACKEND)?;
        }

        for index in [
            json!({"field_name": format!("{}.{}", METADATA_KEY, DOC_ID_KEY), "field_schema": "keyword"}),
            json!({"field_name": format!("{}.{}", METADATA_KEY, DOCUMENT_ID_KEY), "field_schema": "keyword"}),
            json!({
                "field_name": CONTENT_KEY,
                "field_schema": {
                    "type": "text",
                    "tokenizer": "multilingual",
                    "min_token_len": 2,
                    "max_token_len": 20,
                    "lowercase": true,
                },
            }),
        ] {
            self.send(Method::Put, "/index?wait=true", Some(index))?;
        }
        Ok(())
    }

    fn filter_for(&self, options: &SearchOptions) -> VdbResult<Option<JsonValue>> {
        filter::to_qdrant_filter(&options.effective_filters())
    }
}

fn document_from_payload(payload: &JsonValue) -> Option<Document> {
    let payload = payload.as_object()?;
    let page_content = payload
        .get(CONTENT_KEY)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();
    let metadata = payload
        .get(METADATA_KEY)
        .and_then(JsonValue::as_object)
        .cloned()
        .unwrap_or_else(Metadata::new);
    Some(Document {
        page_content,
        metadata,
    })
}

/// Candidates from a search response, `None` if malformed
fn parse_search_response(body: &JsonValue, metric: DistanceMetric) -> Option<Vec<Candidate>> {
    body.get("result")?
        .as_array()?
        .iter()
        .map(|hit| {
            let raw = hit.get("score")?.as_f64()?;
            let document = document_from_payload(hit.get("payload")?)?;
            Some(match metric {
                DistanceMetric::Euclidean => Candidate::from_distance(document, raw, metric),
                _ => Candidate::from_similarity(document, raw),
            })
        })
        .collect()
}

/// Documents from a scroll response, `None` if malformed
fn parse_scroll_response(body: &JsonValue) -> Option<Vec<Document>> {
    body.get("result")?
        .get("points")?
        .as_array()?
        .iter()
        .map(|point| document_from_payload(point.get("payload")?))
        .collect()
}

impl VectorStore for QdrantVector {
    fn vector_type(&self) -> VectorType {
        VectorType::Qdrant
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    fn create_collection(&self, dimension: usize) -> VdbResult<()> {
        self.provisioner
            .ensure(&self.collection_name, || self.get_or_create(dimension))?;
        Ok(())
    }

    fn add_texts(&self, documents: &[Document], embeddings: &[Embedding]) -> VdbResult<Vec<String>> {
        let dimension = check_aligned(documents, embeddings)?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        // Qdrant has no implicit collection creation
        self.create_collection(dimension)?;

        let ids = assign_ids(documents);
        let points: Vec<JsonValue> = ids
            .iter()
            .zip(documents.iter().zip(embeddings))
            .map(|(id, (doc, vector))| {
                json!({
                    "id": point_id(id),
                    "vector": vector,
                    "payload": {CONTENT_KEY: doc.page_content, METADATA_KEY: doc.metadata},
                })
            })
            .collect();
        self.send(Method::Put, "/points?wait=true", Some(json!({"points": points})))?;

        tracing::debug!(
            target: "strata::vdb::qdrant",
            collection = %self.collection_name,
            count = ids.len(),
            "Upserted points"
        );
        Ok(ids)
    }

    fn text_exists(&self, id: &str) -> VdbResult<bool> {
        let wanted = point_id(id);
        let body = self.send_existing(
            Method::Post,
            "/points",
            json!({"ids": [wanted], "with_payload": false, "with_vector": false}),
        )?;
        Ok(body
            .as_ref()
            .and_then(|b| b.get("result"))
            .and_then(JsonValue::as_array)
            .is_some_and(|points| {
                points
                    .iter()
                    .any(|p| p.get("id").and_then(JsonValue::as_str) == Some(wanted.as_str()))
            }))
    }

    fn delete_by_ids(&self, ids: &[String]) -> VdbResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let points: Vec<String> = ids.iter().map(|id| point_id(id)).collect();
        self.send_existing(Method::Post, "/points/delete?wait=true", json!({"points": points}))?;
        Ok(())
    }

    fn delete_by_metadata_field(&self, key: &str, value: &str) -> VdbResult<()> {
        self.send_existing(
            Method::Post,
            "/points/delete?wait=true",
            json!({"filter": {"must": [{"key": filter::payload_key(key), "match": {"value": value}}]}}),
        )?;
        Ok(())
    }

    fn delete(&self) -> VdbResult<()> {
        let response = self.transport.request(Method::Delete, &self.path(""), None)?;
        if !response.is_not_found() {
            response.into_success(BACKEND)?;
        }
        self.provisioner.invalidate(&self.collection_name)?;
        tracing::info!(
            target: "strata::vdb::qdrant",
            collection = %self.collection_name,
            "Collection dropped"
        );
        Ok(())
    }

    fn search_by_vector(&self, query: &[f32], options: &SearchOptions) -> VdbResult<Vec<Document>> {
        let mut body = json!({
            "vector": query,
            "limit": options.top_k,
            "with_payload": true,
        });
        if let Some(f) = self.filter_for(options)? {
            body["filter"] = f;
        }
        let Some(response) = self.send_existing(Method::Post, "/points/search", body)? else {
            return Ok(Vec::new());
        };

        let Some(candidates) = parse_search_response(&response, self.metric) else {
            tracing::warn!(
                target: "strata::vdb::qdrant",
                collection = %self.collection_name,
                "Malformed search response, returning no results"
            );
            return Ok(Vec::new());
        };
        Ok(rank(candidates, options.score_threshold, options.top_k))
    }

    fn search_by_full_text(&self, query: &str, options: &SearchOptions) -> VdbResult<Vec<Document>> {
        let text = json!({"key": CONTENT_KEY, "match": {"text": query}});
        let filter = match self.filter_for(options)? {
            Some(extra) => json!({"must": [text, extra]}),
            None => json!({"must": [text]}),
        };
        let Some(response) = self.send_existing(
            Method::Post,
            "/points/scroll",
            json!({"filter": filter, "limit": options.top_k, "with_payload": true, "with_vector": false}),
        )?
        else {
            return Ok(Vec::new());
        };

        match parse_scroll_response(&response) {
            Some(mut documents) => {
                documents.truncate(options.top_k);
                Ok(documents)
            }
            None => {
                tracing::warn!(
                    target: "strata::vdb::qdrant",
                    collection = %self.collection_name,
                    "Malformed scroll response, returning no results"
                );
                Ok(Vec::new())
            }
        }
    }
}
