//! Chroma adapter over the v2 REST API
//!
//! Collections live under
//! `/api/v2/tenants/{tenant}/databases/{database}/collections`. Data
//! operations address a collection by its server-assigned id, which the
//! adapter resolves by name on first use and remembers.
//!
//! Chroma collections are created with `hnsw:space = cosine`, so query
//! distances are cosine distances and scores are `1 - d`.
//!
//! Chroma has no lexical search: `search_by_full_text` always returns an
//! empty list.

pub mod filter;

use parking_lot::RwLock;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use strata_vdb_concurrency::{CollectionProvisioner, Coordination};
use strata_vdb_core::{
    assign_ids, check_aligned, rank, Candidate, DistanceMetric, Document, Embedding, Metadata,
    SearchOptions, VdbError, VdbResult, VectorStore, VectorType,
};

use crate::transport::{HttpTransport, Method, UreqTransport};

const BACKEND: &str = "chroma";

/// Client-side authentication scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaAuthProvider {
    /// `Authorization: Bearer <credentials>`
    Token,
    /// `Authorization: Basic base64(<user:password>)`
    Basic,
}

impl ChromaAuthProvider {
    /// Parse a provider name
    ///
    /// Accepts the short names (`token`, `basic`) as well as fully qualified
    /// provider class paths containing them.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        if lower.contains("token") {
            Some(ChromaAuthProvider::Token)
        } else if lower.contains("basic") {
            Some(ChromaAuthProvider::Basic)
        } else {
            None
        }
    }
}

/// Connection settings for a Chroma server
#[derive(Debug, Clone, PartialEq)]
pub struct ChromaConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Tenant the collections belong to
    pub tenant: String,
    /// Database within the tenant
    pub database: String,
    /// Authentication provider name (`token` or `basic`)
    pub auth_provider: Option<String>,
    /// Credentials for the provider
    pub auth_credentials: Option<String>,
    /// Use https
    pub ssl: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        ChromaConfig {
            host: "localhost".to_string(),
            port: 8000,
            tenant: "default_tenant".to_string(),
            database: "default_database".to_string(),
            auth_provider: None,
            auth_credentials: None,
            ssl: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ChromaConfig {
    /// Reject settings that can never produce a working client
    pub fn validate(&self) -> VdbResult<()> {
        if self.host.trim().is_empty() {
            return Err(VdbError::configuration("chroma host is required"));
        }
        if self.port == 0 {
            return Err(VdbError::configuration("chroma port must be non-zero"));
        }
        if self.tenant.trim().is_empty() {
            return Err(VdbError::configuration("chroma tenant is required"));
        }
        if self.database.trim().is_empty() {
            return Err(VdbError::configuration("chroma database is required"));
        }
        self.auth_header().map(|_| ())
    }

    /// Base URL, e.g. `http://localhost:8000`
    pub fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// `Authorization` header value for the configured provider
    pub fn auth_header(&self) -> VdbResult<Option<String>> {
        use base64::Engine;

        let Some(provider_name) = self.auth_provider.as_deref().filter(|p| !p.trim().is_empty())
        else {
            return Ok(None);
        };
        let provider = ChromaAuthProvider::parse(provider_name).ok_or_else(|| {
            VdbError::configuration(format!("unknown chroma auth provider '{}'", provider_name))
        })?;
        let credentials = self
            .auth_credentials
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                VdbError::configuration("chroma auth provider set without credentials")
            })?;

        Ok(Some(match provider {
            ChromaAuthProvider::Token => format!("Bearer {}", credentials),
            ChromaAuthProvider::Basic => format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(credentials)
            ),
        }))
    }

    /// Build the HTTP transport (no network I/O)
    pub fn transport(&self) -> VdbResult<UreqTransport> {
        self.validate()?;
        let mut transport = UreqTransport::new(BACKEND, self.base_url(), self.timeout);
        if let Some(auth) = self.auth_header()? {
            transport = transport.with_header("Authorization", auth);
        }
        Ok(transport)
    }
}

/// Chroma-backed vector store
///
/// # Thread Safety
///
/// `Send + Sync`. Holds a transport handle, the provisioner and the cached
/// collection id behind a `RwLock`.
pub struct ChromaVector {
    collection_name: String,
    collections_path: String,
    transport: Arc<dyn HttpTransport>,
    provisioner: CollectionProvisioner,
    collection_id: RwLock<Option<String>>,
}

impl std::fmt::Debug for ChromaVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromaVector")
            .field("collection_name", &self.collection_name)
            .field("collections_path", &self.collections_path)
            .finish_non_exhaustive()
    }
}

impl ChromaVector {
    /// Adapter for `collection_name` on the server described by `config`
    pub fn new(
        collection_name: impl Into<String>,
        config: &ChromaConfig,
        coordination: &Coordination,
    ) -> VdbResult<Self> {
        let transport = config.transport()?;
        Ok(Self::with_transport(
            collection_name,
            &config.tenant,
            &config.database,
            Arc::new(transport),
            coordination.provisioner(),
        ))
    }

    /// Adapter over an explicit transport
    pub fn with_transport(
        collection_name: impl Into<String>,
        tenant: &str,
        database: &str,
        transport: Arc<dyn HttpTransport>,
        provisioner: CollectionProvisioner,
    ) -> Self {
        ChromaVector {
            collection_name: collection_name.into(),
            collections_path: format!("/api/v2/tenants/{}/databases/{}/collections", tenant, database),
            transport,
            provisioner,
            collection_id: RwLock::new(None),
        }
    }

    fn collection_path(&self, id: &str, op: &str) -> String {
        format!("{}/{}/{}", self.collections_path, id, op)
    }

    fn post(&self, path: &str, body: JsonValue) -> VdbResult<Option<JsonValue>> {
        self.transport
            .request(Method::Post, path, Some(&body))?
            .into_success(BACKEND)
    }

    fn remember_id(&self, body: Option<JsonValue>) -> VdbResult<String> {
        let id = body
            .as_ref()
            .and_then(|b| b.get("id"))
            .and_then(JsonValue::as_str)
            .ok_or_else(|| VdbError::BackendRejected {
                backend: BACKEND.to_string(),
                status: 200,
                message: "collection response without id".to_string(),
            })?
            .to_string();
        *self.collection_id.write() = Some(id.clone());
        Ok(id)
    }

    /// Create the collection if needed and return its id
    fn get_or_create(&self) -> VdbResult<String> {
        let body = self.post(
            &self.collections_path,
            json!({
                "name": self.collection_name,
                "get_or_create": true,
                "metadata": {"hnsw:space": "cosine"},
            }),
        )?;
        self.remember_id(body)
    }

    /// Id of the existing collection, `None` if the server doesn't have it
    fn existing_id(&self) -> VdbResult<Option<String>> {
        if let Some(id) = self.collection_id.read().clone() {
            return Ok(Some(id));
        }
        let path = format!("{}/{}", self.collections_path, self.collection_name);
        let response = self.transport.request(Method::Get, &path, None)?;
        if response.is_not_found() {
            return Ok(None);
        }
        let body = response.into_success(BACKEND)?;
        self.remember_id(body).map(Some)
    }

    fn writable_id(&self) -> VdbResult<String> {
        match self.collection_id.read().clone() {
            Some(id) => Ok(id),
            None => self.get_or_create(),
        }
    }

    fn query(&self, id: &str, query: &[f32], options: &SearchOptions) -> VdbResult<Option<JsonValue>> {
        let mut body = json!({
            "query_embeddings": [query],
            "n_results": options.top_k,
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(clause) = filter::where_clause(&options.effective_filters())? {
            body["where"] = clause;
        }
        self.post(&self.collection_path(id, "query"), body)
    }
}

/// Candidates from a query response's parallel arrays (first query only)
///
/// Returns `None` when the response doesn't have the expected shape.
fn parse_query_response(body: &JsonValue) -> Option<Vec<Candidate>> {
    let first = |key: &str| body.get(key)?.as_array()?.first()?.as_array().cloned();
    let ids = first("ids")?;
    let distances = first("distances")?;
    let documents = first("documents")?;
    let metadatas = first("metadatas")?;
    if distances.len() != ids.len() || documents.len() != ids.len() || metadatas.len() != ids.len() {
        return None;
    }

    documents
        .iter()
        .zip(metadatas.iter())
        .zip(distances.iter())
        .map(|((page_content, metadata), distance)| {
            let document = Document {
                page_content: page_content.as_str()?.to_string(),
                // null metadata is stored as an empty map
                metadata: metadata.as_object().cloned().unwrap_or_else(Metadata::new),
            };
            Some(Candidate::from_distance(document, distance.as_f64()?, DistanceMetric::Cosine))
        })
        .collect()
}

impl VectorStore for ChromaVector {
    fn vector_type(&self) -> VectorType {
        VectorType::Chroma
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    fn create_collection(&self, _dimension: usize) -> VdbResult<()> {
        self.provisioner
            .ensure(&self.collection_name, || self.get_or_create().map(|_| ()))?;
        Ok(())
    }

    fn add_texts(&self, documents: &[Document], embeddings: &[Embedding]) -> VdbResult<Vec<String>> {
        check_aligned(documents, embeddings)?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let ids = assign_ids(documents);
        let id = self.writable_id()?;

        let texts: Vec<&str> = documents.iter().map(|d| d.page_content.as_str()).collect();
        let metadatas: Vec<JsonValue> = documents
            .iter()
            .map(|d| filter::sanitize_metadata(&d.metadata))
            .collect();
        self.post(
            &self.collection_path(&id, "upsert"),
            json!({
                "ids": ids,
                "embeddings": embeddings,
                "documents": texts,
                "metadatas": metadatas,
            }),
        )?;

        tracing::debug!(
            target: "strata::vdb::chroma",
            collection = %self.collection_name,
            count = ids.len(),
            "Upserted documents"
        );
        Ok(ids)
    }

    fn text_exists(&self, id: &str) -> VdbResult<bool> {
        let Some(collection_id) = self.existing_id()? else {
            return Ok(false);
        };
        let body = self.post(
            &self.collection_path(&collection_id, "get"),
            json!({"ids": [id], "include": []}),
        )?;
        Ok(body
            .as_ref()
            .and_then(|b| b.get("ids"))
            .and_then(JsonValue::as_array)
            .is_some_and(|ids| ids.iter().any(|v| v.as_str() == Some(id))))
    }

    fn delete_by_ids(&self, ids: &[String]) -> VdbResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let Some(collection_id) = self.existing_id()? else {
            return Ok(());
        };
        self.post(
            &self.collection_path(&collection_id, "delete"),
            json!({"ids": ids}),
        )?;
        Ok(())
    }

    fn delete_by_metadata_field(&self, key: &str, value: &str) -> VdbResult<()> {
        let Some(collection_id) = self.existing_id()? else {
            return Ok(());
        };
        self.post(
            &self.collection_path(&collection_id, "delete"),
            json!({"where": {key: {"$eq": value}}}),
        )?;
        Ok(())
    }

    fn delete(&self) -> VdbResult<()> {
        let path = format!("{}/{}", self.collections_path, self.collection_name);
        let response = self.transport.request(Method::Delete, &path, None)?;
        if !response.is_not_found() {
            response.into_success(BACKEND)?;
        }
        *self.collection_id.write() = None;
        self.provisioner.invalidate(&self.collection_name)?;

        tracing::info!(
            target: "strata::vdb::chroma",
            collection = %self.collection_name,
            "Collection dropped"
        );
        Ok(())
    }

    fn search_by_vector(&self, query: &[f32], options: &SearchOptions) -> VdbResult<Vec<Document>> {
        if options.top_k == 0 {
            return Ok(Vec::new());
        }
        let Some(collection_id) = self.existing_id()? else {
            return Ok(Vec::new());
        };
        let Some(body) = self.query(&collection_id, query, options)? else {
            return Ok(Vec::new());
        };

        let Some(candidates) = parse_query_response(&body) else {
            tracing::warn!(
                target: "strata::vdb::chroma",
                collection = %self.collection_name,
                "Malformed query response, returning no results"
            );
            return Ok(Vec::new());
        };
        let results = rank(candidates, options.score_threshold, options.top_k);

        tracing::debug!(
            target: "strata::vdb::chroma",
            collection = %self.collection_name,
            results = results.len(),
            "Vector search complete"
        );
        Ok(results)
    }

    fn search_by_full_text(&self, _query: &str, _options: &SearchOptions) -> VdbResult<Vec<Document>> {
        tracing::warn!(
            target: "strata::vdb::chroma",
            collection = %self.collection_name,
            "Full-text search not supported by chroma, returning no results"
        );
        Ok(Vec::new())
    }
}
