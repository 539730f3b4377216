//! The vector store contract
//!
//! [`VectorStore`] is the single interface orchestration code sees. Each
//! engine gets one implementation (an adapter); factories hand out
//! `Box<dyn VectorStore>` so callers never name a concrete engine.
//!
//! # Thread Safety
//!
//! All operations are synchronous and may block on network I/O. Adapters are
//! `Send + Sync` and hold nothing but a connection handle plus injected
//! cache/lock handles, so one instance may be shared across threads.

use crate::document::{Document, Embedding, DOCUMENT_ID_KEY};
use crate::error::VdbResult;
use crate::filter::MetadataFilter;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of candidates requested from an engine
pub const DEFAULT_TOP_K: usize = 4;

/// Backend engine identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorType {
    /// Chroma over its REST API
    Chroma,
    /// Qdrant over its REST API
    Qdrant,
    /// Embedded in-process engine
    Memory,
}

impl VectorType {
    /// Identifier used in persisted index structures and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorType::Chroma => "chroma",
            VectorType::Qdrant => "qdrant",
            VectorType::Memory => "memory",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chroma" => Some(VectorType::Chroma),
            "qdrant" => Some(VectorType::Qdrant),
            "memory" => Some(VectorType::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for VectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for `search_by_vector` and `search_by_full_text`
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Maximum candidates requested from the engine
    pub top_k: usize,
    /// Results must score strictly above this
    pub score_threshold: f64,
    /// Restrict candidates to these logical document ids
    ///
    /// `None` or an empty list means no restriction.
    pub document_ids_filter: Option<Vec<String>>,
    /// Additional metadata conditions
    pub filter: Option<MetadataFilter>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            top_k: DEFAULT_TOP_K,
            score_threshold: 0.0,
            document_ids_filter: None,
            filter: None,
        }
    }
}

impl SearchOptions {
    /// Options with the given `top_k` and default threshold
    pub fn new(top_k: usize) -> Self {
        SearchOptions {
            top_k,
            ..Default::default()
        }
    }

    /// Builder: set score threshold
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Builder: restrict to logical document ids
    pub fn with_document_ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.document_ids_filter = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Builder: add metadata conditions
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Document id restriction, if non-empty
    pub fn document_ids(&self) -> Option<&[String]> {
        self.document_ids_filter
            .as_deref()
            .filter(|ids| !ids.is_empty())
    }

    /// All conditions an engine must apply, as a list of AND-ed filters
    ///
    /// The document id restriction becomes an in-set condition on
    /// `document_id`; the caller's filter (which may itself be an OR) follows.
    pub fn effective_filters(&self) -> Vec<MetadataFilter> {
        let mut filters = Vec::new();
        if let Some(ids) = self.document_ids() {
            filters.push(MetadataFilter::new().is_in(DOCUMENT_ID_KEY, ids.iter().map(String::as_str)));
        }
        if let Some(filter) = self.filter.as_ref().filter(|f| !f.is_empty()) {
            filters.push(filter.clone());
        }
        filters
    }
}

/// Uniform contract over vector engines
pub trait VectorStore: Send + Sync {
    /// Engine identifier (dispatch and logging)
    fn vector_type(&self) -> VectorType;

    /// Name of the collection this instance operates on
    fn collection_name(&self) -> &str;

    /// Ensure the collection exists
    ///
    /// Goes through the provisioning critical section: named lock, existence
    /// cache check, engine get-or-create, cache write. `dimension` is the
    /// embedding width of the first batch; engines that infer it ignore it.
    fn create_collection(&self, dimension: usize) -> VdbResult<()>;

    /// Provision the collection and index the documents
    ///
    /// No-op when `documents` is empty. Returns the assigned ids.
    fn create(&self, documents: &[Document], embeddings: &[Embedding]) -> VdbResult<Vec<String>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let dimension = crate::document::check_aligned(documents, embeddings)?;
        self.create_collection(dimension)?;
        self.add_texts(documents, embeddings)
    }

    /// Upsert documents with their embeddings
    ///
    /// Ids come from `metadata.doc_id` when present, otherwise they are
    /// generated. Re-adding an id replaces its content. Returns the ids in
    /// input order.
    fn add_texts(&self, documents: &[Document], embeddings: &[Embedding]) -> VdbResult<Vec<String>>;

    /// Whether an entry with this id exists
    fn text_exists(&self, id: &str) -> VdbResult<bool>;

    /// Remove entries by id; absent ids are ignored
    fn delete_by_ids(&self, ids: &[String]) -> VdbResult<()>;

    /// Remove every entry whose metadata `key` equals `value`
    fn delete_by_metadata_field(&self, key: &str, value: &str) -> VdbResult<()>;

    /// Drop the whole collection
    fn delete(&self) -> VdbResult<()>;

    /// Nearest-neighbor search
    ///
    /// Returns at most `top_k` documents, each with `metadata.score` strictly
    /// above the threshold, ordered by score descending.
    fn search_by_vector(&self, query: &[f32], options: &SearchOptions) -> VdbResult<Vec<Document>>;

    /// Lexical search
    ///
    /// Engines without lexical search return an empty list.
    fn search_by_full_text(&self, query: &str, options: &SearchOptions)
        -> VdbResult<Vec<Document>>;
}

/// Embedding model collaborator
///
/// Factories receive one for parity with the indexing pipeline; adapters in
/// this crate only ever see precomputed vectors.
pub trait Embeddings: Send + Sync {
    /// Embed a batch of texts
    fn embed_documents(&self, texts: &[String]) -> VdbResult<Vec<Embedding>>;

    /// Embed a single query
    fn embed_query(&self, text: &str) -> VdbResult<Embedding>;
}
