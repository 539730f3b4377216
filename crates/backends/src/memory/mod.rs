//! In-process backend
//!
//! [`MemoryVector`] adapts a shared [`MemoryEngine`] to the vector store
//! contract. Unlike the remote engines it supports every operation natively,
//! including filters and full-text search (BM25), which makes it the
//! reference backend for contract tests.

pub mod distance;
pub mod engine;
pub mod text;

pub use engine::MemoryEngine;

use strata_vdb_concurrency::{CollectionProvisioner, Coordination};
use strata_vdb_core::{
    assign_ids, check_aligned, rank, Candidate, DistanceMetric, Document, Embedding,
    SearchOptions, VdbResult, VectorStore, VectorType,
};

/// Vector store backed by the in-process engine
///
/// # Thread Safety
///
/// `Send + Sync`. The engine serializes writers per process with a
/// `RwLock`; readers run concurrently.
#[derive(Debug, Clone)]
pub struct MemoryVector {
    collection_name: String,
    engine: MemoryEngine,
    metric: DistanceMetric,
    provisioner: CollectionProvisioner,
}

impl MemoryVector {
    /// Adapter for `collection_name` on `engine`
    pub fn new(
        collection_name: impl Into<String>,
        engine: MemoryEngine,
        metric: DistanceMetric,
        coordination: &Coordination,
    ) -> Self {
        Self::with_provisioner(collection_name, engine, metric, coordination.provisioner())
    }

    /// Adapter with an explicit provisioner
    pub fn with_provisioner(
        collection_name: impl Into<String>,
        engine: MemoryEngine,
        metric: DistanceMetric,
        provisioner: CollectionProvisioner,
    ) -> Self {
        MemoryVector {
            collection_name: collection_name.into(),
            engine,
            metric,
            provisioner,
        }
    }

    /// Engine handle
    pub fn engine(&self) -> &MemoryEngine {
        &self.engine
    }

    /// Metric used for new collections
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

impl VectorStore for MemoryVector {
    fn vector_type(&self) -> VectorType {
        VectorType::Memory
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    fn create_collection(&self, dimension: usize) -> VdbResult<()> {
        self.provisioner.ensure(&self.collection_name, || {
            self.engine
                .get_or_create_collection(&self.collection_name, dimension, self.metric);
            Ok(())
        })?;
        Ok(())
    }

    fn add_texts(&self, documents: &[Document], embeddings: &[Embedding]) -> VdbResult<Vec<String>> {
        check_aligned(documents, embeddings)?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let ids = assign_ids(documents);
        self.engine
            .upsert(&self.collection_name, self.metric, &ids, documents, embeddings)?;
        Ok(ids)
    }

    fn text_exists(&self, id: &str) -> VdbResult<bool> {
        Ok(self.engine.contains(&self.collection_name, id))
    }

    fn delete_by_ids(&self, ids: &[String]) -> VdbResult<()> {
        self.engine.delete_ids(&self.collection_name, ids);
        Ok(())
    }

    fn delete_by_metadata_field(&self, key: &str, value: &str) -> VdbResult<()> {
        let removed = self.engine.delete_where(&self.collection_name, key, value);
        tracing::debug!(
            target: "strata::vdb::memory",
            collection = %self.collection_name,
            key = %key,
            removed,
            "Deleted by metadata field"
        );
        Ok(())
    }

    fn delete(&self) -> VdbResult<()> {
        if self.engine.drop_collection(&self.collection_name) {
            tracing::info!(
                target: "strata::vdb::memory",
                collection = %self.collection_name,
                "Collection dropped"
            );
        }
        self.provisioner.invalidate(&self.collection_name)
    }

    fn search_by_vector(&self, query: &[f32], options: &SearchOptions) -> VdbResult<Vec<Document>> {
        if !self.metric.is_bounded() {
            tracing::warn!(
                target: "strata::vdb::memory",
                collection = %self.collection_name,
                metric = self.metric.name(),
                "Scores are unbounded for this metric; thresholds may not be comparable"
            );
        }
        let hits = self.engine.search(
            &self.collection_name,
            query,
            options.top_k,
            &options.effective_filters(),
        )?;
        let candidates = hits
            .into_iter()
            .map(|(doc, score)| Candidate::from_similarity(doc, f64::from(score)));
        Ok(rank(candidates, options.score_threshold, options.top_k))
    }

    fn search_by_full_text(&self, query: &str, options: &SearchOptions) -> VdbResult<Vec<Document>> {
        let hits = self.engine.full_text(
            &self.collection_name,
            query,
            options.top_k,
            &options.effective_filters(),
        );
        let candidates = hits
            .into_iter()
            .map(|(doc, score)| Candidate::from_similarity(doc, f64::from(score)));
        Ok(rank(candidates, options.score_threshold, options.top_k))
    }
}
