//! Shared helpers for the contract suites

#![allow(dead_code)]

use std::sync::Arc;
use strata_vdb::backends::testing::RecordingTransport;
use strata_vdb::{
    ChromaVector, Coordination, DistanceMetric, Document, MemoryEngine, MemoryVector,
    QdrantVector,
};

pub const COLLECTION: &str = "vector_index_contract_node";
pub const CHROMA_COLLECTIONS: &str =
    "/api/v2/tenants/default_tenant/databases/default_database/collections";

pub fn memory_store() -> MemoryVector {
    MemoryVector::new(
        COLLECTION,
        MemoryEngine::new(),
        DistanceMetric::Cosine,
        &Coordination::in_memory(),
    )
}

pub fn chroma_store() -> (ChromaVector, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let store = ChromaVector::with_transport(
        COLLECTION,
        "default_tenant",
        "default_database",
        transport.clone(),
        Coordination::in_memory().provisioner(),
    );
    (store, transport)
}

pub fn qdrant_store() -> (QdrantVector, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let store = QdrantVector::with_transport(
        COLLECTION,
        transport.clone(),
        Coordination::in_memory().provisioner(),
    );
    (store, transport)
}

pub fn chroma_path(suffix: &str) -> String {
    format!("{}{}", CHROMA_COLLECTIONS, suffix)
}

pub fn qdrant_path(suffix: &str) -> String {
    format!("/collections/{}{}", COLLECTION, suffix)
}

/// Document with an explicit id and `document_id`
pub fn doc(id: &str, text: &str, document_id: &str) -> Document {
    Document::new(text)
        .with_doc_id(id)
        .with_metadata("document_id", document_id)
}

pub fn texts(docs: &[Document]) -> Vec<&str> {
    docs.iter().map(|d| d.page_content.as_str()).collect()
}

pub fn scores(docs: &[Document]) -> Vec<f64> {
    docs.iter()
        .map(|d| d.score().expect("every hit carries a score"))
        .collect()
}

/// Length bound, strict threshold, descending order
pub fn assert_ranked(results: &[Document], top_k: usize, threshold: f64) {
    assert!(results.len() <= top_k, "{} hits > top_k {}", results.len(), top_k);
    let scores = scores(results);
    for s in &scores {
        assert!(*s > threshold, "score {} not above threshold {}", s, threshold);
    }
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1], "scores not descending: {:?}", scores);
    }
}
