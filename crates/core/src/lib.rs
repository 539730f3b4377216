//! Core types for strata-vdb
//!
//! This crate defines everything adapters and callers share:
//! - Document / Embedding / Metadata: indexed value types
//! - VectorStore: the uniform contract over vector engines
//! - SearchOptions / RetrievalSettings: search parameters
//! - MetadataFilter: comparison conditions on metadata fields
//! - scoring: distance-to-score conversion, strict thresholding, ranking
//! - Dataset / IndexStruct: persisted collection naming
//! - VdbError: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dataset;
pub mod document;
pub mod error;
pub mod filter;
pub mod retrieval;
pub mod scoring;
pub mod store;

pub use dataset::{Dataset, IndexStruct, VectorStoreStruct};
pub use document::{
    assign_ids, check_aligned, Document, Embedding, Metadata, DOCUMENT_ID_KEY, DOC_ID_KEY,
    SCORE_KEY,
};
pub use error::{VdbError, VdbResult};
pub use filter::{FilterCondition, JsonScalar, LogicalOp, MetadataFilter};
pub use retrieval::{RetrievalSettings, RetrieveStrategy};
pub use scoring::{rank, Candidate, DistanceMetric};
pub use store::{Embeddings, SearchOptions, VectorStore, VectorType, DEFAULT_TOP_K};
