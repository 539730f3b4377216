//! Backend adapters for strata-vdb
//!
//! One [`VectorStore`](strata_vdb_core::VectorStore) implementation per
//! engine:
//! - ChromaVector: Chroma over its v2 REST API
//! - QdrantVector: Qdrant over its REST API
//! - MemoryVector: embedded brute-force engine with BM25 full-text search
//!
//! Remote adapters speak JSON through [`HttpTransport`]; constructing one
//! never touches the network.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chroma;
pub mod memory;
pub mod qdrant;
pub mod testing;
pub mod transport;

pub use chroma::{ChromaAuthProvider, ChromaConfig, ChromaVector};
pub use memory::{MemoryEngine, MemoryVector};
pub use qdrant::{QdrantConfig, QdrantVector};
pub use transport::{HttpResponse, HttpTransport, Method, UreqTransport};
