//! strata-vdb - Vector store abstraction layer
//!
//! One contract for storing, searching and deleting embedded documents
//! across interchangeable vector engines (Chroma, Qdrant, or the embedded
//! in-process engine), with collection provisioning that stays idempotent
//! under concurrent callers.
//!
//! # Quick Start
//!
//! ```ignore
//! use strata_vdb::{Dataset, Document, SearchOptions, VdbConfig, VectorFactoryRegistry};
//!
//! let config = VdbConfig::load(Some(Path::new("strata-vdb.toml")))?;
//! let registry = VectorFactoryRegistry::from_config(&config)?;
//!
//! let mut dataset = Dataset::new(dataset_id, tenant_id);
//! let store = registry.init_vector(&mut dataset, &[], &embeddings)?;
//! // persist dataset.index_struct here
//!
//! store.create(&documents, &vectors)?;
//! let hits = store.search_by_vector(&query, &SearchOptions::new(4).with_score_threshold(0.5))?;
//! ```
//!
//! # Architecture
//!
//! - `core`: value types, the `VectorStore` trait, scoring and errors
//! - `concurrency`: existence cache, named locks, collection provisioning
//! - `backends`: one adapter per engine plus the HTTP transport
//! - `engine`: configuration and factories

pub use strata_vdb_backends as backends;
pub use strata_vdb_concurrency as concurrency;
pub use strata_vdb_core as core;
pub use strata_vdb_engine as engine;

pub use strata_vdb_backends::{
    ChromaAuthProvider, ChromaConfig, ChromaVector, MemoryEngine, MemoryVector, QdrantConfig,
    QdrantVector,
};
pub use strata_vdb_concurrency::{
    cache_key, lock_name, CollectionProvisioner, Coordination, ExistenceCache, FileExistenceCache,
    FileLockProvider, LockGuard, LockProvider, MemoryExistenceCache, MemoryLockProvider,
    ProvisioningPolicy,
};
pub use strata_vdb_core::{
    rank, Candidate, Dataset, DistanceMetric, Document, Embedding, Embeddings, FilterCondition,
    IndexStruct, JsonScalar, LogicalOp, Metadata, MetadataFilter, RetrievalSettings,
    RetrieveStrategy, SearchOptions, VdbError, VdbResult, VectorStore, VectorType, DEFAULT_TOP_K,
    DOCUMENT_ID_KEY, DOC_ID_KEY, SCORE_KEY,
};
pub use strata_vdb_engine::{
    resolve_collection_name, ChromaVectorFactory, MemoryVectorFactory, QdrantVectorFactory,
    VdbConfig, VectorFactory, VectorFactoryRegistry, CONFIG_FILE_NAME,
};
