//! Wiring layer for strata-vdb
//!
//! This crate turns process-wide settings into vector stores:
//! - VdbConfig: `strata-vdb.toml` plus environment overrides
//! - VectorFactory: one per backend, builds an adapter for a dataset
//! - VectorFactoryRegistry: picks the factory from the dataset's persisted
//!   backend, else the configured default
//!
//! It is the only component that knows about every backend at once.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod factory;

pub use config::{
    ChromaSection, CoordinationSection, MemorySection, ProvisioningSection, QdrantSection,
    VdbConfig, CONFIG_FILE_NAME,
};
pub use factory::{
    resolve_collection_name, ChromaVectorFactory, MemoryVectorFactory, QdrantVectorFactory,
    VectorFactory, VectorFactoryRegistry,
};
