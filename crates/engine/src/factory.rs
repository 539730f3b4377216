//! Vector store factories
//!
//! A factory turns a [`Dataset`] into a ready-to-use [`VectorStore`]:
//! resolve the collection name (reading it from the persisted index
//! structure, or deriving and persisting it), then construct the adapter
//! from process-wide settings. Construction never touches the network.
//!
//! [`VectorFactoryRegistry`] picks the factory for a dataset: the backend
//! recorded in its index structure wins, otherwise the configured default.

use std::collections::HashMap;
use std::sync::Arc;
use strata_vdb_backends::{
    ChromaConfig, ChromaVector, MemoryEngine, MemoryVector, QdrantConfig, QdrantVector,
};
use strata_vdb_concurrency::Coordination;
use strata_vdb_core::{
    Dataset, DistanceMetric, Embeddings, IndexStruct, VdbError, VdbResult, VectorStore, VectorType,
};

use crate::config::VdbConfig;

/// Resolve the collection name for `dataset`, persisting it if new
///
/// When the dataset has an index structure, its `class_prefix` (lowercased)
/// is returned untouched, whichever backend wrote it. Otherwise the name is derived from the dataset id,
/// lowercased, and written back as `{"type": kind, "vector_store":
/// {"class_prefix": name}}`. Committing the dataset is the caller's job.
pub fn resolve_collection_name(dataset: &mut Dataset, kind: VectorType) -> VdbResult<String> {
    if let Some(name) = dataset.persisted_collection_name()? {
        return Ok(name);
    }

    let name = Dataset::gen_collection_name_by_id(&dataset.id).to_lowercase();
    dataset.set_index_struct(&IndexStruct::new(kind, name.clone()))?;
    tracing::info!(
        target: "strata::vdb::factory",
        dataset_id = %dataset.id,
        collection = %name,
        backend = kind.as_str(),
        "Collection name derived for dataset"
    );
    Ok(name)
}

/// Builds a [`VectorStore`] for a dataset
pub trait VectorFactory: Send + Sync {
    /// Backend this factory builds adapters for
    fn vector_type(&self) -> VectorType;

    /// Adapter bound to the dataset's collection
    ///
    /// May write the dataset's `index_struct` (see
    /// [`resolve_collection_name`]). `attributes` and `embeddings` are
    /// accepted for parity with the indexing pipeline; the adapters here
    /// only see precomputed vectors.
    fn init_vector(
        &self,
        dataset: &mut Dataset,
        attributes: &[String],
        embeddings: &dyn Embeddings,
    ) -> VdbResult<Box<dyn VectorStore>>;
}

/// Factory for [`ChromaVector`]
#[derive(Debug, Clone)]
pub struct ChromaVectorFactory {
    config: ChromaConfig,
    coordination: Coordination,
}

impl ChromaVectorFactory {
    /// Validates `config` up front
    pub fn new(config: ChromaConfig, coordination: Coordination) -> VdbResult<Self> {
        config.validate()?;
        Ok(ChromaVectorFactory {
            config,
            coordination,
        })
    }

    /// Connection settings
    pub fn config(&self) -> &ChromaConfig {
        &self.config
    }
}

impl VectorFactory for ChromaVectorFactory {
    fn vector_type(&self) -> VectorType {
        VectorType::Chroma
    }

    fn init_vector(
        &self,
        dataset: &mut Dataset,
        _attributes: &[String],
        _embeddings: &dyn Embeddings,
    ) -> VdbResult<Box<dyn VectorStore>> {
        let name = resolve_collection_name(dataset, VectorType::Chroma)?;
        Ok(Box::new(ChromaVector::new(
            name,
            &self.config,
            &self.coordination,
        )?))
    }
}

/// Factory for [`QdrantVector`]
#[derive(Debug, Clone)]
pub struct QdrantVectorFactory {
    config: QdrantConfig,
    coordination: Coordination,
}

impl QdrantVectorFactory {
    /// Validates `config` up front
    pub fn new(config: QdrantConfig, coordination: Coordination) -> VdbResult<Self> {
        config.validate()?;
        Ok(QdrantVectorFactory {
            config,
            coordination,
        })
    }

    /// Connection settings
    pub fn config(&self) -> &QdrantConfig {
        &self.config
    }
}

impl VectorFactory for QdrantVectorFactory {
    fn vector_type(&self) -> VectorType {
        VectorType::Qdrant
    }

    fn init_vector(
        &self,
        dataset: &mut Dataset,
        _attributes: &[String],
        _embeddings: &dyn Embeddings,
    ) -> VdbResult<Box<dyn VectorStore>> {
        let name = resolve_collection_name(dataset, VectorType::Qdrant)?;
        Ok(Box::new(QdrantVector::new(
            name,
            &self.config,
            &self.coordination,
        )?))
    }
}

/// Factory for [`MemoryVector`]
///
/// Every adapter it builds shares one [`MemoryEngine`].
#[derive(Debug, Clone)]
pub struct MemoryVectorFactory {
    engine: MemoryEngine,
    metric: DistanceMetric,
    coordination: Coordination,
}

impl MemoryVectorFactory {
    /// Factory over a fresh engine
    pub fn new(metric: DistanceMetric, coordination: Coordination) -> Self {
        Self::with_engine(MemoryEngine::new(), metric, coordination)
    }

    /// Factory over an existing engine
    pub fn with_engine(
        engine: MemoryEngine,
        metric: DistanceMetric,
        coordination: Coordination,
    ) -> Self {
        MemoryVectorFactory {
            engine,
            metric,
            coordination,
        }
    }

    /// Shared engine handle
    pub fn engine(&self) -> &MemoryEngine {
        &self.engine
    }
}

impl VectorFactory for MemoryVectorFactory {
    fn vector_type(&self) -> VectorType {
        VectorType::Memory
    }

    fn init_vector(
        &self,
        dataset: &mut Dataset,
        _attributes: &[String],
        _embeddings: &dyn Embeddings,
    ) -> VdbResult<Box<dyn VectorStore>> {
        let name = resolve_collection_name(dataset, VectorType::Memory)?;
        Ok(Box::new(MemoryVector::new(
            name,
            self.engine.clone(),
            self.metric,
            &self.coordination,
        )))
    }
}

/// Dispatches datasets to the factory of their backend
///
/// # Example
///
/// ```ignore
/// let config = VdbConfig::load(Some(Path::new("strata-vdb.toml")))?;
/// let registry = VectorFactoryRegistry::from_config(&config)?;
/// let store = registry.init_vector(&mut dataset, &[], &embeddings)?;
/// store.create(&documents, &vectors)?;
/// ```
#[derive(Clone)]
pub struct VectorFactoryRegistry {
    default_kind: VectorType,
    factories: HashMap<VectorType, Arc<dyn VectorFactory>>,
}

impl std::fmt::Debug for VectorFactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.factories.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("VectorFactoryRegistry")
            .field("default_kind", &self.default_kind)
            .field("factories", &kinds)
            .finish()
    }
}

impl VectorFactoryRegistry {
    /// Empty registry; `default_kind` serves datasets with no index structure
    pub fn new(default_kind: VectorType) -> Self {
        VectorFactoryRegistry {
            default_kind,
            factories: HashMap::new(),
        }
    }

    /// Registry with a factory per backend, sharing one coordination bundle
    ///
    /// Fails with [`VdbError::Configuration`] on any invalid setting.
    pub fn from_config(config: &VdbConfig) -> VdbResult<Self> {
        config.validate()?;
        let coordination = config.coordination()?;
        let mut registry = Self::new(config.vector_type()?);
        registry.register(Arc::new(ChromaVectorFactory::new(
            config.chroma.to_config(),
            coordination.clone(),
        )?));
        registry.register(Arc::new(QdrantVectorFactory::new(
            config.qdrant.to_config()?,
            coordination.clone(),
        )?));
        registry.register(Arc::new(MemoryVectorFactory::new(
            config.memory_metric()?,
            coordination,
        )));
        Ok(registry)
    }

    /// Add or replace the factory for its backend
    pub fn register(&mut self, factory: Arc<dyn VectorFactory>) -> &mut Self {
        self.factories.insert(factory.vector_type(), factory);
        self
    }

    /// Backend used when a dataset has no index structure
    pub fn default_kind(&self) -> VectorType {
        self.default_kind
    }

    /// Factory registered for `kind`
    pub fn factory(&self, kind: VectorType) -> Option<&Arc<dyn VectorFactory>> {
        self.factories.get(&kind)
    }

    /// Backend a dataset resolves to
    pub fn kind_for(&self, dataset: &Dataset) -> VdbResult<VectorType> {
        Ok(dataset
            .index_struct_dict()?
            .map_or(self.default_kind, |s| s.kind))
    }

    /// Adapter for `dataset` on the backend it resolves to
    pub fn init_vector(
        &self,
        dataset: &mut Dataset,
        attributes: &[String],
        embeddings: &dyn Embeddings,
    ) -> VdbResult<Box<dyn VectorStore>> {
        let kind = self.kind_for(dataset)?;
        let factory = self.factory(kind).ok_or_else(|| {
            VdbError::configuration(format!("no vector factory registered for '{}'", kind))
        })?;
        tracing::debug!(
            target: "strata::vdb::factory",
            dataset_id = %dataset.id,
            backend = kind.as_str(),
            "Initializing vector store"
        );
        factory.init_vector(dataset, attributes, embeddings)
    }
}
