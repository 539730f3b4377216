//! Embedded in-process vector engine
//!
//! A [`MemoryEngine`] is a cheap-to-clone handle on a shared set of named
//! collections. Search is exact brute force: every entry passing the filters
//! is scored, then the best `k` are kept. Iteration is in id order, so
//! results are deterministic (ties broken by id ascending).

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strata_vdb_core::{
    DistanceMetric, Document, Embedding, Metadata, MetadataFilter, VdbError, VdbResult,
};

use super::distance::compute_similarity;
use super::text::Bm25;

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    metadata: Metadata,
    embedding: Embedding,
}

#[derive(Debug)]
struct Collection {
    dimension: usize,
    metric: DistanceMetric,
    entries: BTreeMap<String, Entry>,
}

impl Collection {
    fn visible<'a>(
        &'a self,
        filters: &'a [MetadataFilter],
    ) -> impl Iterator<Item = (&'a String, &'a Entry)> + 'a {
        self.entries
            .iter()
            .filter(move |(_, e)| filters.iter().all(|f| f.matches(&e.metadata)))
    }
}

fn top_k(mut scored: Vec<(String, Document, f32)>, k: usize) -> Vec<(Document, f32)> {
    // Score desc, then id asc
    scored.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(k);
    scored.into_iter().map(|(_, d, s)| (d, s)).collect()
}

/// Shared in-process engine
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    create_calls: Arc<AtomicUsize>,
}

impl MemoryEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `name` unless it exists; returns `true` if created
    ///
    /// Every call counts toward [`create_calls`](Self::create_calls).
    pub fn get_or_create_collection(
        &self,
        name: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> bool {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return false;
        }
        collections.insert(
            name.to_string(),
            Collection {
                dimension,
                metric,
                entries: BTreeMap::new(),
            },
        );
        true
    }

    /// Number of get-or-create calls received
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Whether `name` exists
    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.read().contains_key(name)
    }

    /// Drop `name`; returns `true` if it existed
    pub fn drop_collection(&self, name: &str) -> bool {
        self.collections.write().remove(name).is_some()
    }

    /// Number of entries in `name` (0 if absent)
    pub fn len(&self, name: &str) -> usize {
        self.collections
            .read()
            .get(name)
            .map_or(0, |c| c.entries.len())
    }

    /// Whether `name` has no entries (or doesn't exist)
    pub fn is_empty(&self, name: &str) -> bool {
        self.len(name) == 0
    }

    /// Insert or replace entries
    ///
    /// Creates the collection on first write, sized by the batch. The whole
    /// batch is checked before anything is written.
    pub fn upsert(
        &self,
        name: &str,
        metric: DistanceMetric,
        ids: &[String],
        documents: &[Document],
        embeddings: &[Embedding],
    ) -> VdbResult<()> {
        let mut collections = self.collections.write();
        let dimension = embeddings.first().map_or(0, Vec::len);
        let collection = collections.entry(name.to_string()).or_insert_with(|| Collection {
            dimension,
            metric,
            entries: BTreeMap::new(),
        });

        if let Some(bad) = embeddings.iter().find(|e| e.len() != collection.dimension) {
            return Err(VdbError::DimensionMismatch {
                expected: collection.dimension,
                got: bad.len(),
            });
        }

        for ((id, doc), embedding) in ids.iter().zip(documents).zip(embeddings) {
            collection.entries.insert(
                id.clone(),
                Entry {
                    text: doc.page_content.clone(),
                    metadata: doc.metadata.clone(),
                    embedding: embedding.clone(),
                },
            );
        }
        Ok(())
    }

    /// Whether `id` is present in `name`
    pub fn contains(&self, name: &str, id: &str) -> bool {
        self.collections
            .read()
            .get(name)
            .is_some_and(|c| c.entries.contains_key(id))
    }

    /// Remove ids; returns how many existed
    pub fn delete_ids(&self, name: &str, ids: &[String]) -> usize {
        let mut collections = self.collections.write();
        let Some(collection) = collections.get_mut(name) else {
            return 0;
        };
        ids.iter()
            .filter(|id| collection.entries.remove(id.as_str()).is_some())
            .count()
    }

    /// Remove entries whose metadata `key` is the string `value`
    pub fn delete_where(&self, name: &str, key: &str, value: &str) -> usize {
        let mut collections = self.collections.write();
        let Some(collection) = collections.get_mut(name) else {
            return 0;
        };
        let before = collection.entries.len();
        collection
            .entries
            .retain(|_, e| e.metadata.get(key).and_then(|v| v.as_str()) != Some(value));
        before - collection.entries.len()
    }

    /// Nearest neighbors by the collection's metric
    ///
    /// Returns up to `k` documents with their similarity (higher = closer),
    /// best first. A query of the wrong dimension is an error.
    pub fn search(
        &self,
        name: &str,
        query: &[f32],
        k: usize,
        filters: &[MetadataFilter],
    ) -> VdbResult<Vec<(Document, f32)>> {
        let collections = self.collections.read();
        let Some(collection) = collections.get(name) else {
            return Ok(Vec::new());
        };
        if query.len() != collection.dimension {
            return Err(VdbError::DimensionMismatch {
                expected: collection.dimension,
                got: query.len(),
            });
        }

        let scored = collection
            .visible(filters)
            .map(|(id, e)| {
                let score = compute_similarity(query, &e.embedding, collection.metric);
                (id.clone(), to_document(e), score)
            })
            .collect();
        Ok(top_k(scored, k))
    }

    /// BM25 search over page content
    ///
    /// Returns up to `k` documents with a positive score, best first.
    pub fn full_text(
        &self,
        name: &str,
        query: &str,
        k: usize,
        filters: &[MetadataFilter],
    ) -> Vec<(Document, f32)> {
        let collections = self.collections.read();
        let Some(collection) = collections.get(name) else {
            return Vec::new();
        };

        let visible: Vec<(&String, &Entry)> = collection.visible(filters).collect();
        let texts: Vec<&str> = visible.iter().map(|(_, e)| e.text.as_str()).collect();
        let scores = Bm25::default().score_all(query, &texts);

        let scored = visible
            .into_iter()
            .zip(scores)
            .filter(|(_, s)| *s > 0.0)
            .map(|((id, e), s)| (id.clone(), to_document(e), s))
            .collect();
        top_k(scored, k)
    }
}

fn to_document(entry: &Entry) -> Document {
    Document {
        page_content: entry.text.clone(),
        metadata: entry.metadata.clone(),
    }
}
