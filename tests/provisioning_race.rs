//! Provisioning races through the full adapter stack
//!
//! N threads call `create` on independent adapter instances for one
//! collection. Exactly one backend get-or-create must happen, the existence
//! cache must be written once, and the provisioning lock must never be held
//! by two callers at the same time.
//!
//! ```bash
//! cargo test --test provisioning_race
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use serde_json::json;
use strata_vdb::backends::testing::RecordingTransport;
use strata_vdb::backends::Method;
use strata_vdb::{
    cache_key, ChromaVector, Coordination, DistanceMetric, Document, ExistenceCache, LockGuard,
    LockProvider, MemoryEngine, MemoryExistenceCache, MemoryLockProvider, MemoryVector,
    ProvisioningPolicy, VdbError, VdbResult, VectorStore,
};
use tempfile::TempDir;

const THREADS: usize = 16;
const COLLECTION: &str = "vector_index_race_node";

// ============================================================================
// Instrumented coordination
// ============================================================================

#[derive(Default)]
struct CountingCache {
    inner: MemoryExistenceCache,
    sets: AtomicUsize,
}

impl ExistenceCache for CountingCache {
    fn get(&self, key: &str) -> VdbResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> VdbResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, ttl)
    }

    fn delete(&self, key: &str) -> VdbResult<()> {
        self.inner.delete(key)
    }
}

/// Lock provider recording how many callers hold a lock at once
struct WatchedLocks {
    inner: MemoryLockProvider,
    holders: Arc<AtomicUsize>,
    max_holders: Arc<AtomicUsize>,
}

impl WatchedLocks {
    fn new() -> Self {
        WatchedLocks {
            inner: MemoryLockProvider::new(Duration::from_secs(20)),
            holders: Arc::new(AtomicUsize::new(0)),
            max_holders: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl LockProvider for WatchedLocks {
    fn acquire(&self, name: &str, ttl: Duration) -> VdbResult<LockGuard> {
        let inner = self.inner.acquire(name, ttl)?;
        let now = self.holders.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_holders.fetch_max(now, Ordering::SeqCst);
        let holders = Arc::clone(&self.holders);
        Ok(LockGuard::new(name, move || {
            holders.fetch_sub(1, Ordering::SeqCst);
            drop(inner);
        }))
    }
}

fn instrumented() -> (Coordination, Arc<CountingCache>, Arc<WatchedLocks>) {
    let cache = Arc::new(CountingCache::default());
    let locks = Arc::new(WatchedLocks::new());
    let coordination = Coordination::new(
        cache.clone(),
        locks.clone(),
        ProvisioningPolicy::default(),
    );
    (coordination, cache, locks)
}

/// Run `create` from `THREADS` threads, one adapter each
fn race<F>(make_store: F) -> Vec<VdbResult<Vec<String>>>
where
    F: Fn(usize) -> Box<dyn VectorStore>,
{
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let store = make_store(i);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let doc = Document::new(format!("text {}", i)).with_doc_id(format!("id-{}", i));
                store.create(&[doc], &[vec![1.0, i as f32]])
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

// ============================================================================
// Memory backend
// ============================================================================

#[test]
fn memory_single_backend_create() {
    let engine = MemoryEngine::new();
    let (coordination, cache, locks) = instrumented();

    let results = race(|_| {
        Box::new(MemoryVector::new(
            COLLECTION,
            engine.clone(),
            DistanceMetric::Cosine,
            &coordination,
        ))
    });

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(engine.create_calls(), 1, "exactly one get-or-create");
    assert_eq!(cache.sets.load(Ordering::SeqCst), 1, "cache written once");
    assert_eq!(locks.max_holders.load(Ordering::SeqCst), 1, "lock never shared");
    assert_eq!(locks.holders.load(Ordering::SeqCst), 0, "every guard released");
    assert_eq!(engine.len(COLLECTION), THREADS);
    assert!(cache.get(&cache_key(COLLECTION)).unwrap().is_some());
}

#[test]
fn memory_distinct_collections_do_not_share_provisioning() {
    let engine = MemoryEngine::new();
    let (coordination, cache, _) = instrumented();

    let results = race(|i| {
        Box::new(MemoryVector::new(
            format!("collection_{}", i % 4),
            engine.clone(),
            DistanceMetric::Cosine,
            &coordination,
        ))
    });

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(engine.create_calls(), 4);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 4);
}

// ============================================================================
// Chroma adapter against the scripted engine
// ============================================================================

#[test]
fn chroma_single_get_or_create_request() {
    let collections = "/api/v2/tenants/default_tenant/databases/default_database/collections";
    let transport = Arc::new(RecordingTransport::new());
    transport.respond(Method::Post, collections, 200, json!({"id": "c-1"}));
    transport.respond(
        Method::Post,
        &format!("{}/c-1/upsert", collections),
        200,
        json!(true),
    );
    let (coordination, cache, locks) = instrumented();

    let results = race(|_| {
        Box::new(ChromaVector::with_transport(
            COLLECTION,
            "default_tenant",
            "default_database",
            transport.clone(),
            coordination.provisioner(),
        ))
    });

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(transport.count(Method::Post, collections), 1);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 1);
    assert_eq!(locks.max_holders.load(Ordering::SeqCst), 1);
}

// ============================================================================
// File-backed coordination (one handle per simulated process)
// ============================================================================

#[test]
fn file_coordination_single_create_across_handles() {
    let dir = TempDir::new().unwrap();
    let engine = MemoryEngine::new();
    let policy = ProvisioningPolicy::default();

    let results = race(|_| {
        let coordination = Coordination::file_backed(dir.path(), policy).unwrap();
        Box::new(MemoryVector::new(
            COLLECTION,
            engine.clone(),
            DistanceMetric::Cosine,
            &coordination,
        ))
    });

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(engine.create_calls(), 1);
    assert_eq!(engine.len(COLLECTION), THREADS);
}

// ============================================================================
// Lock wait exhaustion
// ============================================================================

#[test]
fn held_lock_times_out_provisioning() {
    let locks = MemoryLockProvider::new(Duration::from_millis(50));
    let coordination = Coordination::new(
        Arc::new(MemoryExistenceCache::new()),
        Arc::new(locks.clone()),
        ProvisioningPolicy::default(),
    );
    let _held = locks
        .acquire(
            &strata_vdb::lock_name(COLLECTION),
            Duration::from_secs(20),
        )
        .unwrap();

    let engine = MemoryEngine::new();
    let store = MemoryVector::new(COLLECTION, engine.clone(), DistanceMetric::Cosine, &coordination);
    let err = store
        .create(&[Document::new("x")], &[vec![1.0]])
        .unwrap_err();

    assert!(matches!(err, VdbError::ProvisioningTimeout { .. }));
    assert!(err.is_retryable());
    assert_eq!(engine.create_calls(), 0);
    assert!(!engine.has_collection(COLLECTION));
}
