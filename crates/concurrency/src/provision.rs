//! Idempotent collection provisioning
//!
//! Every adapter's `create_collection` funnels through
//! [`CollectionProvisioner::ensure`]:
//!
//! 1. Acquire `vector_indexing_lock_{name}` (lease TTL `lock_timeout`)
//! 2. If `vector_indexing_{name}` is cached, return
//! 3. Run the engine's get-or-create
//! 4. Cache `vector_indexing_{name}` for `cache_ttl`
//! 5. Release the lock (guard drop, on every exit path)
//!
//! With a shared cache and lock provider, N concurrent callers cause exactly
//! one engine round-trip per cache lifetime.

use std::sync::Arc;
use std::time::Duration;
use strata_vdb_core::VdbResult;

use crate::cache::ExistenceCache;
use crate::lock::LockProvider;

/// Sentinel stored under the existence key
pub const EXISTS_SENTINEL: &str = "1";

/// Existence cache key for a collection
pub fn cache_key(collection_name: &str) -> String {
    format!("vector_indexing_{}", collection_name)
}

/// Provisioning lock name for a collection
pub fn lock_name(collection_name: &str) -> String {
    format!("vector_indexing_lock_{}", collection_name)
}

/// Timing policy for provisioning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningPolicy {
    /// Lease TTL of the provisioning lock
    pub lock_timeout: Duration,
    /// How long a caller waits for a contended lock
    pub lock_wait: Duration,
    /// Lifetime of the existence cache entry
    pub cache_ttl: Duration,
}

impl Default for ProvisioningPolicy {
    fn default() -> Self {
        ProvisioningPolicy {
            lock_timeout: Duration::from_secs(20),
            lock_wait: Duration::from_secs(20),
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

/// Runs the provisioning critical section against injected cache and locks
#[derive(Clone)]
pub struct CollectionProvisioner {
    cache: Arc<dyn ExistenceCache>,
    locks: Arc<dyn LockProvider>,
    policy: ProvisioningPolicy,
}

impl std::fmt::Debug for CollectionProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionProvisioner")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CollectionProvisioner {
    /// Create a provisioner
    pub fn new(
        cache: Arc<dyn ExistenceCache>,
        locks: Arc<dyn LockProvider>,
        policy: ProvisioningPolicy,
    ) -> Self {
        CollectionProvisioner {
            cache,
            locks,
            policy,
        }
    }

    /// Timing policy in effect
    pub fn policy(&self) -> &ProvisioningPolicy {
        &self.policy
    }

    /// Make sure `collection_name` exists, calling `create` at most once
    ///
    /// Returns `true` if `create` ran, `false` on a cache hit. Errors from
    /// lock acquisition, the cache, or `create` propagate; on a `create`
    /// failure nothing is cached, so the next caller tries again.
    pub fn ensure<F>(&self, collection_name: &str, create: F) -> VdbResult<bool>
    where
        F: FnOnce() -> VdbResult<()>,
    {
        let key = cache_key(collection_name);
        let _guard = self
            .locks
            .acquire(&lock_name(collection_name), self.policy.lock_timeout)?;

        if self.cache.get(&key)?.is_some() {
            tracing::debug!(
                target: "strata::vdb::provision",
                collection = %collection_name,
                "Collection already provisioned (cache hit)"
            );
            return Ok(false);
        }

        create()?;
        self.cache
            .set(&key, EXISTS_SENTINEL, self.policy.cache_ttl)?;

        tracing::info!(
            target: "strata::vdb::provision",
            collection = %collection_name,
            ttl_secs = self.policy.cache_ttl.as_secs(),
            "Collection provisioned"
        );
        Ok(true)
    }

    /// Forget that `collection_name` exists
    pub fn invalidate(&self, collection_name: &str) -> VdbResult<()> {
        self.cache.delete(&cache_key(collection_name))?;
        tracing::debug!(
            target: "strata::vdb::provision",
            collection = %collection_name,
            "Existence cache entry cleared"
        );
        Ok(())
    }

    /// Whether `collection_name` is currently cached as existing
    pub fn is_provisioned(&self, collection_name: &str) -> VdbResult<bool> {
        Ok(self.cache.get(&cache_key(collection_name))?.is_some())
    }
}
