//! Coordination layer for strata-vdb
//!
//! This crate makes collection provisioning safe under concurrent callers:
//! - ExistenceCache: shared key/value store with per-entry expiry
//! - LockProvider / LockGuard: named, TTL-bound locks released on drop
//! - CollectionProvisioner: lock, check cache, create, cache, release
//!
//! Cache and lock handles are injected into adapters through
//! [`Coordination`]; nothing here is global.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod lock;
pub mod provision;

pub use cache::{ExistenceCache, FileExistenceCache, MemoryExistenceCache};
pub use lock::{FileLockProvider, LockGuard, LockProvider, MemoryLockProvider, DEFAULT_LOCK_WAIT};
pub use provision::{cache_key, lock_name, CollectionProvisioner, ProvisioningPolicy};

use std::path::Path;
use std::sync::Arc;
use strata_vdb_core::VdbResult;

/// Cache and lock handles shared by every adapter in a process
#[derive(Clone)]
pub struct Coordination {
    /// Existence cache
    pub cache: Arc<dyn ExistenceCache>,
    /// Named lock provider
    pub locks: Arc<dyn LockProvider>,
    /// Provisioning timings
    pub policy: ProvisioningPolicy,
}

impl std::fmt::Debug for Coordination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordination")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Coordination {
    /// Bundle explicit handles
    pub fn new(
        cache: Arc<dyn ExistenceCache>,
        locks: Arc<dyn LockProvider>,
        policy: ProvisioningPolicy,
    ) -> Self {
        Coordination {
            cache,
            locks,
            policy,
        }
    }

    /// Process-local cache and locks with default timings
    pub fn in_memory() -> Self {
        Self::in_memory_with(ProvisioningPolicy::default())
    }

    /// Process-local cache and locks
    pub fn in_memory_with(policy: ProvisioningPolicy) -> Self {
        Coordination {
            cache: Arc::new(MemoryExistenceCache::new()),
            locks: Arc::new(MemoryLockProvider::new(policy.lock_wait)),
            policy,
        }
    }

    /// Cache and locks shared through a directory
    ///
    /// Entries live in `<dir>/cache`, lock files in `<dir>/locks`.
    pub fn file_backed(dir: impl AsRef<Path>, policy: ProvisioningPolicy) -> VdbResult<Self> {
        let dir = dir.as_ref();
        Ok(Coordination {
            cache: Arc::new(FileExistenceCache::open(dir.join("cache"))?),
            locks: Arc::new(FileLockProvider::open(dir.join("locks"), policy.lock_wait)?),
            policy,
        })
    }

    /// Provisioner over these handles
    pub fn provisioner(&self) -> CollectionProvisioner {
        CollectionProvisioner::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.locks),
            self.policy,
        )
    }
}

impl Default for Coordination {
    fn default() -> Self {
        Self::in_memory()
    }
}
