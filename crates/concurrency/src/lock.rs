//! Named mutual-exclusion locks
//!
//! A lock is identified by name and held through a [`LockGuard`]; dropping
//! the guard releases it, so every exit path (including `?` and panics)
//! releases deterministically.
//!
//! Two implementations:
//! - [`MemoryLockProvider`]: process-local leases with a TTL, waiters parked
//!   on a condition variable
//! - [`FileLockProvider`]: `flock`-style advisory locks on files in a shared
//!   directory, exclusive across processes on the same host/filesystem

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strata_vdb_core::{VdbError, VdbResult};

use crate::cache::sanitize_key;

/// Default time a caller waits for a contended lock
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(20);

/// Provider of named locks
pub trait LockProvider: Send + Sync {
    /// Acquire the lock `name`, holding it for at most `ttl`
    ///
    /// Blocks according to the provider's wait policy. Returns
    /// [`VdbError::ProvisioningTimeout`] when the lock stays contended past
    /// that wait.
    fn acquire(&self, name: &str, ttl: Duration) -> VdbResult<LockGuard>;
}

/// Scoped lock handle; releases on drop
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    name: String,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LockGuard {
    /// Guard that runs `release` exactly once when dropped
    pub fn new(name: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        LockGuard {
            name: name.into(),
            release: Some(Box::new(release)),
        }
    }

    /// Lock name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("name", &self.name).finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

fn timeout_error(name: &str, started: Instant) -> VdbError {
    VdbError::ProvisioningTimeout {
        lock: name.to_string(),
        waited_ms: started.elapsed().as_millis() as u64,
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Lease {
    token: u64,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct LeaseTable {
    leases: Mutex<HashMap<String, Lease>>,
    released: Condvar,
    next_token: AtomicU64,
}

/// Process-local lock provider
///
/// A lease lapses after its TTL even if the guard is still alive, so a
/// stalled holder cannot block everyone forever. Releasing a lapsed lease
/// that someone else has since taken is a no-op (tokens are compared).
#[derive(Debug, Clone)]
pub struct MemoryLockProvider {
    table: Arc<LeaseTable>,
    wait: Duration,
}

impl Default for MemoryLockProvider {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_WAIT)
    }
}

impl MemoryLockProvider {
    /// Provider whose callers wait at most `wait` for a contended lock
    pub fn new(wait: Duration) -> Self {
        MemoryLockProvider {
            table: Arc::new(LeaseTable::default()),
            wait,
        }
    }

    /// Whether `name` is currently held by an unexpired lease
    pub fn is_locked(&self, name: &str) -> bool {
        self.table
            .leases
            .lock()
            .get(name)
            .is_some_and(|l| l.expires_at > Instant::now())
    }
}

impl LockProvider for MemoryLockProvider {
    fn acquire(&self, name: &str, ttl: Duration) -> VdbResult<LockGuard> {
        let started = Instant::now();
        let deadline = started + self.wait;
        let mut leases = self.table.leases.lock();

        loop {
            let now = Instant::now();
            let holder_expiry = match leases.get(name) {
                Some(lease) if lease.expires_at > now => lease.expires_at,
                _ => {
                    let token = self.table.next_token.fetch_add(1, Ordering::Relaxed);
                    leases.insert(
                        name.to_string(),
                        Lease {
                            token,
                            expires_at: now + ttl,
                        },
                    );
                    drop(leases);

                    let table = Arc::clone(&self.table);
                    let key = name.to_string();
                    return Ok(LockGuard::new(name, move || {
                        let mut leases = table.leases.lock();
                        if leases.get(&key).map(|l| l.token) == Some(token) {
                            leases.remove(&key);
                        }
                        drop(leases);
                        table.released.notify_all();
                    }));
                }
            };

            if now >= deadline {
                return Err(timeout_error(name, started));
            }
            // Wake on release, on holder expiry, or at our own deadline
            self.table
                .released
                .wait_until(&mut leases, deadline.min(holder_expiry));
        }
    }
}

// ============================================================================
// File-backed
// ============================================================================

/// Cross-process lock provider using advisory file locks
///
/// Each lock name maps to `<dir>/<sanitized name>.lock`. The OS drops the
/// lock when the holding process exits, which stands in for the TTL: the
/// `ttl` argument is accepted but not enforced.
#[derive(Debug, Clone)]
pub struct FileLockProvider {
    dir: PathBuf,
    wait: Duration,
    poll_interval: Duration,
}

impl FileLockProvider {
    /// Open (and create if needed) a lock directory
    pub fn open(dir: impl AsRef<Path>, wait: Duration) -> VdbResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(FileLockProvider {
            dir,
            wait,
            poll_interval: Duration::from_millis(10),
        })
    }

    /// Builder: how often a contended lock is retried
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", sanitize_key(name)))
    }
}

impl LockProvider for FileLockProvider {
    fn acquire(&self, name: &str, _ttl: Duration) -> VdbResult<LockGuard> {
        let started = Instant::now();
        let deadline = started + self.wait;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.lock_path(name))
            .map_err(|e| VdbError::Lock(format!("failed to open lock file for '{}': {}", name, e)))?;

        loop {
            match fs2::FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    return Ok(LockGuard::new(name, move || release_file(file)));
                }
                Err(_) if Instant::now() >= deadline => {
                    return Err(timeout_error(name, started));
                }
                Err(_) => std::thread::sleep(self.poll_interval),
            }
        }
    }
}

fn release_file(file: File) {
    if let Err(e) = fs2::FileExt::unlock(&file) {
        tracing::warn!(target: "strata::vdb::lock", error = %e, "Failed to unlock lock file");
    }
}
