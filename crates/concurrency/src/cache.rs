//! Existence cache: key/value store with per-entry expiry
//!
//! Used by provisioning to remember "this collection already exists" for an
//! hour so repeated `create` calls skip the engine round-trip.
//!
//! Two implementations:
//! - [`MemoryExistenceCache`]: process-local, `DashMap` backed
//! - [`FileExistenceCache`]: one file per key in a shared directory, visible
//!   to every process that points at the same directory

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use strata_vdb_core::{VdbError, VdbResult};

/// Shared key/value store with expiry
pub trait ExistenceCache: Send + Sync {
    /// Value for `key`, or `None` if absent or expired
    fn get(&self, key: &str) -> VdbResult<Option<String>>;

    /// Store `value` under `key` for `ttl`
    fn set(&self, key: &str, value: &str, ttl: Duration) -> VdbResult<()>;

    /// Remove `key`; absent keys are not an error
    fn delete(&self, key: &str) -> VdbResult<()>;
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// Process-local existence cache
///
/// Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemoryExistenceCache {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryExistenceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    /// Check if there are no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExistenceCache for MemoryExistenceCache {
    fn get(&self, key: &str) -> VdbResult<Option<String>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }
        // Drop the expired entry (guard released above)
        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        Ok(None)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> VdbResult<()> {
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> VdbResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// ============================================================================
// File-backed
// ============================================================================

/// On-disk entry format
#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    value: String,
    /// Wall-clock expiry (milliseconds since Unix epoch)
    expires_at_ms: i64,
}

/// Existence cache shared between processes through a directory
///
/// Each key maps to `<dir>/<sanitized key>.json`. Writes go through a
/// temporary file and a rename so readers never see a partial entry.
/// Expiry uses wall-clock time, so hosts sharing the directory need roughly
/// synchronized clocks.
#[derive(Debug, Clone)]
pub struct FileExistenceCache {
    dir: PathBuf,
}

impl FileExistenceCache {
    /// Open (and create if needed) a cache directory
    pub fn open(dir: impl AsRef<Path>) -> VdbResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(FileExistenceCache { dir })
    }

    /// Directory backing this cache
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Map a key to a safe file name
pub(crate) fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl ExistenceCache for FileExistenceCache {
    fn get(&self, key: &str) -> VdbResult<Option<String>> {
        let path = self.entry_path(key);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: FileEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    target: "strata::vdb::cache",
                    path = %path.display(),
                    error = %e,
                    "Unreadable cache entry treated as absent"
                );
                return Ok(None);
            }
        };
        if entry.expires_at_ms <= Utc::now().timestamp_millis() {
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> VdbResult<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = FileEntry {
            value: value.to_string(),
            expires_at_ms: Utc::now().timestamp_millis().saturating_add(ttl_ms),
        };
        let path = self.entry_path(key);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", sanitize_key(key), uuid::Uuid::new_v4()));
        std::fs::write(&tmp, serde_json::to_vec(&entry)?)?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            VdbError::Cache(format!("failed to commit entry '{}': {}", key, e))
        })
    }

    fn delete(&self, key: &str) -> VdbResult<()> {
        match std::fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
