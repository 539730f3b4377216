//! Process-wide configuration via `strata-vdb.toml`
//!
//! Settings are read from a TOML file, then environment variables override
//! individual fields, then the whole thing is validated. Every section is
//! optional; a missing file means all defaults.
//!
//! Recognized environment variables: `VDB_VECTOR_STORE`, `CHROMA_HOST`,
//! `CHROMA_PORT`, `CHROMA_TENANT`, `CHROMA_DATABASE`, `CHROMA_AUTH_PROVIDER`,
//! `CHROMA_AUTH_CREDENTIALS`, `QDRANT_URL`, `QDRANT_API_KEY`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use strata_vdb_backends::{ChromaConfig, QdrantConfig};
use strata_vdb_concurrency::{Coordination, ProvisioningPolicy};
use strata_vdb_core::{DistanceMetric, VdbError, VdbResult, VectorType};

/// Config file name
pub const CONFIG_FILE_NAME: &str = "strata-vdb.toml";

/// `[chroma]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaSection {
    /// Server host
    pub host: String,
    /// Server port (default 8000)
    pub port: u16,
    /// Tenant (default `default_tenant`)
    pub tenant: String,
    /// Database (default `default_database`)
    pub database: String,
    /// `token` or `basic`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<String>,
    /// Credentials for the auth provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_credentials: Option<String>,
    /// Use https
    pub ssl: bool,
    /// Request timeout in milliseconds (default 30000)
    pub timeout_ms: u64,
}

impl Default for ChromaSection {
    fn default() -> Self {
        let d = ChromaConfig::default();
        ChromaSection {
            host: d.host,
            port: d.port,
            tenant: d.tenant,
            database: d.database,
            auth_provider: None,
            auth_credentials: None,
            ssl: d.ssl,
            timeout_ms: d.timeout.as_millis() as u64,
        }
    }
}

impl ChromaSection {
    /// Adapter settings
    pub fn to_config(&self) -> ChromaConfig {
        ChromaConfig {
            host: self.host.clone(),
            port: self.port,
            tenant: self.tenant.clone(),
            database: self.database.clone(),
            auth_provider: self.auth_provider.clone(),
            auth_credentials: self.auth_credentials.clone(),
            ssl: self.ssl,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// `[qdrant]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantSection {
    /// Server URL (default `http://localhost:6333`)
    pub url: String,
    /// API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in milliseconds (default 20000)
    pub timeout_ms: u64,
    /// Distance for new collections: `cosine`, `euclidean` or `dot_product`
    pub distance: String,
}

impl Default for QdrantSection {
    fn default() -> Self {
        let d = QdrantConfig::default();
        QdrantSection {
            url: d.url,
            api_key: None,
            timeout_ms: d.timeout.as_millis() as u64,
            distance: d.metric.name().to_string(),
        }
    }
}

impl QdrantSection {
    /// Adapter settings
    pub fn to_config(&self) -> VdbResult<QdrantConfig> {
        Ok(QdrantConfig {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            metric: parse_metric("qdrant.distance", &self.distance)?,
        })
    }
}

/// `[memory]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    /// Similarity metric: `cosine`, `euclidean` or `dot_product`
    pub metric: String,
}

impl Default for MemorySection {
    fn default() -> Self {
        MemorySection {
            metric: DistanceMetric::Cosine.name().to_string(),
        }
    }
}

/// `[provisioning]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningSection {
    /// Provisioning lock lease, seconds (default 20)
    pub lock_timeout_secs: u64,
    /// Wait for a contended provisioning lock, seconds (default 20)
    pub lock_wait_secs: u64,
    /// Existence cache lifetime, seconds (default 3600)
    pub cache_ttl_secs: u64,
}

impl Default for ProvisioningSection {
    fn default() -> Self {
        let p = ProvisioningPolicy::default();
        ProvisioningSection {
            lock_timeout_secs: p.lock_timeout.as_secs(),
            lock_wait_secs: p.lock_wait.as_secs(),
            cache_ttl_secs: p.cache_ttl.as_secs(),
        }
    }
}

impl ProvisioningSection {
    /// Timing policy
    pub fn policy(&self) -> ProvisioningPolicy {
        ProvisioningPolicy {
            lock_timeout: Duration::from_secs(self.lock_timeout_secs),
            lock_wait: Duration::from_secs(self.lock_wait_secs),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }
}

/// `[coordination]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationSection {
    /// `memory` (process-local) or `file` (shared directory)
    pub kind: String,
    /// Directory for `file` coordination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for CoordinationSection {
    fn default() -> Self {
        CoordinationSection {
            kind: "memory".to_string(),
            dir: None,
        }
    }
}

/// Configuration loaded from `strata-vdb.toml`
///
/// # Example
///
/// ```toml
/// vector_store = "qdrant"
///
/// [qdrant]
/// url = "http://qdrant:6333"
/// api_key = "secret"
///
/// [coordination]
/// kind = "file"
/// dir = "/var/run/strata-vdb"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VdbConfig {
    /// Default backend: `chroma`, `qdrant` or `memory`
    pub vector_store: String,
    /// Chroma connection
    pub chroma: ChromaSection,
    /// Qdrant connection
    pub qdrant: QdrantSection,
    /// In-process engine
    pub memory: MemorySection,
    /// Provisioning timings
    pub provisioning: ProvisioningSection,
    /// Cache and lock sharing
    pub coordination: CoordinationSection,
}

impl Default for VdbConfig {
    fn default() -> Self {
        VdbConfig {
            vector_store: VectorType::Chroma.as_str().to_string(),
            chroma: ChromaSection::default(),
            qdrant: QdrantSection::default(),
            memory: MemorySection::default(),
            provisioning: ProvisioningSection::default(),
            coordination: CoordinationSection::default(),
        }
    }
}

fn parse_metric(setting: &str, value: &str) -> VdbResult<DistanceMetric> {
    DistanceMetric::parse(value).ok_or_else(|| {
        VdbError::configuration(format!(
            "unknown metric '{}' for {} (expected cosine, euclidean or dot_product)",
            value, setting
        ))
    })
}

impl VdbConfig {
    /// All defaults (Chroma on localhost)
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# strata-vdb configuration
#
# Default backend for datasets without a persisted index structure:
# "chroma", "qdrant" or "memory"
vector_store = "chroma"

[chroma]
host = "localhost"
port = 8000
tenant = "default_tenant"
database = "default_database"
ssl = false
timeout_ms = 30000
# auth_provider = "token"        # "token" or "basic"
# auth_credentials = "secret"    # basic: "user:password"

[qdrant]
url = "http://localhost:6333"
timeout_ms = 20000
distance = "cosine"
# api_key = "secret"

[memory]
metric = "cosine"

# Collection provisioning: lock lease, lock wait, existence cache TTL
[provisioning]
lock_timeout_secs = 20
lock_wait_secs = 20
cache_ttl_secs = 3600

# "memory" = per-process cache and locks
# "file"   = shared through a directory (multi-process on one host)
[coordination]
kind = "memory"
# dir = "/var/run/strata-vdb"
"#
    }

    /// Parse TOML text (no env overrides, no validation)
    pub fn from_toml_str(content: &str) -> VdbResult<Self> {
        toml::from_str(content)
            .map_err(|e| VdbError::configuration(format!("Failed to parse config: {}", e)))
    }

    /// Read, parse and validate a config file
    pub fn from_file(path: &Path) -> VdbResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VdbError::configuration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// File (if it exists), then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> VdbResult<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(p)?;
                Self::from_toml_str(&content)?
            }
            _ => Self::new(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        tracing::debug!(
            target: "strata::vdb::config",
            vector_store = %config.vector_store,
            coordination = %config.coordination.kind,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Write the default config file if it does not already exist
    pub fn write_default_if_missing(path: &Path) -> VdbResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize to TOML and write to `path`
    pub fn write_to_file(&self, path: &Path) -> VdbResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VdbError::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> VdbResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment-shaped keys)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> VdbResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("VDB_VECTOR_STORE") {
            self.vector_store = v;
        }
        if let Some(v) = lookup("CHROMA_HOST") {
            self.chroma.host = v;
        }
        if let Some(v) = lookup("CHROMA_PORT") {
            self.chroma.port = v.trim().parse().map_err(|_| {
                VdbError::configuration(format!("CHROMA_PORT is not a valid port: '{}'", v))
            })?;
        }
        if let Some(v) = lookup("CHROMA_TENANT") {
            self.chroma.tenant = v;
        }
        if let Some(v) = lookup("CHROMA_DATABASE") {
            self.chroma.database = v;
        }
        if let Some(v) = lookup("CHROMA_AUTH_PROVIDER") {
            self.chroma.auth_provider = Some(v);
        }
        if let Some(v) = lookup("CHROMA_AUTH_CREDENTIALS") {
            self.chroma.auth_credentials = Some(v);
        }
        if let Some(v) = lookup("QDRANT_URL") {
            self.qdrant.url = v;
        }
        if let Some(v) = lookup("QDRANT_API_KEY") {
            self.qdrant.api_key = Some(v);
        }
        Ok(())
    }

    /// Check every section
    pub fn validate(&self) -> VdbResult<()> {
        self.vector_type()?;
        self.chroma.to_config().validate()?;
        self.qdrant.to_config()?.validate()?;
        self.memory_metric()?;
        match self.coordination.kind.as_str() {
            "memory" => {}
            "file" => {
                if self.coordination.dir.is_none() {
                    return Err(VdbError::configuration(
                        "coordination kind 'file' requires coordination.dir",
                    ));
                }
            }
            other => {
                return Err(VdbError::configuration(format!(
                    "unknown coordination kind '{}' (expected memory or file)",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Default backend
    pub fn vector_type(&self) -> VdbResult<VectorType> {
        VectorType::parse(&self.vector_store).ok_or_else(|| {
            VdbError::configuration(format!(
                "unknown vector store '{}' (expected chroma, qdrant or memory)",
                self.vector_store
            ))
        })
    }

    /// Metric of the in-process engine
    pub fn memory_metric(&self) -> VdbResult<DistanceMetric> {
        parse_metric("memory.metric", &self.memory.metric)
    }

    /// Provisioning timings
    pub fn provisioning_policy(&self) -> ProvisioningPolicy {
        self.provisioning.policy()
    }

    /// Build the cache and lock handles
    pub fn coordination(&self) -> VdbResult<Coordination> {
        let policy = self.provisioning_policy();
        match self.coordination.kind.as_str() {
            "memory" => Ok(Coordination::in_memory_with(policy)),
            "file" => {
                let dir = self.coordination.dir.as_ref().ok_or_else(|| {
                    VdbError::configuration("coordination kind 'file' requires coordination.dir")
                })?;
                Coordination::file_backed(dir, policy)
            }
            other => Err(VdbError::configuration(format!(
                "unknown coordination kind '{}' (expected memory or file)",
                other
            ))),
        }
    }
}
