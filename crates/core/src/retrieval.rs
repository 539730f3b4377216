//! Dataset retrieval settings
//!
//! Plain configuration values handed down by the retrieval orchestrator.
//! They only matter here insofar as they become [`SearchOptions`].

use crate::filter::MetadataFilter;
use crate::store::{SearchOptions, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};

/// How many datasets a query fans out to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrieveStrategy {
    /// One dataset chosen per query
    Single,
    /// All configured datasets queried
    #[default]
    Multiple,
}

/// Retrieval parameters for one dataset query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Fan-out strategy
    #[serde(default)]
    pub retrieve_strategy: RetrieveStrategy,
    /// Candidate count (defaults to 4)
    #[serde(default)]
    pub top_k: Option<usize>,
    /// Minimum score (defaults to 0.0)
    #[serde(default)]
    pub score_threshold: Option<f64>,
    /// Metadata conditions
    #[serde(default)]
    pub metadata_filter: Option<MetadataFilter>,
}

impl RetrievalSettings {
    /// Search options for these settings
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            top_k: self.top_k.unwrap_or(DEFAULT_TOP_K),
            score_threshold: self.score_threshold.unwrap_or(0.0),
            document_ids_filter: None,
            filter: self.metadata_filter.clone(),
        }
    }
}
