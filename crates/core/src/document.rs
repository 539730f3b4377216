//! Document and embedding value types
//!
//! A `Document` is page content plus an open metadata mapping. Metadata has no
//! fixed schema; only a handful of well-known keys are interpreted by this
//! layer (`doc_id`, `document_id`, `score`).

use crate::error::{VdbError, VdbResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Open metadata mapping (string keys, dynamically typed values)
pub type Metadata = serde_json::Map<String, JsonValue>;

/// Fixed-length embedding vector
pub type Embedding = Vec<f32>;

/// Metadata key holding the caller-supplied chunk id
pub const DOC_ID_KEY: &str = "doc_id";

/// Metadata key holding the logical document id (used by `document_ids_filter`)
pub const DOCUMENT_ID_KEY: &str = "document_id";

/// Metadata key injected into search results
pub const SCORE_KEY: &str = "score";

/// A piece of indexed text with metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Text content
    pub page_content: String,

    /// Arbitrary metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with empty metadata
    pub fn new(page_content: impl Into<String>) -> Self {
        Document {
            page_content: page_content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Builder: set a metadata field
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builder: set the chunk id (`doc_id`)
    pub fn with_doc_id(self, id: impl Into<String>) -> Self {
        self.with_metadata(DOC_ID_KEY, id.into())
    }

    /// Caller-supplied chunk id, if present and a string
    pub fn doc_id(&self) -> Option<&str> {
        self.metadata.get(DOC_ID_KEY).and_then(JsonValue::as_str)
    }

    /// Logical document id, if present and a string
    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get(DOCUMENT_ID_KEY).and_then(JsonValue::as_str)
    }

    /// Score injected during search result assembly
    pub fn score(&self) -> Option<f64> {
        self.metadata.get(SCORE_KEY).and_then(JsonValue::as_f64)
    }
}

/// Assign ids for an upsert batch
///
/// Reuses `metadata.doc_id` when the caller supplied one, otherwise generates
/// a random UUID.
pub fn assign_ids(documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .map(|d| match d.doc_id() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        })
        .collect()
}

/// Check that documents and embeddings are positionally aligned
///
/// Also checks that every embedding in the batch has the same dimension.
/// Returns the dimension of the batch (0 for an empty batch).
pub fn check_aligned(documents: &[Document], embeddings: &[Embedding]) -> VdbResult<usize> {
    if documents.len() != embeddings.len() {
        return Err(VdbError::LengthMismatch {
            documents: documents.len(),
            embeddings: embeddings.len(),
        });
    }
    let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
        return Err(VdbError::DimensionMismatch {
            expected: dimension,
            got: bad.len(),
        });
    }
    Ok(dimension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assign_ids_reuses_doc_id() {
        let docs = vec![
            Document::new("a").with_doc_id("chunk-1"),
            Document::new("b"),
            Document::new("c").with_doc_id(""),
        ];
        let ids = assign_ids(&docs);
        assert_eq!(ids[0], "chunk-1");
        assert!(uuid::Uuid::parse_str(&ids[1]).is_ok());
        assert!(uuid::Uuid::parse_str(&ids[2]).is_ok());
        assert_ne!(ids[1], ids[2]);
    }

    #[test]
    fn test_doc_id_ignores_non_string() {
        let doc = Document::new("x").with_metadata(DOC_ID_KEY, 42);
        assert_eq!(doc.doc_id(), None);
    }

    #[test]
    fn test_check_aligned() {
        let docs = vec![Document::new("a"), Document::new("b")];
        assert_eq!(
            check_aligned(&docs, &[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap(),
            2
        );
        assert!(matches!(
            check_aligned(&docs, &[vec![1.0, 0.0]]),
            Err(VdbError::LengthMismatch {
                documents: 2,
                embeddings: 1
            })
        ));
        assert!(matches!(
            check_aligned(&docs, &[vec![1.0, 0.0], vec![1.0]]),
            Err(VdbError::DimensionMismatch { expected: 2, got: 1 })
        ));
        assert_eq!(check_aligned(&[], &[]).unwrap(), 0);
    }

    #[test]
    fn test_document_serde_defaults_metadata() {
        let doc: Document = serde_json::from_value(json!({"page_content": "hi"})).unwrap();
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn test_score_accessor() {
        let doc = Document::new("x").with_metadata(SCORE_KEY, 0.75);
        assert_eq!(doc.score(), Some(0.75));
        assert_eq!(Document::new("y").score(), None);
    }
}
