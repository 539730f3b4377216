//! Dataset entity and persisted index structure
//!
//! A dataset owns at most one collection. The collection name is derived
//! once from the dataset id and persisted in the dataset's `index_struct`
//! as `{"type": <backend>, "vector_store": {"class_prefix": <name>}}` so the
//! same dataset resolves to the same collection across restarts.

use crate::error::{VdbError, VdbResult};
use crate::store::VectorType;
use serde::{Deserialize, Serialize};

/// `vector_store` section of an index structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorStoreStruct {
    /// Collection name as first generated (case preserved)
    pub class_prefix: String,
}

/// Persisted index structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStruct {
    /// Backend the collection lives on
    #[serde(rename = "type")]
    pub kind: VectorType,
    /// Collection location
    pub vector_store: VectorStoreStruct,
}

impl IndexStruct {
    /// Index structure for a collection on `kind`
    pub fn new(kind: VectorType, class_prefix: impl Into<String>) -> Self {
        IndexStruct {
            kind,
            vector_store: VectorStoreStruct {
                class_prefix: class_prefix.into(),
            },
        }
    }

    /// Collection name (lowercased class prefix)
    pub fn collection_name(&self) -> String {
        self.vector_store.class_prefix.to_lowercase()
    }
}

/// Index structure with the backend left unread
///
/// Structures written by other backends still carry a usable prefix.
#[derive(Deserialize)]
struct StoredPrefix {
    vector_store: VectorStoreStruct,
}

/// Dataset as seen by this layer
///
/// Only `id` is read and `index_struct` written; committing the mutation is
/// the caller's job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset id (usually a UUID)
    pub id: String,
    /// Owning tenant
    #[serde(default)]
    pub tenant_id: String,
    /// Serialized index structure, if one was ever persisted
    #[serde(default)]
    pub index_struct: Option<String>,
}

impl Dataset {
    /// Dataset without an index structure
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Dataset {
            id: id.into(),
            tenant_id: tenant_id.into(),
            index_struct: None,
        }
    }

    /// Parsed index structure
    ///
    /// `Ok(None)` when nothing was persisted (or the stored string is blank).
    pub fn index_struct_dict(&self) -> VdbResult<Option<IndexStruct>> {
        self.parse_index_struct()
    }

    /// Collection name recorded in the index structure, whatever its `type`
    pub fn persisted_collection_name(&self) -> VdbResult<Option<String>> {
        Ok(self
            .parse_index_struct::<StoredPrefix>()?
            .map(|s| s.vector_store.class_prefix.to_lowercase()))
    }

    fn parse_index_struct<T: serde::de::DeserializeOwned>(&self) -> VdbResult<Option<T>> {
        match self.index_struct.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| VdbError::InvalidIndexStruct(format!("dataset {}: {}", self.id, e))),
        }
    }

    /// Persist an index structure onto the dataset
    pub fn set_index_struct(&mut self, index_struct: &IndexStruct) -> VdbResult<()> {
        self.index_struct = Some(serde_json::to_string(index_struct)?);
        Ok(())
    }

    /// Deterministic collection name for a dataset id
    ///
    /// `Vector_index_<id with '-' replaced by '_'>_Node`
    pub fn gen_collection_name_by_id(dataset_id: &str) -> String {
        format!("Vector_index_{}_Node", dataset_id.replace('-', "_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gen_collection_name() {
        assert_eq!(
            Dataset::gen_collection_name_by_id("5f1c-22aa"),
            "Vector_index_5f1c_22aa_Node"
        );
    }

    #[test]
    fn test_index_struct_wire_shape() {
        let s = IndexStruct::new(VectorType::Chroma, "Vector_index_x_Node");
        let value = serde_json::to_value(&s).unwrap();
        assert_eq!(
            value,
            json!({"type": "chroma", "vector_store": {"class_prefix": "Vector_index_x_Node"}})
        );
        assert_eq!(s.collection_name(), "vector_index_x_node");
    }

    #[test]
    fn test_index_struct_dict_roundtrip() {
        let mut ds = Dataset::new("abc", "tenant");
        assert_eq!(ds.index_struct_dict().unwrap(), None);

        let s = IndexStruct::new(VectorType::Qdrant, "Vector_index_abc_Node");
        ds.set_index_struct(&s).unwrap();
        assert_eq!(ds.index_struct_dict().unwrap(), Some(s));
    }

    #[test]
    fn test_blank_index_struct_is_absent() {
        let mut ds = Dataset::new("abc", "tenant");
        ds.index_struct = Some("   ".into());
        assert_eq!(ds.index_struct_dict().unwrap(), None);
    }

    #[test]
    fn test_foreign_backend_keeps_prefix() {
        let mut ds = Dataset::new("x", "tenant");
        ds.index_struct = Some(
            json!({"type": "weaviate", "vector_store": {"class_prefix": "Vector_index_X_Node"}})
                .to_string(),
        );
        assert_eq!(
            ds.persisted_collection_name().unwrap().as_deref(),
            Some("vector_index_x_node")
        );
        assert!(matches!(
            ds.index_struct_dict(),
            Err(VdbError::InvalidIndexStruct(_))
        ));
    }

    #[test]
    fn test_corrupt_index_struct_is_error() {
        let mut ds = Dataset::new("abc", "tenant");
        ds.index_struct = Some("{\"type\": \"chroma\"}".into());
        assert!(matches!(
            ds.index_struct_dict(),
            Err(VdbError::InvalidIndexStruct(_))
        ));
        assert!(matches!(
            ds.persisted_collection_name(),
            Err(VdbError::InvalidIndexStruct(_))
        ));
    }
}
