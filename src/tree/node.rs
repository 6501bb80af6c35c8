//! Tree node representation shared by snapshots and walkable sources

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entity tag carried by collections created implicitly while materializing a path.
pub const PLACEHOLDER_ETAG: &str = "-1";

/// Node type enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    #[default]
    Leaf,
    Collection,
}

/// One file-like entry of an endpoint tree.
///
/// `meta_store` holds auxiliary metadata gathered by the endpoint. It is never
/// written to a snapshot: only the structural identity of the node survives a
/// round trip through the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub uuid: String,
    pub path: String,
    pub node_type: NodeType,
    pub size: i64,
    /// Modification time, unix seconds
    pub mtime: i64,
    pub mode: i32,
    pub etag: String,
    #[serde(default)]
    pub meta_store: BTreeMap<String, String>,
}

impl TreeNode {
    /// Create a leaf node
    pub fn leaf(path: impl Into<String>, etag: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            node_type: NodeType::Leaf,
            etag: etag.into(),
            ..Self::default()
        }
    }

    /// Create a collection node
    pub fn collection(path: impl Into<String>, etag: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            node_type: NodeType::Collection,
            etag: etag.into(),
            ..Self::default()
        }
    }

    /// Synthetic parent created when a descendant is stored before its ancestors.
    pub fn placeholder(path: impl Into<String>) -> Self {
        Self::collection(path, PLACEHOLDER_ETAG)
    }

    pub fn is_leaf(&self) -> bool {
        self.node_type == NodeType::Leaf
    }

    pub fn is_placeholder(&self) -> bool {
        self.node_type == NodeType::Collection && self.etag == PLACEHOLDER_ETAG
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta_store.insert(key.into(), value.into());
        self
    }

    /// Copy of this node stored under another path.
    pub fn relocated(&self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self.clone()
        }
    }
}
