//! Binary record format for nodes stored in a snapshot.
//!
//! A record is one version byte followed by the bincode encoding of the node's
//! structural fields. Auxiliary metadata is not part of the record.

use crate::error::CodecError;
use crate::tree::node::{NodeType, TreeNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current record layout version
pub const RECORD_VERSION: u8 = 1;

#[derive(Serialize)]
struct RecordRef<'a> {
    uuid: &'a str,
    path: &'a str,
    node_type: NodeType,
    size: i64,
    mtime: i64,
    mode: i32,
    etag: &'a str,
}

#[derive(Deserialize)]
struct Record {
    uuid: String,
    path: String,
    node_type: NodeType,
    size: i64,
    mtime: i64,
    mode: i32,
    etag: String,
}

/// Serialize the structural fields of `node`.
pub fn encode(node: &TreeNode) -> Result<Vec<u8>, CodecError> {
    let record = RecordRef {
        uuid: &node.uuid,
        path: &node.path,
        node_type: node.node_type,
        size: node.size,
        mtime: node.mtime,
        mode: node.mode,
        etag: &node.etag,
    };
    let mut bytes = vec![RECORD_VERSION];
    bincode::serialize_into(&mut bytes, &record)?;
    Ok(bytes)
}

/// Parse a record produced by [`encode`]. The returned node has no metadata.
pub fn decode(bytes: &[u8]) -> Result<TreeNode, CodecError> {
    let (version, body) = bytes.split_first().ok_or(CodecError::Empty)?;
    if *version != RECORD_VERSION {
        return Err(CodecError::UnsupportedVersion(*version));
    }
    let record: Record = bincode::deserialize(body)?;
    Ok(TreeNode {
        uuid: record.uuid,
        path: record.path,
        node_type: record.node_type,
        size: record.size,
        mtime: record.mtime,
        mode: record.mode,
        etag: record.etag,
        meta_store: BTreeMap::new(),
    })
}
