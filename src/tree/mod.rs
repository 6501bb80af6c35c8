//! Tree nodes and their path-keyed persistence format.

pub mod codec;
pub mod node;
pub mod path;

pub use node::{NodeType, TreeNode, PLACEHOLDER_ETAG};
