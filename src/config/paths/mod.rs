//! Filesystem locations for configuration and snapshot data.

pub mod storage;
pub mod xdg_root;
