//! Raw key layout of buckets inside the single sled tree.
//!
//! ```text
//! 0x00 <bucket>              bucket marker
//! 0x01 <bucket> 0x00 <key>   entry
//! ```
//!
//! Bucket names never contain `0x00`, so entry ranges of different buckets
//! cannot overlap and entries keep the byte order of their keys.

const MARKER_TAG: u8 = 0x00;
const ENTRY_TAG: u8 = 0x01;
const NAME_TERMINATOR: u8 = 0x00;

pub(crate) fn marker(bucket: &str) -> Vec<u8> {
    let mut raw = Vec::with_capacity(bucket.len() + 1);
    raw.push(MARKER_TAG);
    raw.extend_from_slice(bucket.as_bytes());
    raw
}

pub(crate) fn entry_prefix(bucket: &str) -> Vec<u8> {
    let mut raw = Vec::with_capacity(bucket.len() + 2);
    raw.push(ENTRY_TAG);
    raw.extend_from_slice(bucket.as_bytes());
    raw.push(NAME_TERMINATOR);
    raw
}

pub(crate) fn entry(bucket: &str, key: &[u8]) -> Vec<u8> {
    let mut raw = entry_prefix(bucket);
    raw.extend_from_slice(key);
    raw
}
