//! Path normalization and key arithmetic.
//!
//! Keys are slash-separated paths with no leading or trailing slash; the root is
//! the empty key. Every key under `p + "/"` shares that byte prefix, so a
//! subtree is one contiguous range of an ordered key space.

/// Trim leading and trailing slashes.
pub fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Proper ancestors of a normalized key, outermost first.
///
/// `ancestors("a/b/c")` yields `"a"`, `"a/b"`.
pub fn ancestors(key: &str) -> impl Iterator<Item = &str> + '_ {
    key.match_indices('/').map(move |(idx, _)| &key[..idx])
}

/// Key prefix shared by every descendant of `key`. The root's descendants are
/// every key, so its prefix is empty.
pub fn descendant_prefix(key: &str) -> String {
    if key.is_empty() {
        String::new()
    } else {
        format!("{}/", key)
    }
}

/// Prefix selecting what a walk rooted at `root` visits.
pub fn walk_prefix(root: &str) -> String {
    descendant_prefix(normalize(root))
}

/// True when `candidate` is `key` itself or lies in its subtree.
pub fn is_within(candidate: &str, key: &str) -> bool {
    if key.is_empty() {
        return true;
    }
    match candidate.strip_prefix(key) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Rewrite `key`, which lies within `from`, so that it lies within `to` with the
/// same relative suffix.
pub fn relocate(key: &str, from: &str, to: &str) -> String {
    debug_assert!(is_within(key, from), "{key} is not within {from}");
    let suffix = key
        .strip_prefix(from)
        .unwrap_or(key)
        .trim_start_matches('/');
    match (to.is_empty(), suffix.is_empty()) {
        (_, true) => to.to_string(),
        (true, false) => suffix.to_string(),
        (false, false) => format!("{}/{}", to, suffix),
    }
}

/// Rooted form of a key as handed to walk callbacks.
pub fn rooted(key: &str) -> String {
    format!("/{}", key)
}
