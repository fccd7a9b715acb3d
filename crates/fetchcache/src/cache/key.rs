//! # Cache Key
//!
//! Maps a resource identifier to a fixed-length, filename-safe key.

use std::fmt;

use md5::{Digest, Md5};

/// Cache key for identifying a stored resource.
///
/// The key is the lowercase hex MD5 digest of the identifier's UTF-8 bytes.
/// It depends only on the identifier, never on the resource content, so it
/// cannot tell a stale entry from a fresh one for the same URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Length of every key, in hex characters.
    pub const LEN: usize = 32;

    /// Derive the key for a resource identifier.
    pub fn for_identifier(identifier: &str) -> Self {
        let mut hasher = Md5::new();
        hasher.update(identifier.as_bytes());
        let digest = hasher.finalize();
        Self(format!("{digest:x}"))
    }

    /// The key as a filename component.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
