//! # Cache System
//!
//! This module provides the disk cache used to avoid re-fetching resources
//! that have already been downloaded once. Entries are keyed by a digest of
//! the resource URL and are written at most once per key.

// Module declarations
mod key;
mod store;
mod types;

// Re-export primary types from our various modules
pub use key::CacheKey;
pub use store::DiskCache;
pub use types::{CacheConfig, CacheResult};
