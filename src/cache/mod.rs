// src/cache/mod.rs

//! Key-value cache abstraction.
//!
//! The harvester only needs a small slice of a Redis-style hash store:
//! keyed records of string fields with per-key expiry, plus a bounded key
//! scan for the snapshot backlog. Every operation is independently
//! failable; callers treat a failed read as a cache miss and a failed
//! write as "not cached", never as a pipeline abort.

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use memory::MemoryCache;

/// Trait for cache store backends.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch all fields of a record, or `None` if the key is absent
    /// or expired.
    async fn get(&self, key: &str) -> Result<Option<HashMap<String, String>>>;

    /// Write (or overwrite) the given fields of a record.
    async fn set_fields(&self, key: &str, fields: &HashMap<String, String>) -> Result<()>;

    /// Write a single field of an existing record, creating the record
    /// if it does not exist.
    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Set a key's time-to-live in seconds.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()>;

    /// Return up to `limit` live keys starting with `prefix`, sorted
    /// ascending.
    async fn scan(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;
}
