//! In-process cache store implementation.
//!
//! Backs the [`CacheStore`] contract with a mutex-guarded hash map and
//! lazy TTL expiry. Suitable for a single-process deployment and for
//! tests; a networked store can be swapped in behind the same trait.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::cache::CacheStore;
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
struct Entry {
    fields: HashMap<String, String>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Mutex-guarded in-memory hash store with per-key expiry.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::cache("cache mutex poisoned"))
    }

    /// Drop expired entries. Called lazily from reads.
    fn prune(entries: &mut HashMap<String, Entry>) {
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired(now));
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        let entries = self.lock()?;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.fields.clone()))
    }

    async fn set_fields(&self, key: &str, fields: &HashMap<String, String>) -> Result<()> {
        let mut entries = self.lock()?;
        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.is_expired(Instant::now()) {
                    entry.fields.clear();
                    entry.expires_at = None;
                }
            })
            .or_insert_with(|| Entry {
                fields: HashMap::new(),
                expires_at: None,
            });
        entry.fields.extend(fields.clone());
        Ok(())
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.set_fields(
            key,
            &HashMap::from([(field.to_string(), value.to_string())]),
        )
        .await
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        let mut entries = self.lock()?;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_secs));
        }
        Ok(())
    }

    async fn scan(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let mut entries = self.lock()?;
        Self::prune(&mut entries);

        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys.truncate(limit);
        Ok(keys)
    }
}
