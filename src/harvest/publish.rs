// src/harvest/publish.rs

//! Word batch publication and snapshot backlog.
//!
//! Publishes each finished batch of word events to live subscribers and
//! keeps a short-lived snapshot of it in the cache, so a subscriber that
//! connects between poll cycles can be handed a backlog instead of an
//! empty stream.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::broadcast;

use crate::cache::CacheStore;
use crate::models::WordEvent;

/// Cache key prefix for word batch snapshots.
pub const WORD_BATCH_KEY_PREFIX: &str = "wordbatch:";

/// How many snapshot keys a backlog query inspects at most. Just enough
/// recent batches that by the time a new subscriber has processed them
/// the next harvest cycle has seeded fresh ones.
pub const DEFAULT_BACKLOG_KEYS: usize = 25;

/// Broadcast capacity; slow subscribers start losing the oldest batches
/// past this point.
const CHANNEL_CAPACITY: usize = 64;

/// Publishes word event batches and maintains their snapshots.
pub struct BatchPublisher {
    cache: Arc<dyn CacheStore>,
    sender: broadcast::Sender<Vec<WordEvent>>,
    ttl_secs: u64,
    sequence: AtomicU64,
}

impl BatchPublisher {
    pub fn new(cache: Arc<dyn CacheStore>, ttl_secs: u64) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            cache,
            sender,
            ttl_secs,
            sequence: AtomicU64::new(0),
        }
    }

    /// Subscribe to future word event batches.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<WordEvent>> {
        self.sender.subscribe()
    }

    /// Publish one batch: broadcast it to live subscribers, then write a
    /// TTL-bound snapshot. Fire-and-forget; cache failures are logged and
    /// the broadcast stands on its own.
    pub async fn publish(&self, batch: Vec<WordEvent>) {
        if batch.is_empty() {
            return;
        }

        // No live subscribers is not an error.
        let _ = self.sender.send(batch.clone());

        self.write_snapshot(&batch).await;
    }

    /// Fetch the recent snapshot backlog as one flat, key-ordered batch.
    ///
    /// Inspects at most `limit` snapshot keys; empty or malformed entries
    /// are skipped.
    pub async fn recent_batches(&self, limit: usize) -> Vec<WordEvent> {
        let keys = match self.cache.scan(WORD_BATCH_KEY_PREFIX, limit).await {
            Ok(keys) => keys,
            Err(e) => {
                log::warn!("Snapshot scan failed: {e}");
                return Vec::new();
            }
        };

        let mut backlog = Vec::new();
        for key in keys {
            let fields = match self.cache.get(&key).await {
                Ok(Some(fields)) => fields,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Snapshot read failed for {key}: {e}");
                    continue;
                }
            };

            let mut entries: Vec<(String, String)> = fields.into_iter().collect();
            entries.sort();
            for (_, json) in entries {
                if json.is_empty() {
                    continue;
                }
                match serde_json::from_str::<WordEvent>(&json) {
                    Ok(event) => backlog.push(event),
                    Err(e) => log::warn!("Skipping malformed snapshot entry in {key}: {e}"),
                }
            }
        }

        backlog
    }

    /// Persist a batch as a keyed snapshot hash with a short TTL.
    async fn write_snapshot(&self, batch: &[WordEvent]) {
        let key = self.next_key();

        let mut fields = HashMap::with_capacity(batch.len());
        for event in batch {
            match serde_json::to_string(event) {
                Ok(json) => {
                    let field = format!(
                        "{}:{}_{:06}",
                        event.word,
                        event.event_type,
                        self.sequence.fetch_add(1, Ordering::Relaxed)
                    );
                    fields.insert(field, json);
                }
                Err(e) => log::warn!("Could not encode word event '{}': {e}", event.word),
            }
        }

        if let Err(e) = self.cache.set_fields(&key, &fields).await {
            log::warn!("Failed to write snapshot {key}: {e}");
            return;
        }
        if let Err(e) = self.cache.expire(&key, self.ttl_secs).await {
            log::warn!("Failed to set TTL on snapshot {key}: {e}");
        }
    }

    /// Snapshot keys combine the millisecond timestamp with a monotonic
    /// sequence number, so concurrent writes stay unique even under
    /// coarse timestamp resolution.
    fn next_key(&self) -> String {
        format!(
            "{}{}_{:06}",
            WORD_BATCH_KEY_PREFIX,
            Utc::now().timestamp_millis(),
            self.sequence.fetch_add(1, Ordering::Relaxed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::models::WordRepo;

    fn sample_batch() -> Vec<WordEvent> {
        ["fix", "bug"]
            .iter()
            .map(|word| WordEvent {
                event_type: "PushEvent".to_string(),
                url: "https://github.com/octo/repo/commit/abc".to_string(),
                word: word.to_string(),
                timestamp: 1401624000,
                repo: WordRepo {
                    name: "octo/repo".to_string(),
                    url: "https://github.com/octo/repo".to_string(),
                    langs: vec!["Go".to_string()],
                },
            })
            .collect()
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let publisher = BatchPublisher::new(Arc::new(MemoryCache::new()), 30);
        let mut rx = publisher.subscribe();

        publisher.publish(sample_batch()).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].word, "fix");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_fine() {
        let publisher = BatchPublisher::new(Arc::new(MemoryCache::new()), 30);
        publisher.publish(sample_batch()).await;
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_published() {
        let cache: Arc<MemoryCache> = Arc::new(MemoryCache::new());
        let publisher = BatchPublisher::new(Arc::clone(&cache) as Arc<dyn CacheStore>, 30);

        publisher.publish(Vec::new()).await;

        let keys = cache.scan(WORD_BATCH_KEY_PREFIX, 10).await.unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_backlog_round_trip() {
        let publisher = BatchPublisher::new(Arc::new(MemoryCache::new()), 30);

        publisher.publish(sample_batch()).await;
        publisher.publish(sample_batch()).await;

        let backlog = publisher.recent_batches(DEFAULT_BACKLOG_KEYS).await;
        assert_eq!(backlog.len(), 4);
        assert!(backlog.iter().any(|e| e.word == "bug"));
    }

    #[tokio::test]
    async fn test_snapshot_keys_are_unique() {
        let cache: Arc<MemoryCache> = Arc::new(MemoryCache::new());
        let publisher = BatchPublisher::new(Arc::clone(&cache) as Arc<dyn CacheStore>, 30);

        for _ in 0..10 {
            publisher.publish(sample_batch()).await;
        }

        let keys = cache.scan(WORD_BATCH_KEY_PREFIX, 100).await.unwrap();
        assert_eq!(keys.len(), 10);
    }

    #[tokio::test]
    async fn test_malformed_snapshot_entries_are_skipped() {
        let cache: Arc<MemoryCache> = Arc::new(MemoryCache::new());
        let publisher = BatchPublisher::new(Arc::clone(&cache) as Arc<dyn CacheStore>, 30);

        publisher.publish(sample_batch()).await;
        cache
            .set_fields(
                "wordbatch:0_junk",
                &HashMap::from([
                    ("bad".to_string(), "{not json".to_string()),
                    ("empty".to_string(), String::new()),
                ]),
            )
            .await
            .unwrap();

        let backlog = publisher.recent_batches(DEFAULT_BACKLOG_KEYS).await;
        assert_eq!(backlog.len(), 2);
    }
}
