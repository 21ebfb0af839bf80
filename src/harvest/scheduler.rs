// src/harvest/scheduler.rs

//! Adaptive poll scheduler.
//!
//! Drives the harvest loop against the global events feed. The next poll
//! delay is derived from the upstream hourly rate budget: every harvested
//! event may cost one extra languages-endpoint call, so the remaining
//! budget is spread across this batch's events plus one slot for the next
//! feed poll itself. Bursts shrink the delay; quiet stretches keep the
//! previous one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use tokio::sync::Notify;

use crate::cache::CacheStore;
use crate::error::Result;
use crate::harvest::decorate::RepoDecorator;
use crate::harvest::extract::extract_fragments;
use crate::harvest::publish::BatchPublisher;
use crate::harvest::words::build_word_events;
use crate::models::{Config, RawEvent, RepoBase};

/// Response header carrying the hourly request ceiling.
const RATE_LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Externally visible scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvesterStatus {
    Stopped,
    Running,
}

/// Mutable poll state, owned exclusively by the scheduler.
#[derive(Debug)]
struct PollState {
    /// Guards against overlapping fetch cycles
    is_fetching: AtomicBool,
    /// Start/stop flag
    is_running: AtomicBool,
    /// Delay before the next poll, in milliseconds; always positive
    next_delay_ms: AtomicU64,
}

/// Polls the events feed and feeds batches through the harvest pipeline.
pub struct Harvester {
    config: Arc<Config>,
    client: reqwest::Client,
    decorator: RepoDecorator,
    publisher: Arc<BatchPublisher>,
    state: PollState,
    stop_signal: Notify,
}

impl Harvester {
    pub fn new(
        config: Arc<Config>,
        cache: Arc<dyn CacheStore>,
        publisher: Arc<BatchPublisher>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.api.user_agent)
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()?;

        let decorator = RepoDecorator::new(Arc::clone(&config), client.clone(), cache);

        Ok(Self {
            state: PollState {
                is_fetching: AtomicBool::new(false),
                is_running: AtomicBool::new(false),
                next_delay_ms: AtomicU64::new(config.harvest.base_interval_ms.max(1)),
            },
            config,
            client,
            decorator,
            publisher,
            stop_signal: Notify::new(),
        })
    }

    /// Start the harvesting loop. Warns and does nothing when a fetch is
    /// in flight or the loop is already running.
    pub fn start(self: Arc<Self>) {
        if self.state.is_fetching.load(Ordering::SeqCst) {
            log::warn!("Cannot start: still getting global events");
            return;
        }
        if self.state.is_running.swap(true, Ordering::SeqCst) {
            log::warn!("Cannot start: already started");
            return;
        }

        log::info!("Starting harvest of events from {}", self.config.events_url());

        tokio::spawn(async move { self.run().await });
    }

    /// Stop the harvesting loop. Idempotent; the pending timer is
    /// cancelled, an in-flight fetch is left to finish on its own.
    pub fn stop(&self) {
        if !self.state.is_running.swap(false, Ordering::SeqCst) {
            log::warn!("Cannot stop: already stopped");
            return;
        }

        self.stop_signal.notify_waiters();
        log::info!("Stopped harvesting");
    }

    pub fn status(&self) -> HarvesterStatus {
        if self.state.is_running.load(Ordering::SeqCst) {
            HarvesterStatus::Running
        } else {
            HarvesterStatus::Stopped
        }
    }

    /// The poll loop: fetch immediately, spawn batch processing, then
    /// sleep the computed delay until the next cycle or a stop.
    async fn run(self: Arc<Self>) {
        while self.state.is_running.load(Ordering::SeqCst) {
            if let Some(events) = self.poll_once().await {
                // The next delay is already armed; batch processing must
                // never hold up the polling cadence.
                let harvester = Arc::clone(&self);
                tokio::spawn(async move { harvester.process_batch(events).await });
            }

            if !self.state.is_running.load(Ordering::SeqCst) {
                break;
            }

            let delay = Duration::from_millis(self.state.next_delay_ms.load(Ordering::SeqCst));
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.stop_signal.notified() => break,
            }
        }
    }

    /// One guarded fetch cycle. At most one feed request is ever in
    /// flight; a tick that lands while one is pending is a no-op.
    async fn poll_once(&self) -> Option<Vec<RawEvent>> {
        if self.state.is_fetching.swap(true, Ordering::SeqCst) {
            log::warn!("Skipping poll: still getting global events");
            return None;
        }

        let events = self.fetch_cycle().await;

        self.state.is_fetching.store(false, Ordering::SeqCst);
        events
    }

    /// Fetch the feed once and compute the next delay, returning the
    /// batch to process. Any failure leaves the previous delay in place;
    /// the cycle is never retried synchronously.
    async fn fetch_cycle(&self) -> Option<Vec<RawEvent>> {
        let url = self.config.events_url();

        let mut request = self.client.get(&url);
        if !self.config.api.client_id.is_empty() {
            request = request.query(&[
                ("client_id", self.config.api.client_id.as_str()),
                ("client_secret", self.config.api.client_secret.as_str()),
            ]);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                log::error!("{url} API error: {e}");
                return None;
            }
        };

        let status = response.status();
        let ceiling = rate_limit_ceiling(response.headers(), self.config.harvest.default_rate_limit);

        if status == StatusCode::NOT_MODIFIED {
            log::info!("No new events returned");
            self.arm(compute_delay(ceiling, 0));
            return None;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                log::error!("{url} API error: {e}");
                return None;
            }
        };

        if status != StatusCode::OK {
            log::error!("{url} HTTP status code: {status} | {body}");
            return None;
        }

        let raw_items: Vec<serde_json::Value> = match serde_json::from_str(&body) {
            Ok(items) => items,
            Err(e) => {
                log::error!("{url} invalid response body: {e}");
                return None;
            }
        };

        // Individually undecodable items are dropped rather than failing
        // the batch.
        let events: Vec<RawEvent> = raw_items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<RawEvent>(item).ok())
            .filter(|event| event.payload.is_recognized())
            .collect();

        if events.is_empty() {
            log::info!("No important events");
            return None;
        }

        self.arm(compute_delay(ceiling, events.len()));

        Some(events)
    }

    /// Process one batch, decorating repositories concurrently. Events
    /// fail independently; one bad repository never drops the batch.
    async fn process_batch(self: Arc<Self>, events: Vec<RawEvent>) {
        let concurrency = self.config.harvest.max_concurrent.max(1);

        let mut jobs = stream::iter(events)
            .map(|event| {
                let harvester = Arc::clone(&self);
                async move { harvester.process_event(event).await }
            })
            .buffer_unordered(concurrency);

        while jobs.next().await.is_some() {}
    }

    /// Run a single event through extract, decorate, build and publish.
    async fn process_event(&self, event: RawEvent) {
        let fragments = extract_fragments(&event);
        if fragments.is_empty() {
            return;
        }

        let base = match RepoBase::from_ref(&event.repo, &self.config.api.languages_path) {
            Ok(base) => base,
            Err(e) => {
                log::error!("{} Could not decorate repo: {e}", event.repo.name);
                return;
            }
        };

        let repo = match self.decorator.decorate(&base).await {
            Ok(repo) => repo,
            Err(e) => {
                log::error!("{} Could not decorate repo: {e}", base.name);
                return;
            }
        };

        // No qualifying languages yet; a later cycle will retry the lookup.
        if repo.languages.is_empty() {
            return;
        }

        let words = build_word_events(
            &fragments,
            &repo,
            event.payload.type_name(),
            event.timestamp(),
            &self.config.words,
        );
        if words.is_empty() {
            return;
        }

        self.publisher.publish(words).await;
    }

    /// Store a freshly computed next delay.
    fn arm(&self, delay: Duration) {
        self.state
            .next_delay_ms
            .store((delay.as_millis() as u64).max(1), Ordering::SeqCst);
    }
}

/// Read the hourly request ceiling from response headers, falling back to
/// the configured default when absent or non-positive.
fn rate_limit_ceiling(headers: &HeaderMap, default: u64) -> u64 {
    headers
        .get(RATE_LIMIT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|&ceiling| ceiling > 0)
        .unwrap_or(default)
}

/// Spread the hourly budget across this batch's events plus one slot for
/// the next feed poll: `ceil(3600 / (ceiling / (1 + n)) * 1000)` ms.
fn compute_delay(ceiling: u64, batch_size: usize) -> Duration {
    let per_hour = ceiling.max(1) as f64 / (1.0 + batch_size as f64);
    let ms = (3_600.0 / per_hour * 1_000.0).ceil() as u64;
    Duration::from_millis(ms.max(1))
}
