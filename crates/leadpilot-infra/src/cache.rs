//! In-process session cache.
//!
//! A `DashMap` keyed by visitor id. Each entry holds at most `cap` turns and
//! an expiry instant that is refreshed on every push. Push, trim and refresh
//! happen under the entry's shard lock, so the cap holds after every write.
//! Expired entries read as empty and are removed lazily on access or by the
//! background sweeper.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use leadpilot_core::session::cache::SessionCache;
use leadpilot_types::chat::Turn;
use leadpilot_types::config::SessionConfig;
use leadpilot_types::error::CacheError;

struct Entry {
    turns: VecDeque<Turn>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Capped, expiring turn lists shared across request handlers.
#[derive(Clone)]
pub struct InMemorySessionCache {
    entries: Arc<DashMap<String, Entry>>,
    cap: usize,
    ttl: Duration,
}

impl InMemorySessionCache {
    pub fn new(cap: usize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            cap: cap.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.max_turns, Duration::from_secs(config.ttl_secs))
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of live (possibly expired but not yet swept) visitor entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Purge expired entries every `interval` until `cancel` fires.
    pub fn spawn_sweeper(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("session cache sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            debug!(removed, remaining = cache.len(), "swept expired sessions");
                        }
                    }
                }
            }
        })
    }
}

impl SessionCache for InMemorySessionCache {
    async fn push(&self, visitor_id: &str, turn: &Turn) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(visitor_id.to_string())
            .or_insert_with(|| Entry {
                turns: VecDeque::with_capacity(self.cap),
                expires_at: now + self.ttl,
            });

        if entry.is_expired(now) {
            entry.turns.clear();
        }
        entry.turns.push_back(turn.clone());
        while entry.turns.len() > self.cap {
            entry.turns.pop_front();
        }
        entry.expires_at = now + self.ttl;
        Ok(())
    }

    async fn history(&self, visitor_id: &str) -> Result<Vec<Turn>, CacheError> {
        let now = Instant::now();
        match self.entries.get(visitor_id) {
            None => return Ok(Vec::new()),
            Some(entry) if !entry.is_expired(now) => {
                return Ok(entry.turns.iter().cloned().collect());
            }
            Some(_) => {}
        }
        self.entries
            .remove_if(visitor_id, |_, entry| entry.is_expired(now));
        Ok(Vec::new())
    }

    async fn clear(&self, visitor_id: &str) -> Result<(), CacheError> {
        self.entries.remove(visitor_id);
        Ok(())
    }
}
