//! In-memory cache store with LRU eviction and TTL expiry.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use ferry_core::decision::RouterDecision;

use crate::similarity::cosine_similarity;
use crate::store::{CacheStore, Result};

struct StoredEntry {
    embedding: Option<Vec<f32>>,
    decision: RouterDecision,
    expires_at: Instant,
    last_access: Mutex<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    fn touch(&self, now: Instant) {
        *self.last_access.lock() = now;
    }
}

/// Bounded in-memory store.
///
/// Reads and writes go through a sharded concurrent map, so readers never
/// block on writers. Capacity is enforced on insert by evicting the
/// least-recently-used entry; expired entries are collected lazily on
/// access. Similarity lookup is a linear scan — the store is bounded, so
/// the scan is too.
pub struct InMemoryCacheStore {
    entries: DashMap<String, StoredEntry>,
    capacity: usize,
}

impl InMemoryCacheStore {
    /// Create a store that holds at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Evict the least-recently-used entry.
    fn evict_lru(&self) {
        let mut oldest: Option<(String, Instant)> = None;
        for entry in &self.entries {
            let accessed = *entry.value().last_access.lock();
            match &oldest {
                Some((_, current)) if accessed >= *current => {}
                _ => oldest = Some((entry.key().clone(), accessed)),
            }
        }
        if let Some((key, _)) = oldest {
            debug!(%key, "evicting least-recently-used cache entry");
            let _ = self.entries.remove(&key);
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<RouterDecision>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired(now) {
                drop(entry);
                let _ = self.entries.remove(key);
                return Ok(None);
            }
            entry.touch(now);
            return Ok(Some(entry.decision.clone()));
        }
        Ok(None)
    }

    async fn get_similar(
        &self,
        vector: &[f32],
        threshold: f64,
    ) -> Result<Option<RouterDecision>> {
        let now = Instant::now();
        let mut best: Option<(f64, String)> = None;
        let mut expired: Vec<String> = Vec::new();

        for entry in &self.entries {
            if entry.value().is_expired(now) {
                expired.push(entry.key().clone());
                continue;
            }
            if let Some(embedding) = &entry.value().embedding {
                let score = cosine_similarity(embedding, vector);
                if score >= threshold && best.as_ref().is_none_or(|(b, _)| score > *b) {
                    best = Some((score, entry.key().clone()));
                }
            }
        }

        for key in expired {
            let _ = self.entries.remove(&key);
        }

        match best {
            Some((score, key)) => {
                debug!(%key, score, "similarity cache match");
                if let Some(entry) = self.entries.get(&key) {
                    entry.touch(now);
                    Ok(Some(entry.decision.clone()))
                } else {
                    // Evicted between scan and read — a miss, not an error.
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: String,
        vector: Option<Vec<f32>>,
        decision: RouterDecision,
        ttl: Duration,
    ) -> Result<()> {
        let now = Instant::now();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        let _ = self.entries.insert(
            key,
            StoredEntry {
                embedding: vector,
                decision,
                expires_at: now + ttl,
                last_access: Mutex::new(now),
            },
        );
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
