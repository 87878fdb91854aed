//! Semantic cache facade.
//!
//! Wraps a [`CacheStore`] with the policy the router relies on: exact
//! fingerprint match first, similarity match second, and every backend
//! failure degraded to a miss. The cache is an optimization, never a
//! correctness dependency — a stale or wrong entry is still reviewed by
//! the supervisor and expires on its own.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::counter;
use tracing::{debug, instrument, warn};

use ferry_core::decision::{DecisionSource, RouterDecision};
use ferry_core::query::Query;
use ferry_core::text::fingerprint;
use ferry_settings::CacheSettings;

use crate::store::CacheStore;

/// Counters describing cache behavior since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Exact fingerprint hits.
    pub exact_hits: u64,
    /// Similarity hits.
    pub similarity_hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Successful stores.
    pub stores: u64,
    /// Operations swallowed due to backend failure.
    pub degraded: u64,
}

/// Fingerprint + similarity cache over routing decisions.
pub struct SemanticCache {
    store: Arc<dyn CacheStore>,
    settings: CacheSettings,
    exact_hits: AtomicU64,
    similarity_hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    degraded: AtomicU64,
}

impl SemanticCache {
    /// Create a cache over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, settings: CacheSettings) -> Self {
        Self {
            store,
            settings,
            exact_hits: AtomicU64::new(0),
            similarity_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
        }
    }

    /// Look up a previously cached decision for this query.
    ///
    /// Tries the exact fingerprint first, then (when an embedding is
    /// available) the nearest stored embedding above the similarity
    /// threshold. Hits come back re-tagged `source = cache`. Backend
    /// failures and disabled caches read as misses.
    #[instrument(skip_all)]
    pub async fn lookup(
        &self,
        query: &Query,
        embedding: Option<&[f32]>,
    ) -> Option<RouterDecision> {
        if !self.settings.enabled {
            return None;
        }

        let key = fingerprint(query);
        match self.store.get(&key).await {
            Ok(Some(decision)) => {
                let _ = self.exact_hits.fetch_add(1, Ordering::Relaxed);
                counter!("ferry_cache_hits_total", "kind" => "exact").increment(1);
                debug!(%key, unit = %decision.unit, "exact cache hit");
                return Some(decision.as_cache_hit());
            }
            Ok(None) => {}
            Err(e) => {
                let _ = self.degraded.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "cache get failed, treating as miss");
            }
        }

        if let Some(vector) = embedding {
            match self
                .store
                .get_similar(vector, self.settings.similarity_threshold)
                .await
            {
                Ok(Some(decision)) => {
                    let _ = self.similarity_hits.fetch_add(1, Ordering::Relaxed);
                    counter!("ferry_cache_hits_total", "kind" => "similarity").increment(1);
                    debug!(unit = %decision.unit, "similarity cache hit");
                    return Some(decision.as_cache_hit());
                }
                Ok(None) => {}
                Err(e) => {
                    let _ = self.degraded.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "cache similarity lookup failed, treating as miss");
                }
            }
        }

        let _ = self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("ferry_cache_misses_total").increment(1);
        None
    }

    /// Store a freshly classified decision. Fire-and-forget: failures are
    /// logged and swallowed.
    #[instrument(skip_all)]
    pub async fn store(
        &self,
        query: &Query,
        embedding: Option<Vec<f32>>,
        decision: &RouterDecision,
    ) {
        if !self.settings.enabled {
            return;
        }
        // Cache-tagged decisions are re-reads; writing them back would only
        // refresh TTLs on stale data.
        if decision.source == DecisionSource::Cache {
            return;
        }

        let key = fingerprint(query);
        let ttl = Duration::from_secs(self.settings.ttl_secs);
        match self
            .store
            .put(key, embedding, decision.clone(), ttl)
            .await
        {
            Ok(()) => {
                let _ = self.stores.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                let _ = self.degraded.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "cache store failed, continuing without caching");
            }
        }
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            exact_hits: self.exact_hits.load(Ordering::Relaxed),
            similarity_hits: self.similarity_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
