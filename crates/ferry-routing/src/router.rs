//! Routing coordination: cache lookup → classification → cache write.
//!
//! The router carries no business rules. It computes the query embedding
//! once (best effort), consults the semantic cache, classifies on a miss,
//! and writes fresh model decisions back. Everything it calls is total or
//! best-effort, so `route` itself is total.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, instrument};

use ferry_cache::SemanticCache;
use ferry_core::decision::{DecisionSource, RouterDecision};
use ferry_core::query::Query;
use ferry_core::signal::Signal;
use ferry_gateway::Gateway;
use ferry_settings::FerrySettings;

use crate::classifier::Classifier;

/// Decision-producing coordinator consumed by the supervisor.
pub struct Router {
    cache: Arc<SemanticCache>,
    classifier: Arc<Classifier>,
    gateway: Arc<dyn Gateway>,
    settings: Arc<FerrySettings>,
}

impl Router {
    /// Create a router.
    #[must_use]
    pub fn new(
        cache: Arc<SemanticCache>,
        classifier: Arc<Classifier>,
        gateway: Arc<dyn Gateway>,
        settings: Arc<FerrySettings>,
    ) -> Self {
        Self {
            cache,
            classifier,
            gateway,
            settings,
        }
    }

    /// Produce a routing decision for the query.
    ///
    /// Cache hits return immediately (re-tagged `source = cache`); misses
    /// classify and store. Total: always returns a decision.
    #[instrument(skip_all)]
    pub async fn route(&self, query: &Query, signals: &[Signal]) -> RouterDecision {
        let embedding = self.embed_best_effort(query).await;

        if let Some(hit) = self.cache.lookup(query, embedding.as_deref()).await {
            counter!("ferry_routing_decisions_total", "source" => "cache").increment(1);
            debug!(unit = %hit.unit, "routing decision served from cache");
            return hit;
        }

        let decision = self
            .classifier
            .classify_with_embedding(query, signals, embedding.as_deref())
            .await;
        counter!("ferry_routing_decisions_total", "source" => decision.source.as_str())
            .increment(1);

        // Fallback decisions are transient (the gateway was down); caching
        // them would pin low-confidence answers for a full TTL.
        if decision.source == DecisionSource::Model {
            self.cache.store(query, embedding, &decision).await;
        }
        decision
    }

    /// Re-classify with an expanded signal set, bypassing the cache.
    ///
    /// This is the supervisor's single-pass fallback: reading the cache
    /// here would just replay the decision being second-guessed. A fresh
    /// model decision replaces the cached one.
    #[instrument(skip_all)]
    pub async fn reclassify(&self, query: &Query, signals: &[Signal]) -> RouterDecision {
        let embedding = self.embed_best_effort(query).await;
        let decision = self
            .classifier
            .classify_with_embedding(query, signals, embedding.as_deref())
            .await;
        counter!("ferry_routing_reclassifications_total").increment(1);

        if decision.source == DecisionSource::Model {
            self.cache.store(query, embedding, &decision).await;
        }
        decision
    }

    /// Embed the query text, swallowing failures — the embedding only
    /// powers similarity lookup and profile comparison.
    async fn embed_best_effort(&self, query: &Query) -> Option<Vec<f32>> {
        let text = query.text.trim();
        if text.is_empty() {
            return None;
        }
        let timeout = Duration::from_millis(self.settings.gateway.timeout_ms);
        match tokio::time::timeout(timeout, self.gateway.embed(text)).await {
            Ok(Ok(vector)) => Some(vector),
            Ok(Err(e)) => {
                debug!(error = %e, "query embedding failed, continuing without it");
                None
            }
            Err(_) => {
                debug!("query embedding timed out, continuing without it");
                None
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_cache::InMemoryCacheStore;
    use ferry_core::unit::Unit;
    use ferry_gateway::MockGateway;
    use serde_json::json;

    fn build_router(gateway: Arc<MockGateway>) -> Router {
        let settings = Arc::new(FerrySettings::default());
        let cache = Arc::new(SemanticCache::new(
            Arc::new(InMemoryCacheStore::new(64)),
            settings.cache,
        ));
        let classifier = Arc::new(Classifier::new(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            Arc::clone(&settings),
        ));
        Router::new(cache, classifier, gateway, settings)
    }

    fn model_response(unit: &str, confidence: f64) -> serde_json::Value {
        json!({"unit": unit, "confidence": confidence, "rationale": "r"})
    }

    #[tokio::test]
    async fn miss_classifies_and_second_call_hits_cache() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.set_default_completion(model_response("analytics", 0.9));
        let router = build_router(Arc::clone(&gateway));

        let query = Query::text("How many orders were placed last week?");
        let signals = [Signal::TabularIntent];

        let first = router.route(&query, &signals).await;
        assert_eq!(first.unit, Unit::Analytics);
        assert_eq!(first.source, DecisionSource::Model);

        let completions_after_first = gateway.complete_calls();
        let second = router.route(&query, &signals).await;
        assert_eq!(second.unit, Unit::Analytics);
        assert_eq!(second.source, DecisionSource::Cache);
        // The second decision came from cache, not another model call.
        assert_eq!(gateway.complete_calls(), completions_after_first);
    }

    #[tokio::test]
    async fn fallback_decisions_are_not_cached() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.set_fail_completions(true);
        let router = build_router(Arc::clone(&gateway));

        let query = Query::text("how many orders?");
        let signals = [Signal::TabularIntent];

        let first = router.route(&query, &signals).await;
        assert_eq!(first.source, DecisionSource::Fallback);

        // Once the gateway recovers, the same query is classified fresh
        // rather than served from a cached fallback.
        gateway.set_fail_completions(false);
        gateway.set_default_completion(model_response("analytics", 0.9));
        let second = router.route(&query, &signals).await;
        assert_eq!(second.source, DecisionSource::Model);
    }

    #[tokio::test]
    async fn embedding_outage_still_routes() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.set_fail_embeddings(true);
        gateway.set_default_completion(model_response("knowledge", 0.85));
        let router = build_router(gateway);

        let decision = router
            .route(&Query::text("how does shipping work?"), &[])
            .await;
        assert_eq!(decision.unit, Unit::Knowledge);
        assert_eq!(decision.source, DecisionSource::Model);
    }

    #[tokio::test]
    async fn reclassify_bypasses_cache() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.set_default_completion(model_response("triage", 0.4));
        let router = build_router(Arc::clone(&gateway));

        let query = Query::text("something ambiguous about my account");
        let first = router.route(&query, &[]).await;
        assert_eq!(first.unit, Unit::Triage);

        // A cached entry exists now; reclassify must still hit the model.
        gateway.set_default_completion(model_response("knowledge", 0.9));
        let second = router
            .reclassify(&query, &[Signal::ConversationContext])
            .await;
        assert_eq!(second.unit, Unit::Knowledge);
        assert_eq!(second.source, DecisionSource::Model);

        // And the improved decision replaced the cached one.
        let third = router.route(&query, &[]).await;
        assert_eq!(third.unit, Unit::Knowledge);
        assert_eq!(third.source, DecisionSource::Cache);
    }

    #[tokio::test]
    async fn empty_query_skips_embedding() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.set_default_completion(model_response("triage", 0.8));
        let router = build_router(Arc::clone(&gateway));

        let _ = router.route(&Query::text("   "), &[Signal::EmptyQuery]).await;
        assert_eq!(gateway.embed_calls(), 0);
    }
}
