//! Per-unit reference profiles for embedding comparison.
//!
//! Each unit has a small fixed set of canonical phrases. Their embeddings
//! are computed once through the gateway (lazily, on first use) and kept in
//! process memory; a query embedding is then compared against them to see
//! which unit's territory it lands in. The comparison never decides routing
//! on its own — it feeds calibration and the decision rationale.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use ferry_cache::similarity::cosine_similarity;
use ferry_core::unit::Unit;
use ferry_gateway::Gateway;

/// Canonical phrases per unit. Deliberately short and intent-shaped.
const REFERENCE_PHRASES: &[(Unit, &str)] = &[
    (
        Unit::Analytics,
        "how many orders were placed, show totals and averages over sales data",
    ),
    (
        Unit::Knowledge,
        "how does the return policy work, explain procedures and rules",
    ),
    (
        Unit::Commerce,
        "process this invoice document and extract its line items",
    ),
    (
        Unit::Triage,
        "hello, I need help figuring out what I can ask here",
    ),
];

struct ProfileEmbedding {
    unit: Unit,
    vector: Vec<f32>,
}

/// Lazily embedded unit profiles.
pub struct ReferenceProfiles {
    gateway: Arc<dyn Gateway>,
    cell: OnceCell<Vec<ProfileEmbedding>>,
}

impl ReferenceProfiles {
    /// Create profiles backed by the given gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            cell: OnceCell::new(),
        }
    }

    /// The unit whose profile is nearest to `embedding`, with its cosine
    /// similarity. `None` when profiles could not be embedded (the gateway
    /// is down) — callers proceed without the comparison.
    pub async fn best_match(&self, embedding: &[f32]) -> Option<(Unit, f64)> {
        let profiles = match self
            .cell
            .get_or_try_init(|| self.embed_profiles())
            .await
        {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "reference profiles unavailable, skipping comparison");
                return None;
            }
        };

        profiles
            .iter()
            .map(|p| (p.unit, cosine_similarity(&p.vector, embedding)))
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    async fn embed_profiles(&self) -> ferry_gateway::Result<Vec<ProfileEmbedding>> {
        let mut profiles = Vec::with_capacity(REFERENCE_PHRASES.len());
        for (unit, phrase) in REFERENCE_PHRASES {
            let vector = self.gateway.embed(phrase).await?;
            profiles.push(ProfileEmbedding {
                unit: *unit,
                vector,
            });
        }
        debug!(count = profiles.len(), "reference profiles embedded");
        Ok(profiles)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_gateway::MockGateway;

    #[test]
    fn every_unit_has_a_profile() {
        let mut units: Vec<Unit> = REFERENCE_PHRASES.iter().map(|(u, _)| *u).collect();
        units.sort_by_key(|u| u.as_str());
        units.dedup();
        assert_eq!(units.len(), Unit::ALL.len());
    }

    #[tokio::test]
    async fn own_phrase_matches_its_unit() {
        let gateway = Arc::new(MockGateway::new(64));
        let profiles = ReferenceProfiles::new(Arc::clone(&gateway) as Arc<dyn Gateway>);

        // Embedding the analytics phrase itself must match Analytics best.
        let phrase = REFERENCE_PHRASES
            .iter()
            .find(|(u, _)| *u == Unit::Analytics)
            .unwrap()
            .1;
        let embedding = gateway.embed(phrase).await.unwrap();
        let (unit, score) = profiles.best_match(&embedding).await.unwrap();
        assert_eq!(unit, Unit::Analytics);
        assert!(score > 0.999);
    }

    #[tokio::test]
    async fn profiles_are_embedded_once() {
        let gateway = Arc::new(MockGateway::new(32));
        let profiles = ReferenceProfiles::new(Arc::clone(&gateway) as Arc<dyn Gateway>);

        let query = gateway.embed("anything").await.unwrap();
        let _ = profiles.best_match(&query).await;
        let calls_after_first = gateway.embed_calls();
        let _ = profiles.best_match(&query).await;
        assert_eq!(gateway.embed_calls(), calls_after_first);
    }

    #[tokio::test]
    async fn gateway_outage_yields_none_and_retries_later() {
        let gateway = Arc::new(MockGateway::new(32));
        let profiles = ReferenceProfiles::new(Arc::clone(&gateway) as Arc<dyn Gateway>);

        gateway.set_fail_embeddings(true);
        assert!(profiles.best_match(&[0.0; 32]).await.is_none());

        // Once the gateway recovers, initialization is retried.
        gateway.set_fail_embeddings(false);
        let query = gateway.embed("process this invoice").await.unwrap();
        assert!(profiles.best_match(&query).await.is_some());
    }
}
