//! Deterministic business rules over router decisions.
//!
//! The supervisor turns a probabilistic classification into an auditable
//! verdict. Its rules are applied in a fixed order and it invokes the
//! router at most once more per request (the single-pass fallback), so
//! supervision always terminates after at most two classification
//! attempts — there is no third round, ever.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, instrument};

use ferry_core::decision::{RouterDecision, SupervisorVerdict};
use ferry_core::dispatch::ChatMessage;
use ferry_core::query::Query;
use ferry_core::signal::Signal;
use ferry_core::unit::Unit;
use ferry_settings::FerrySettings;

use crate::router::Router;
use crate::signals;

/// Applies confidence gates, domain overrides, and the single-pass
/// fallback over router decisions.
pub struct Supervisor {
    router: Arc<Router>,
    settings: Arc<FerrySettings>,
}

impl Supervisor {
    /// Create a supervisor over the given router.
    #[must_use]
    pub fn new(router: Arc<Router>, settings: Arc<FerrySettings>) -> Self {
        Self { router, settings }
    }

    /// Derive the final verdict for a request.
    ///
    /// Rules, in order:
    /// 1. Domain override: a commerce-document signal forces Commerce.
    /// 2. Confidence at or above the acceptance threshold: accept.
    /// 3. Single-pass fallback: one re-classification with an expanded
    ///    signal set; the second decision is final.
    /// 4. Still below threshold: accept but escalate to Triage for a
    ///    clarifying response instead of a likely-wrong answer.
    #[instrument(skip_all, fields(unit = %decision.unit, confidence = decision.confidence.value()))]
    pub async fn supervise(
        &self,
        query: &Query,
        decision: RouterDecision,
        signals: &[Signal],
        history: &[ChatMessage],
    ) -> SupervisorVerdict {
        // Rule 1: a recognized commerce document always wins, regardless
        // of classifier output or cache content.
        if signals.contains(&Signal::CommerceDocument) || query.has_commerce_document() {
            counter!("ferry_supervisor_verdicts_total", "rule" => "domain_override").increment(1);
            info!("commerce document present, forcing commerce unit");
            return SupervisorVerdict {
                unit: Unit::Commerce,
                confidence: ferry_core::decision::Confidence::MAX,
                rationale: "commerce document attached; domain override".into(),
                escalated: false,
            };
        }

        let threshold = self.settings.routing.accept_threshold;

        // Rule 2: confident enough — accept as-is.
        if decision.confidence.value() >= threshold {
            counter!("ferry_supervisor_verdicts_total", "rule" => "accepted").increment(1);
            return SupervisorVerdict::accept(
                &decision,
                format!("confidence {:.2} meets threshold", decision.confidence.value()),
            );
        }

        // Rule 3: exactly one re-classification with expanded signals.
        let expanded = signals::expand(signals.to_vec(), history);
        info!(
            first_unit = %decision.unit,
            first_confidence = decision.confidence.value(),
            "low-confidence decision, requesting single re-classification"
        );
        let second = self.router.reclassify(query, &expanded).await;

        if second.confidence.value() >= threshold {
            counter!("ferry_supervisor_verdicts_total", "rule" => "rerouted").increment(1);
            return SupervisorVerdict::accept(
                &second,
                format!(
                    "accepted after re-classification (confidence {:.2})",
                    second.confidence.value()
                ),
            );
        }

        // Rule 4: the second decision is final, but too weak to act on
        // directly — surface a clarifying Triage response instead.
        counter!("ferry_supervisor_verdicts_total", "rule" => "escalated").increment(1);
        info!(
            second_unit = %second.unit,
            second_confidence = second.confidence.value(),
            "still below threshold after re-classification, escalating to triage"
        );
        SupervisorVerdict::escalate(
            &second,
            format!(
                "confidence {:.2} below threshold {threshold:.2} after re-classification; \
                 asking for clarification",
                second.confidence.value()
            ),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
