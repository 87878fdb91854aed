//! Query classification.
//!
//! `classify` is total: whatever the gateway does — time out, error,
//! return garbage — the caller gets a valid [`RouterDecision`]. The
//! model-backed primary path classifies on semantic intent; the
//! deterministic fallback scores the extracted signals and is always
//! available. Fallback confidence is capped below the supervisor's
//! acceptance threshold so those decisions always read as "needs review".

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use ferry_core::decision::{Confidence, DecisionSource, RouterDecision};
use ferry_core::query::Query;
use ferry_core::signal::Signal;
use ferry_core::unit::Unit;
use ferry_gateway::{Gateway, GatewayError};
use ferry_settings::FerrySettings;

use crate::profiles::ReferenceProfiles;

/// A profile comparison only counts as disagreement when the nearest
/// profile is actually close; weak matches carry no information.
const PROFILE_CONFLICT_MIN_SIMILARITY: f64 = 0.5;

/// Signals weaker than this don't count as conflicting evidence.
const CONFLICT_MIN_STRENGTH: f64 = 0.6;

/// Confidence assigned when the fallback finds no signal at all.
const NO_SIGNAL_CONFIDENCE: f64 = 0.2;

struct ParsedClassification {
    unit: Unit,
    confidence: f64,
    rationale: String,
}

/// Model-backed classifier with a deterministic fallback.
pub struct Classifier {
    gateway: Arc<dyn Gateway>,
    profiles: ReferenceProfiles,
    settings: Arc<FerrySettings>,
}

impl Classifier {
    /// Create a classifier over the given gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>, settings: Arc<FerrySettings>) -> Self {
        let profiles = ReferenceProfiles::new(Arc::clone(&gateway));
        Self {
            gateway,
            profiles,
            settings,
        }
    }

    /// Classify a query. Never fails, never blocks past the gateway
    /// timeout.
    pub async fn classify(&self, query: &Query, signals: &[Signal]) -> RouterDecision {
        self.classify_with_embedding(query, signals, None).await
    }

    /// Classify with a precomputed query embedding (the router reuses the
    /// one it computed for cache lookup).
    #[instrument(skip_all, fields(text_len = query.text.len()))]
    pub async fn classify_with_embedding(
        &self,
        query: &Query,
        signals: &[Signal],
        embedding: Option<&[f32]>,
    ) -> RouterDecision {
        match self.primary(query, signals, embedding).await {
            Ok(decision) => decision,
            Err(e) => {
                counter!("ferry_classifier_fallback_total").increment(1);
                warn!(error = %e, "primary classification unavailable, using fallback");
                self.fallback(signals, &e.to_string())
            }
        }
    }

    /// Model-backed path: embedding + profile comparison + structured
    /// completion, all bounded by the gateway timeout.
    async fn primary(
        &self,
        query: &Query,
        signals: &[Signal],
        embedding: Option<&[f32]>,
    ) -> Result<RouterDecision, GatewayError> {
        // Embedding failure is non-fatal: the profile comparison is
        // calibration input, not the decision itself.
        let embedding: Option<Vec<f32>> = match embedding {
            Some(v) => Some(v.to_vec()),
            None if query.text.trim().is_empty() => None,
            None => match self.bounded(self.gateway.embed(&query.text)).await {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!(error = %e, "query embedding unavailable, skipping profile comparison");
                    None
                }
            },
        };

        let profile_match = match &embedding {
            Some(v) => self.profiles.best_match(v).await,
            None => None,
        };

        let prompt = build_prompt(query, signals);
        let raw = self
            .bounded(self.gateway.complete_structured(&prompt, &response_schema()))
            .await?;
        let parsed = parse_classification(&raw).map_err(GatewayError::InvalidResponse)?;

        let confidence = self.calibrate(parsed.confidence, query, signals, parsed.unit, profile_match);
        debug!(
            unit = %parsed.unit,
            raw = parsed.confidence,
            calibrated = confidence.value(),
            "model classification"
        );

        Ok(RouterDecision::new(
            parsed.unit,
            confidence,
            parsed.rationale,
            signals.to_vec(),
            DecisionSource::Model,
        ))
    }

    /// Conservative confidence calibration.
    ///
    /// Monotone in the raw score: every adjustment is a multiplicative
    /// discount chosen independently of the raw value.
    fn calibrate(
        &self,
        raw: f64,
        query: &Query,
        signals: &[Signal],
        unit: Unit,
        profile_match: Option<(Unit, f64)>,
    ) -> Confidence {
        let routing = &self.settings.routing;
        let mut confidence = Confidence::new(raw);

        let char_count = query.text.trim().chars().count();
        if char_count > 0 && char_count <= routing.short_query_max_chars {
            confidence = confidence.discounted(routing.short_query_discount);
        }

        let signal_conflict = signals.iter().any(|s| {
            s.strength() >= CONFLICT_MIN_STRENGTH && s.unit_hint().is_some_and(|h| h != unit)
        });
        let profile_conflict = profile_match
            .is_some_and(|(u, score)| u != unit && score >= PROFILE_CONFLICT_MIN_SIMILARITY);
        if signal_conflict || profile_conflict {
            confidence = confidence.discounted(routing.conflict_discount);
        }

        confidence
    }

    /// Deterministic rule-based fallback. Total: always returns a
    /// decision, makes no external calls, scores only the explicit
    /// signals.
    #[must_use]
    pub fn fallback(&self, signals: &[Signal], reason: &str) -> RouterDecision {
        let cap = self.settings.routing.fallback_confidence_cap;

        let mut scores = [0.0_f64; 4];
        for signal in signals {
            if let Some(unit) = signal.unit_hint() {
                let idx = Unit::ALL.iter().position(|u| *u == unit).unwrap_or(0);
                scores[idx] += signal.strength();
            }
        }

        let (best_idx, best_score) = scores
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, s)| (i, *s))
            .unwrap_or((0, 0.0));

        let (unit, confidence, detail) = if best_score > 0.0 {
            let unit = Unit::ALL[best_idx];
            let names: Vec<&str> = signals
                .iter()
                .filter(|s| s.unit_hint() == Some(unit))
                .map(Signal::name)
                .collect();
            (
                unit,
                Confidence::new(0.3 + 0.25 * best_score.min(1.0)).capped(cap),
                format!("signals [{}]", names.join(", ")),
            )
        } else {
            (
                Unit::Triage,
                Confidence::new(NO_SIGNAL_CONFIDENCE).capped(cap),
                "no strong signal".to_owned(),
            )
        };

        RouterDecision::new(
            unit,
            confidence,
            format!("deterministic fallback ({reason}): {detail}"),
            signals.to_vec(),
            DecisionSource::Fallback,
        )
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        let timeout_ms = self.settings.gateway.timeout_ms;
        tokio::time::timeout(Duration::from_millis(timeout_ms), fut)
            .await
            .map_err(|_| GatewayError::Timeout { timeout_ms })?
    }
}

/// Prompt for the structured classification call.
fn build_prompt(query: &Query, signals: &[Signal]) -> String {
    let mut prompt = String::from(
        "You are an intent classifier for an e-commerce support assistant. \
         Classify the user's query by its semantic intent into exactly one unit:\n\
         - analytics: questions about tabular data, counts, metrics, aggregations\n\
         - knowledge: conceptual questions about policies, procedures, how things work\n\
         - commerce: processing or analyzing commercial documents (invoices, orders, receipts)\n\
         - triage: greetings, out-of-scope requests, queries needing clarification\n\n\
         Classify by intent, not by surface keywords: \"what is an order?\" is knowledge, \
         \"how many orders?\" is analytics.\n\n",
    );
    if !signals.is_empty() {
        let names: Vec<&str> = signals.iter().map(Signal::name).collect();
        prompt.push_str(&format!("Detected signals: {}\n", names.join(", ")));
    }
    if let Some(attachment) = &query.attachment {
        prompt.push_str(&format!(
            "The query has an attached file of type {}.\n",
            attachment.mime_type
        ));
    }
    prompt.push_str(&format!("\nUser query:\n{}\n", query.text));
    prompt
}

/// JSON schema the completion must satisfy.
fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "unit": {
                "type": "string",
                "enum": ["analytics", "knowledge", "commerce", "triage"],
            },
            "confidence": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0,
            },
            "rationale": {
                "type": "string",
            },
        },
        "required": ["unit", "confidence", "rationale"],
        "additionalProperties": false,
    })
}

fn parse_classification(value: &Value) -> Result<ParsedClassification, String> {
    let unit_str = value
        .get("unit")
        .and_then(Value::as_str)
        .ok_or_else(|| "classification missing unit".to_owned())?;
    let unit: Unit = unit_str
        .parse()
        .map_err(|e| format!("classification outside unit set: {e}"))?;
    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or_else(|| "classification missing confidence".to_owned())?;
    let rationale = value
        .get("rationale")
        .and_then(Value::as_str)
        .unwrap_or("model classification")
        .to_owned();
    Ok(ParsedClassification {
        unit,
        confidence,
        rationale,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_gateway::MockGateway;
    use proptest::prelude::*;

    fn classifier_with(gateway: Arc<MockGateway>) -> Classifier {
        Classifier::new(gateway, Arc::new(FerrySettings::default()))
    }

    fn model_response(unit: &str, confidence: f64) -> Value {
        json!({"unit": unit, "confidence": confidence, "rationale": "test rationale"})
    }

    #[tokio::test]
    async fn model_decision_passes_through() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.set_default_completion(model_response("analytics", 0.92));
        let classifier = classifier_with(Arc::clone(&gateway));

        let query = Query::text("How many orders were placed last week?");
        let signals = [Signal::TabularIntent, Signal::NumericAggregation];
        let decision = classifier.classify(&query, &signals).await;

        assert_eq!(decision.unit, Unit::Analytics);
        assert_eq!(decision.source, DecisionSource::Model);
        // No discounts apply: long query, signals agree with the model.
        assert!(decision.confidence.value() > 0.7);
    }

    #[tokio::test]
    async fn gateway_outage_falls_back() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.fail_all();
        let classifier = classifier_with(gateway);

        let query = Query::text("asdkjhasd");
        let decision = classifier.classify(&query, &[Signal::ShortQuery]).await;

        assert_eq!(decision.source, DecisionSource::Fallback);
        assert_eq!(decision.unit, Unit::Triage);
    }

    #[tokio::test]
    async fn fallback_confidence_stays_below_threshold() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.fail_all();
        let settings = Arc::new(FerrySettings::default());
        let classifier = Classifier::new(gateway, Arc::clone(&settings));

        // Even with the strongest possible signal set, fallback confidence
        // must stay below the supervisor's acceptance threshold.
        let signals = [
            Signal::CommerceDocument,
            Signal::DocumentMention,
            Signal::AttachedDocument {
                mime_type: "application/pdf".into(),
            },
        ];
        let decision = classifier
            .classify(&Query::text("process the attached invoice now"), &signals)
            .await;

        assert_eq!(decision.source, DecisionSource::Fallback);
        assert!(decision.confidence.value() < settings.routing.accept_threshold);
    }

    #[tokio::test]
    async fn invalid_unit_from_model_triggers_fallback() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.set_default_completion(model_response("billing", 0.99));
        let classifier = classifier_with(gateway);

        let decision = classifier
            .classify(&Query::text("question"), &[Signal::ConceptualQuestion])
            .await;

        assert_eq!(decision.source, DecisionSource::Fallback);
        assert_eq!(decision.unit, Unit::Knowledge);
    }

    #[tokio::test]
    async fn malformed_model_response_triggers_fallback() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.set_default_completion(json!({"verdict": "yes"}));
        let classifier = classifier_with(gateway);

        let decision = classifier.classify(&Query::text("hello"), &[Signal::Greeting]).await;
        assert_eq!(decision.source, DecisionSource::Fallback);
        assert_eq!(decision.unit, Unit::Triage);
    }

    #[tokio::test]
    async fn short_query_is_discounted() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.set_default_completion(model_response("analytics", 0.9));
        let classifier = classifier_with(gateway);

        let decision = classifier.classify(&Query::text("orders?"), &[]).await;
        assert_eq!(decision.source, DecisionSource::Model);
        assert!(
            decision.confidence.value() < 0.9,
            "short queries must be down-weighted, got {}",
            decision.confidence.value()
        );
    }

    #[tokio::test]
    async fn conflicting_signal_is_discounted() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.set_default_completion(model_response("knowledge", 0.9));
        let classifier = classifier_with(gateway.clone());

        // A strong Analytics signal disagrees with the model's Knowledge.
        let with_conflict = classifier
            .classify(
                &Query::text("how many orders do we have this month"),
                &[Signal::TabularIntent],
            )
            .await;

        gateway.set_default_completion(model_response("knowledge", 0.9));
        let without_conflict = classifier
            .classify(
                &Query::text("how many orders do we have this month"),
                &[],
            )
            .await;

        assert!(with_conflict.confidence < without_conflict.confidence);
    }

    #[tokio::test]
    async fn fallback_routes_tabular_signals_to_analytics() {
        let gateway = Arc::new(MockGateway::new(64));
        let classifier = classifier_with(gateway);

        let decision = classifier.fallback(
            &[Signal::TabularIntent, Signal::NumericAggregation],
            "test",
        );
        assert_eq!(decision.unit, Unit::Analytics);
        assert_eq!(decision.source, DecisionSource::Fallback);
        assert!(decision.rationale.contains("tabular_intent"));
    }

    #[tokio::test]
    async fn fallback_routes_commerce_signals_to_commerce() {
        let gateway = Arc::new(MockGateway::new(64));
        let classifier = classifier_with(gateway);

        let decision = classifier.fallback(
            &[
                Signal::CommerceDocument,
                Signal::AttachedDocument {
                    mime_type: "application/pdf".into(),
                },
            ],
            "test",
        );
        assert_eq!(decision.unit, Unit::Commerce);
    }

    #[tokio::test]
    async fn fallback_with_no_signals_is_low_confidence_triage() {
        let gateway = Arc::new(MockGateway::new(64));
        let classifier = classifier_with(gateway);

        let decision = classifier.fallback(&[], "test");
        assert_eq!(decision.unit, Unit::Triage);
        assert!(decision.confidence.value() <= NO_SIGNAL_CONFIDENCE);
    }

    #[tokio::test]
    async fn classify_is_total_for_arbitrary_inputs() {
        let gateway = Arc::new(MockGateway::new(64));
        gateway.fail_all();
        let classifier = classifier_with(gateway);
        let settings = FerrySettings::default();

        for text in ["", "a", "Olá!", "process invoice", "how many?", "🦀🦀🦀"] {
            let query = Query::text(text);
            let signals = crate::signals::extract(&query, &settings.routing);
            let decision = classifier.classify(&query, &signals).await;
            assert!(Unit::ALL.contains(&decision.unit));
            assert_eq!(decision.source, DecisionSource::Fallback);
        }
    }

    #[test]
    fn parse_rejects_missing_fields() {
        assert!(parse_classification(&json!({})).is_err());
        assert!(parse_classification(&json!({"unit": "analytics"})).is_err());
        assert!(
            parse_classification(&json!({"unit": "other", "confidence": 0.5})).is_err()
        );
    }

    #[test]
    fn parse_accepts_valid_response() {
        let parsed =
            parse_classification(&model_response("commerce", 0.8)).unwrap();
        assert_eq!(parsed.unit, Unit::Commerce);
        assert_eq!(parsed.confidence, 0.8);
        assert_eq!(parsed.rationale, "test rationale");
    }

    #[test]
    fn schema_constrains_unit_to_closed_set() {
        let schema = response_schema();
        let allowed = schema["properties"]["unit"]["enum"].as_array().unwrap();
        assert_eq!(allowed.len(), 4);
    }

    proptest! {
        /// Higher raw confidence never calibrates below a lower one, given
        /// identical unit and signals.
        #[test]
        fn calibration_is_monotone(raw_a in 0.0_f64..1.0, raw_b in 0.0_f64..1.0) {
            let gateway = Arc::new(MockGateway::new(8));
            let classifier = classifier_with(gateway);
            let query = Query::text("orders?");
            let signals = [Signal::TabularIntent, Signal::ShortQuery];

            let (lo, hi) = if raw_a <= raw_b { (raw_a, raw_b) } else { (raw_b, raw_a) };
            let cal_lo = classifier.calibrate(lo, &query, &signals, Unit::Knowledge, None);
            let cal_hi = classifier.calibrate(hi, &query, &signals, Unit::Knowledge, None);
            prop_assert!(cal_lo.value() <= cal_hi.value());
        }

        /// Calibration never increases confidence.
        #[test]
        fn calibration_never_amplifies(raw in 0.0_f64..1.0) {
            let gateway = Arc::new(MockGateway::new(8));
            let classifier = classifier_with(gateway);
            let query = Query::text("a short one");
            let cal = classifier.calibrate(raw, &query, &[], Unit::Triage, None);
            prop_assert!(cal.value() <= raw + 1e-12);
        }
    }
}
