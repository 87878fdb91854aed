//! Routing decisions and supervisor verdicts.

use serde::{Deserialize, Serialize};

use crate::signal::Signal;
use crate::unit::Unit;

/// A confidence score clamped to `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// Zero confidence.
    pub const ZERO: Self = Self(0.0);
    /// Full confidence.
    pub const MAX: Self = Self(1.0);

    /// Create a confidence, clamping into `[0, 1]` (NaN becomes 0).
    #[must_use]
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// The raw value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Multiply by a discount factor, staying clamped.
    #[must_use]
    pub fn discounted(self, factor: f64) -> Self {
        Self::new(self.0 * factor)
    }

    /// Cap at an upper bound.
    #[must_use]
    pub fn capped(self, cap: f64) -> Self {
        Self::new(self.0.min(cap))
    }
}

/// Where a routing decision came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Produced by the model-backed primary path.
    Model,
    /// Produced by the deterministic rule-based fallback.
    Fallback,
    /// Served from the semantic cache.
    Cache,
}

impl DecisionSource {
    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Fallback => "fallback",
            Self::Cache => "cache",
        }
    }
}

/// The routing decision for one classification attempt.
///
/// Immutable once created. A request sees exactly one of these, or two when
/// the supervisor exercises its single re-classification pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterDecision {
    /// Candidate destination unit.
    pub unit: Unit,
    /// Calibrated confidence in the candidate.
    pub confidence: Confidence,
    /// Human-readable explanation of the decision.
    pub rationale: String,
    /// Signals considered, ranked strongest-first.
    pub signals: Vec<Signal>,
    /// Which path produced the decision.
    pub source: DecisionSource,
}

impl RouterDecision {
    /// Create a decision.
    #[must_use]
    pub fn new(
        unit: Unit,
        confidence: Confidence,
        rationale: impl Into<String>,
        mut signals: Vec<Signal>,
        source: DecisionSource,
    ) -> Self {
        crate::signal::rank(&mut signals);
        Self {
            unit,
            confidence,
            rationale: rationale.into(),
            signals,
            source,
        }
    }

    /// Copy of this decision re-tagged as served from cache.
    #[must_use]
    pub fn as_cache_hit(&self) -> Self {
        Self {
            source: DecisionSource::Cache,
            ..self.clone()
        }
    }
}

/// The supervisor's final word on a request.
///
/// The only structure the orchestrator is allowed to act on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorVerdict {
    /// Final destination unit.
    pub unit: Unit,
    /// Final confidence.
    pub confidence: Confidence,
    /// Why the supervisor settled on this unit.
    pub rationale: String,
    /// Whether the request was escalated to Triage for clarification.
    pub escalated: bool,
}

impl SupervisorVerdict {
    /// Accept a decision's candidate unit as final.
    #[must_use]
    pub fn accept(decision: &RouterDecision, rationale: impl Into<String>) -> Self {
        Self {
            unit: decision.unit,
            confidence: decision.confidence,
            rationale: rationale.into(),
            escalated: false,
        }
    }

    /// Escalate a low-confidence decision to Triage.
    #[must_use]
    pub fn escalate(decision: &RouterDecision, rationale: impl Into<String>) -> Self {
        Self {
            unit: Unit::Triage,
            confidence: decision.confidence,
            rationale: rationale.into(),
            escalated: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
