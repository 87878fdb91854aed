//! Pipeline status events.
//!
//! Every stage transition of an in-flight request is reported as a
//! [`PipelineEvent`] so streaming consumers can render progress. Events are
//! informational only: the state machine never reads them back, and a slow
//! or absent consumer never affects a request.

use serde::{Deserialize, Serialize};

use crate::decision::DecisionSource;
use crate::unit::Unit;

/// Pipeline stage of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Request admitted, state initialized.
    Received,
    /// Waiting on the router's decision.
    Routing,
    /// Waiting on the supervisor's verdict.
    Supervising,
    /// Waiting on the target unit.
    Dispatching,
    /// Terminal: the unit answered.
    Completed,
    /// Terminal: the request failed or was cancelled.
    Failed,
}

impl PipelineStage {
    /// Whether this stage ends the request.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Routing => "routing",
            Self::Supervising => "supervising",
            Self::Dispatching => "dispatching",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Common fields for all pipeline events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEvent {
    /// Request this event belongs to.
    pub request_id: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl BaseEvent {
    /// Create a new base event with the current UTC timestamp.
    #[must_use]
    pub fn now(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Declarative macro that generates [`PipelineEvent`], its `base()`,
/// `event_type()` and `stage()` accessors, and a compile-time
/// `VARIANT_COUNT`.
///
/// Adding a new variant requires ONE edit (inside this invocation).
/// The compiler enforces exhaustive matching everywhere else.
macro_rules! pipeline_events {
    ($(
        $(#[doc = $doc:literal])*
        $variant:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $ty:ty
            ),*
            $(,)?
        } => ($rename:literal, $stage:expr)
    ),* $(,)?) => {
        /// Stage-transition status event for one request.
        ///
        /// Events for a given request are emitted in pipeline order;
        /// across requests there is no ordering guarantee.
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type")]
        #[allow(missing_docs)]
        pub enum PipelineEvent {
            $(
                $(#[doc = $doc])*
                #[serde(rename = $rename)]
                $variant {
                    #[serde(flatten)]
                    base: BaseEvent,
                    $(
                        $(#[$fmeta])*
                        $field: $ty,
                    )*
                },
            )*
        }

        impl PipelineEvent {
            /// Get the base event fields.
            #[must_use]
            pub fn base(&self) -> &BaseEvent {
                match self {
                    $(Self::$variant { base, .. } => base,)*
                }
            }

            /// Get the event type string (for type discrimination).
            #[must_use]
            pub fn event_type(&self) -> &str {
                match self {
                    $(Self::$variant { .. } => $rename,)*
                }
            }

            /// The pipeline stage this event announces.
            #[must_use]
            pub fn stage(&self) -> PipelineStage {
                match self {
                    $(Self::$variant { .. } => $stage,)*
                }
            }
        }

        /// Number of `PipelineEvent` variants (compile-time constant for tests).
        #[cfg(test)]
        pub(crate) const VARIANT_COUNT: usize = [$($rename),*].len();
    };
}

pipeline_events! {
    /// Request admitted.
    Received {} => ("received", PipelineStage::Received),

    /// Routing started.
    Routing {} => ("routing", PipelineStage::Routing),

    /// Router returned a decision; supervision started.
    Supervising {
        unit: Unit,
        source: DecisionSource,
        confidence: f64,
    } => ("supervising", PipelineStage::Supervising),

    /// Supervisor settled on a final unit; dispatch started.
    Dispatching {
        unit: Unit,
        escalated: bool,
    } => ("dispatching", PipelineStage::Dispatching),

    /// The unit answered; request complete.
    Completed {
        unit: Unit,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    } => ("completed", PipelineStage::Completed),

    /// Terminal failure (dispatch error, timeout, cancellation, internal).
    Failed {
        error: String,
        #[serde(rename = "failedStage")]
        failed_stage: PipelineStage,
    } => ("failed", PipelineStage::Failed),
}

impl PipelineEvent {
    /// Get the request ID.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.base().request_id
    }

    /// Whether this event ends the request's event stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.stage().is_terminal()
    }
}

/// Create a request-received event.
#[must_use]
pub fn received_event(request_id: impl Into<String>) -> PipelineEvent {
    PipelineEvent::Received {
        base: BaseEvent::now(request_id),
    }
}

/// Create a routing-started event.
#[must_use]
pub fn routing_event(request_id: impl Into<String>) -> PipelineEvent {
    PipelineEvent::Routing {
        base: BaseEvent::now(request_id),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn all_events() -> Vec<PipelineEvent> {
        let base = BaseEvent::now("req_1");
        vec![
            PipelineEvent::Received { base: base.clone() },
            PipelineEvent::Routing { base: base.clone() },
            PipelineEvent::Supervising {
                base: base.clone(),
                unit: Unit::Analytics,
                source: DecisionSource::Model,
                confidence: 0.9,
            },
            PipelineEvent::Dispatching {
                base: base.clone(),
                unit: Unit::Analytics,
                escalated: false,
            },
            PipelineEvent::Completed {
                base: base.clone(),
                unit: Unit::Analytics,
                duration_ms: 120,
            },
            PipelineEvent::Failed {
                base,
                error: "dispatch timed out".into(),
                failed_stage: PipelineStage::Dispatching,
            },
        ]
    }

    #[test]
    fn every_variant_covered() {
        assert_eq!(all_events().len(), VARIANT_COUNT);
    }

    #[test]
    fn event_types_are_distinct() {
        let events = all_events();
        let mut types: Vec<&str> = events.iter().map(PipelineEvent::event_type).collect();
        types.sort_unstable();
        types.dedup();
        assert_eq!(types.len(), VARIANT_COUNT);
    }

    #[test]
    fn stages_follow_pipeline_order() {
        let stages: Vec<PipelineStage> = all_events().iter().map(PipelineEvent::stage).collect();
        assert_eq!(
            stages,
            vec![
                PipelineStage::Received,
                PipelineStage::Routing,
                PipelineStage::Supervising,
                PipelineStage::Dispatching,
                PipelineStage::Completed,
                PipelineStage::Failed,
            ]
        );
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        for event in all_events() {
            let terminal = matches!(
                event.stage(),
                PipelineStage::Completed | PipelineStage::Failed
            );
            assert_eq!(event.is_terminal(), terminal);
        }
    }

    #[test]
    fn supervising_event_serde() {
        let e = PipelineEvent::Supervising {
            base: BaseEvent::now("req_7"),
            unit: Unit::Commerce,
            source: DecisionSource::Cache,
            confidence: 0.8,
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "supervising");
        assert_eq!(json["requestId"], "req_7");
        assert_eq!(json["unit"], "commerce");
        assert_eq!(json["source"], "cache");
        let back: PipelineEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn failed_event_carries_stage() {
        let e = PipelineEvent::Failed {
            base: BaseEvent::now("req_2"),
            error: "cancelled by caller".into(),
            failed_stage: PipelineStage::Routing,
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["failedStage"], "routing");
    }

    #[test]
    fn completed_event_duration_wire_name() {
        let e = PipelineEvent::Completed {
            base: BaseEvent::now("req_3"),
            unit: Unit::Triage,
            duration_ms: 45,
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["durationMs"], 45);
    }

    #[test]
    fn factory_helpers_set_request_id() {
        assert_eq!(received_event("req_9").request_id(), "req_9");
        assert_eq!(routing_event("req_9").event_type(), "routing");
    }

    #[test]
    fn base_event_now_has_timestamp() {
        let base = BaseEvent::now("req_1");
        assert_eq!(base.request_id, "req_1");
        assert!(!base.timestamp.is_empty());
    }
}
