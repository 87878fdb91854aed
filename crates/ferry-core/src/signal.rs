//! Typed routing evidence.
//!
//! A [`Signal`] is a discrete piece of evidence extracted from a query or
//! its context. Signals are recomputed for every request and never
//! persisted; they feed the classifier's fallback scoring, its calibration,
//! and the supervisor's override rules.

use serde::{Deserialize, Serialize};

use crate::unit::Unit;

/// Routing evidence derived from a query or conversation context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    /// The text asks for counts, aggregates, or tabular data.
    TabularIntent,
    /// The text contains explicit numeric/aggregation phrasing.
    NumericAggregation,
    /// The text mentions a commercial document by name.
    DocumentMention,
    /// A file is attached to the request.
    AttachedDocument {
        /// MIME type of the attachment.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// The attachment is a recognized commerce document type.
    CommerceDocument,
    /// The text is a conceptual "how does it work" style question.
    ConceptualQuestion,
    /// The text is a greeting or small talk.
    Greeting,
    /// The query text is empty.
    EmptyQuery,
    /// The query text is too short to carry much intent.
    ShortQuery,
    /// The previous turn in this thread was handled by a unit.
    PriorTurnUnit {
        /// Unit that handled the previous turn.
        unit: Unit,
    },
    /// Conversation history was available and considered.
    ConversationContext,
}

impl Signal {
    /// Fixed evidence strength in `[0, 1]`.
    ///
    /// Strengths are deliberately coarse: they rank evidence, they are not
    /// probabilities.
    #[must_use]
    pub fn strength(&self) -> f64 {
        match self {
            Self::CommerceDocument => 1.0,
            Self::AttachedDocument { .. } => 0.8,
            Self::TabularIntent => 0.8,
            Self::NumericAggregation => 0.7,
            Self::DocumentMention => 0.6,
            Self::ConceptualQuestion => 0.6,
            Self::Greeting => 0.7,
            Self::PriorTurnUnit { .. } => 0.4,
            Self::EmptyQuery => 0.5,
            Self::ShortQuery | Self::ConversationContext => 0.2,
        }
    }

    /// The unit this signal argues for, if it argues for one at all.
    #[must_use]
    pub fn unit_hint(&self) -> Option<Unit> {
        match self {
            Self::TabularIntent | Self::NumericAggregation => Some(Unit::Analytics),
            Self::CommerceDocument | Self::DocumentMention => Some(Unit::Commerce),
            Self::ConceptualQuestion => Some(Unit::Knowledge),
            Self::Greeting | Self::EmptyQuery => Some(Unit::Triage),
            Self::PriorTurnUnit { unit } => Some(*unit),
            Self::AttachedDocument { .. } | Self::ShortQuery | Self::ConversationContext => None,
        }
    }

    /// Short stable name for logs and rationales.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::TabularIntent => "tabular_intent",
            Self::NumericAggregation => "numeric_aggregation",
            Self::DocumentMention => "document_mention",
            Self::AttachedDocument { .. } => "attached_document",
            Self::CommerceDocument => "commerce_document",
            Self::ConceptualQuestion => "conceptual_question",
            Self::Greeting => "greeting",
            Self::EmptyQuery => "empty_query",
            Self::ShortQuery => "short_query",
            Self::PriorTurnUnit { .. } => "prior_turn_unit",
            Self::ConversationContext => "conversation_context",
        }
    }
}

/// Sort signals strongest-first, preserving relative order of equals.
pub fn rank(signals: &mut [Signal]) {
    signals.sort_by(|a, b| {
        b.strength()
            .partial_cmp(&a.strength())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn every_signal() -> Vec<Signal> {
        vec![
            Signal::TabularIntent,
            Signal::NumericAggregation,
            Signal::DocumentMention,
            Signal::AttachedDocument {
                mime_type: "application/pdf".into(),
            },
            Signal::CommerceDocument,
            Signal::ConceptualQuestion,
            Signal::Greeting,
            Signal::EmptyQuery,
            Signal::ShortQuery,
            Signal::PriorTurnUnit {
                unit: Unit::Knowledge,
            },
            Signal::ConversationContext,
        ]
    }

    #[test]
    fn strengths_are_in_unit_interval() {
        for s in every_signal() {
            let v = s.strength();
            assert!((0.0..=1.0).contains(&v), "{} out of range", s.name());
        }
    }

    #[test]
    fn commerce_document_is_strongest() {
        let max = every_signal()
            .iter()
            .map(Signal::strength)
            .fold(0.0_f64, f64::max);
        assert_eq!(Signal::CommerceDocument.strength(), max);
    }

    #[test]
    fn unit_hints_match_domains() {
        assert_eq!(Signal::TabularIntent.unit_hint(), Some(Unit::Analytics));
        assert_eq!(Signal::CommerceDocument.unit_hint(), Some(Unit::Commerce));
        assert_eq!(
            Signal::ConceptualQuestion.unit_hint(),
            Some(Unit::Knowledge)
        );
        assert_eq!(Signal::Greeting.unit_hint(), Some(Unit::Triage));
        assert_eq!(Signal::ShortQuery.unit_hint(), None);
    }

    #[test]
    fn prior_turn_unit_hints_itself() {
        let s = Signal::PriorTurnUnit {
            unit: Unit::Analytics,
        };
        assert_eq!(s.unit_hint(), Some(Unit::Analytics));
    }

    #[test]
    fn rank_orders_strongest_first() {
        let mut signals = vec![
            Signal::ShortQuery,
            Signal::CommerceDocument,
            Signal::NumericAggregation,
        ];
        rank(&mut signals);
        assert_eq!(signals[0], Signal::CommerceDocument);
        assert_eq!(signals[2], Signal::ShortQuery);
    }

    #[test]
    fn serde_tags_with_snake_case_type() {
        let s = Signal::AttachedDocument {
            mime_type: "image/png".into(),
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["type"], "attached_document");
        assert_eq!(json["mimeType"], "image/png");
        let back: Signal = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = every_signal().iter().map(Signal::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), every_signal().len());
    }
}
