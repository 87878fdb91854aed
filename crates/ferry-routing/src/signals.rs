//! Signal extraction and language resolution.
//!
//! Extraction is deterministic and purely local. Signals feed the
//! classifier's fallback scoring and calibration, and the supervisor's
//! domain override; the model-backed primary path classifies on intent,
//! not on these patterns.

use std::sync::LazyLock;

use regex::Regex;

use ferry_core::dispatch::{ChatMessage, Role};
use ferry_core::query::Query;
use ferry_core::signal::{self, Signal};
use ferry_settings::RoutingSettings;

static TABULAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(how many|count|total|average|sum of|show (me )?the data|list all|top \d+|quantos|quantas|quantidade|m[eé]dia|total de|mostre os dados)\b",
    )
    .expect("valid regex")
});

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(per (day|week|month|year)|last (week|month|year)|percent|%|metric|kpi|por (dia|semana|m[eê]s|ano)|[uú]ltim[oa] (semana|m[eê]s|ano))\b")
        .expect("valid regex")
});

static CONCEPTUAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(how (does|do|can)|what (is|are)|why|policy|policies|procedure|rules|como funciona|o que [eé]|qual [eé] a pol[ií]tica|quais s[aã]o as regras|por que)\b",
    )
    .expect("valid regex")
});

static DOCUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(invoice|receipt|purchase order|bill of sale|nota fiscal|fatura|recibo|boleto|pedido de compra)\b",
    )
    .expect("valid regex")
});

static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(hi|hello|hey|good (morning|afternoon|evening)|ol[aá]|oi|bom dia|boa tarde|boa noite|hola)\b",
    )
    .expect("valid regex")
});

/// Markers that strongly suggest Portuguese text.
static PORTUGUESE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(ç|ã|õ|\b(como|quantos|quantas|qual|onde|obrigad[oa]|pedido|devolu[cç][aã]o|ol[aá]|voc[eê])\b)")
        .expect("valid regex")
});

/// Extract routing signals from a query.
///
/// Recomputed for every request; order is not significant (decisions rank
/// by strength).
#[must_use]
pub fn extract(query: &Query, settings: &RoutingSettings) -> Vec<Signal> {
    let mut signals = Vec::new();
    let text = query.text.trim();

    if text.is_empty() {
        signals.push(Signal::EmptyQuery);
    } else if text.chars().count() <= settings.short_query_max_chars {
        signals.push(Signal::ShortQuery);
    }

    if !text.is_empty() {
        if GREETING.is_match(text) {
            signals.push(Signal::Greeting);
        }
        if TABULAR.is_match(text) {
            signals.push(Signal::TabularIntent);
        }
        if NUMERIC.is_match(text) {
            signals.push(Signal::NumericAggregation);
        }
        if CONCEPTUAL.is_match(text) {
            signals.push(Signal::ConceptualQuestion);
        }
        if DOCUMENT.is_match(text) {
            signals.push(Signal::DocumentMention);
        }
    }

    if let Some(attachment) = &query.attachment {
        signals.push(Signal::AttachedDocument {
            mime_type: attachment.mime_type.clone(),
        });
        if attachment.is_commerce_document() {
            signals.push(Signal::CommerceDocument);
        }
    }

    signal::rank(&mut signals);
    signals
}

/// Expand a signal set with conversation context for the supervisor's
/// single re-classification pass.
#[must_use]
pub fn expand(mut signals: Vec<Signal>, history: &[ChatMessage]) -> Vec<Signal> {
    if history.is_empty() {
        return signals;
    }
    if !signals.contains(&Signal::ConversationContext) {
        signals.push(Signal::ConversationContext);
    }
    let prior_unit = history
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .and_then(|m| m.unit);
    if let Some(unit) = prior_unit
        && !signals
            .iter()
            .any(|s| matches!(s, Signal::PriorTurnUnit { .. }))
    {
        signals.push(Signal::PriorTurnUnit { unit });
    }
    signal::rank(&mut signals);
    signals
}

/// Resolve the response language: explicit hint, then a cheap text
/// heuristic, then the configured default.
#[must_use]
pub fn resolve_language(query: &Query, default: &str) -> String {
    if let Some(lang) = &query.language
        && !lang.is_empty()
    {
        return lang.clone();
    }
    let text = query.text.trim();
    if text.is_empty() {
        return default.to_owned();
    }
    if PORTUGUESE.is_match(text) {
        return "pt-BR".to_owned();
    }
    if text.is_ascii() {
        return "en-US".to_owned();
    }
    default.to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::query::Attachment;
    use ferry_core::unit::Unit;

    fn settings() -> RoutingSettings {
        RoutingSettings::default()
    }

    #[test]
    fn count_query_yields_tabular_signals() {
        let q = Query::text("How many orders were placed last week?");
        let signals = extract(&q, &settings());
        assert!(signals.contains(&Signal::TabularIntent));
        assert!(signals.contains(&Signal::NumericAggregation));
    }

    #[test]
    fn policy_question_yields_conceptual_signal() {
        let q = Query::text("How does the return process work?");
        let signals = extract(&q, &settings());
        assert!(signals.contains(&Signal::ConceptualQuestion));
        assert!(!signals.contains(&Signal::TabularIntent));
    }

    #[test]
    fn portuguese_queries_match_too() {
        let q = Query::text("Quantos pedidos temos este mês?");
        assert!(extract(&q, &settings()).contains(&Signal::TabularIntent));

        let q = Query::text("Como funciona o processo de devolução?");
        assert!(extract(&q, &settings()).contains(&Signal::ConceptualQuestion));
    }

    #[test]
    fn greeting_is_detected_at_start_only() {
        assert!(extract(&Query::text("Olá!"), &settings()).contains(&Signal::Greeting));
        assert!(extract(&Query::text("hello there"), &settings()).contains(&Signal::Greeting));
        assert!(
            !extract(&Query::text("I said hello to support"), &settings())
                .contains(&Signal::Greeting)
        );
    }

    #[test]
    fn invoice_mention_yields_document_signal() {
        let q = Query::text("Can you check this nota fiscal for me");
        assert!(extract(&q, &settings()).contains(&Signal::DocumentMention));
    }

    #[test]
    fn empty_query_signal() {
        let signals = extract(&Query::text(""), &settings());
        assert!(signals.contains(&Signal::EmptyQuery));
        assert!(!signals.contains(&Signal::ShortQuery));
    }

    #[test]
    fn short_query_signal() {
        let signals = extract(&Query::text("orders?"), &settings());
        assert!(signals.contains(&Signal::ShortQuery));
    }

    #[test]
    fn commerce_attachment_yields_both_signals() {
        let q = Query::text("").with_attachment(Attachment::new("inv.pdf", "application/pdf"));
        let signals = extract(&q, &settings());
        assert!(signals.contains(&Signal::CommerceDocument));
        assert!(
            signals
                .iter()
                .any(|s| matches!(s, Signal::AttachedDocument { .. }))
        );
        // Ranked strongest first.
        assert_eq!(signals[0], Signal::CommerceDocument);
    }

    #[test]
    fn non_commerce_attachment_yields_only_attached() {
        let q = Query::text("here").with_attachment(Attachment::new("a.txt", "text/plain"));
        let signals = extract(&q, &settings());
        assert!(!signals.contains(&Signal::CommerceDocument));
        assert!(
            signals
                .iter()
                .any(|s| matches!(s, Signal::AttachedDocument { .. }))
        );
    }

    #[test]
    fn expand_adds_context_and_prior_unit() {
        let history = vec![
            ChatMessage::user("how many orders?"),
            ChatMessage::assistant_from(Unit::Analytics, "42"),
        ];
        let expanded = expand(vec![Signal::ShortQuery], &history);
        assert!(expanded.contains(&Signal::ConversationContext));
        assert!(expanded.contains(&Signal::PriorTurnUnit {
            unit: Unit::Analytics
        }));
    }

    #[test]
    fn expand_without_history_is_identity() {
        let signals = vec![Signal::TabularIntent];
        assert_eq!(expand(signals.clone(), &[]), signals);
    }

    #[test]
    fn expand_is_idempotent() {
        let history = vec![ChatMessage::assistant_from(Unit::Knowledge, "see the docs")];
        let once = expand(vec![], &history);
        let twice = expand(once.clone(), &history);
        assert_eq!(once, twice);
    }

    #[test]
    fn explicit_language_hint_wins() {
        let q = Query::text("quantos pedidos?").with_language("en-US");
        assert_eq!(resolve_language(&q, "pt-BR"), "en-US");
    }

    #[test]
    fn portuguese_text_is_detected() {
        let q = Query::text("Como funciona a devolução?");
        assert_eq!(resolve_language(&q, "en-US"), "pt-BR");
    }

    #[test]
    fn ascii_text_defaults_to_english() {
        let q = Query::text("where is my order");
        assert_eq!(resolve_language(&q, "pt-BR"), "en-US");
    }

    #[test]
    fn empty_text_uses_default() {
        assert_eq!(resolve_language(&Query::text(""), "pt-BR"), "pt-BR");
    }
}
