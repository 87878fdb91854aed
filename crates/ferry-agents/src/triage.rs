//! Triage unit: greetings, help, clarification, out-of-scope.
//!
//! Fully local and deterministic — triage is the destination for requests
//! where nothing else is trustworthy (including gateway outages), so it
//! must never depend on the gateway itself.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use ferry_core::dispatch::{AgentResult, DispatchContext};
use ferry_core::query::Query;
use ferry_core::unit::Unit;
use ferry_runtime::AgentDispatch;

static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(hi|hello|hey|good (morning|afternoon|evening)|ol[aá]|oi|bom dia|boa tarde|boa noite|hola)\b",
    )
    .expect("valid regex")
});

static HELP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(help|what can you do|ajuda|ajudar|o que voc[eê] (faz|pode fazer))\b")
        .expect("valid regex")
});

/// Kinds of triage response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResponseKind {
    Greeting,
    Help,
    Clarification,
    Other,
}

impl ResponseKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Help => "help",
            Self::Clarification => "clarification",
            Self::Other => "other",
        }
    }
}

/// Deterministic triage handler.
#[derive(Default)]
pub struct TriageUnit;

impl TriageUnit {
    /// Create the handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn classify(query: &Query, escalated: bool) -> ResponseKind {
        let text = query.text.trim();
        if escalated || text.is_empty() {
            return ResponseKind::Clarification;
        }
        if GREETING.is_match(text) {
            return ResponseKind::Greeting;
        }
        if HELP.is_match(text) {
            return ResponseKind::Help;
        }
        ResponseKind::Other
    }

    fn response_text(kind: ResponseKind, language: &str) -> &'static str {
        let portuguese = language.starts_with("pt");
        match (kind, portuguese) {
            (ResponseKind::Greeting, true) => {
                "Olá! Posso ajudar com dúvidas sobre pedidos, políticas e documentos comerciais. O que você precisa?"
            }
            (ResponseKind::Greeting, false) => {
                "Hello! I can help with questions about orders, policies, and commercial documents. What do you need?"
            }
            (ResponseKind::Help, true) => {
                "Posso consultar dados de pedidos e métricas, explicar políticas e procedimentos, e processar documentos comerciais como notas fiscais."
            }
            (ResponseKind::Help, false) => {
                "I can query order data and metrics, explain policies and procedures, and process commercial documents such as invoices."
            }
            (ResponseKind::Clarification, true) => {
                "Não tenho certeza do que você precisa. Pode reformular a pergunta com mais detalhes?"
            }
            (ResponseKind::Clarification, false) => {
                "I'm not sure what you need. Could you rephrase your question with a bit more detail?"
            }
            (ResponseKind::Other, true) => {
                "Isso parece estar fora do que consigo responder. Posso ajudar com pedidos, políticas ou documentos comerciais."
            }
            (ResponseKind::Other, false) => {
                "That seems outside what I can answer. I can help with orders, policies, or commercial documents."
            }
        }
    }

    fn suggestions(kind: ResponseKind, language: &str) -> Vec<&'static str> {
        let portuguese = language.starts_with("pt");
        if portuguese {
            match kind {
                ResponseKind::Greeting | ResponseKind::Help => vec![
                    "Quantos pedidos tivemos esta semana?",
                    "Como funciona o processo de devolução?",
                    "Processar uma nota fiscal",
                ],
                ResponseKind::Clarification | ResponseKind::Other => vec![
                    "Pergunte sobre dados de pedidos",
                    "Pergunte sobre políticas e procedimentos",
                    "Envie um documento comercial",
                ],
            }
        } else {
            match kind {
                ResponseKind::Greeting | ResponseKind::Help => vec![
                    "How many orders did we get this week?",
                    "How does the return process work?",
                    "Process an invoice",
                ],
                ResponseKind::Clarification | ResponseKind::Other => vec![
                    "Ask about order data",
                    "Ask about policies and procedures",
                    "Upload a commercial document",
                ],
            }
        }
    }
}

#[async_trait]
impl AgentDispatch for TriageUnit {
    fn unit(&self) -> Unit {
        Unit::Triage
    }

    async fn dispatch(&self, query: &Query, context: &DispatchContext) -> AgentResult {
        let kind = Self::classify(query, context.escalated);
        AgentResult::ok(
            Unit::Triage,
            json!({
                "text": Self::response_text(kind, &context.language),
                "responseType": kind.as_str(),
                "suggestions": Self::suggestions(kind, &context.language),
            }),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::ids::RequestId;

    fn context(language: &str, escalated: bool) -> DispatchContext {
        DispatchContext {
            request_id: RequestId::new("req_1"),
            language: language.into(),
            history: vec![],
            attachment: None,
            escalated,
            timeout_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn greeting_gets_greeting_response() {
        let unit = TriageUnit::new();
        let result = unit
            .dispatch(&Query::text("Olá!"), &context("pt-BR", false))
            .await;
        assert!(result.success);
        assert_eq!(result.payload["responseType"], "greeting");
        assert!(result.payload["text"].as_str().unwrap().starts_with("Olá"));
    }

    #[tokio::test]
    async fn help_request_lists_capabilities() {
        let unit = TriageUnit::new();
        let result = unit
            .dispatch(&Query::text("what can you do?"), &context("en-US", false))
            .await;
        assert_eq!(result.payload["responseType"], "help");
        assert!(result.payload["text"].as_str().unwrap().contains("invoices"));
    }

    #[tokio::test]
    async fn escalated_request_asks_for_clarification() {
        let unit = TriageUnit::new();
        // Even a greeting-shaped query gets a clarifying answer when the
        // supervisor escalated.
        let result = unit
            .dispatch(&Query::text("hello numbers maybe"), &context("en-US", true))
            .await;
        assert_eq!(result.payload["responseType"], "clarification");
    }

    #[tokio::test]
    async fn empty_query_asks_for_clarification() {
        let unit = TriageUnit::new();
        let result = unit
            .dispatch(&Query::text("   "), &context("en-US", false))
            .await;
        assert_eq!(result.payload["responseType"], "clarification");
    }

    #[tokio::test]
    async fn out_of_scope_gets_redirect() {
        let unit = TriageUnit::new();
        let result = unit
            .dispatch(
                &Query::text("write me a poem about cats"),
                &context("en-US", false),
            )
            .await;
        assert_eq!(result.payload["responseType"], "other");
        assert_eq!(result.payload["suggestions"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn language_selects_response_text() {
        let unit = TriageUnit::new();
        let pt = unit
            .dispatch(&Query::text("bom dia"), &context("pt-BR", false))
            .await;
        let en = unit
            .dispatch(&Query::text("good morning"), &context("en-US", false))
            .await;
        assert_ne!(pt.payload["text"], en.payload["text"]);
    }

    #[test]
    fn unit_is_triage() {
        assert_eq!(TriageUnit::new().unit(), Unit::Triage);
    }
}
