//! Settings type definitions.
//!
//! Every routing tunable lives here rather than in business logic:
//! thresholds, discounts, timeouts, cache bounds. Defaults are
//! calibration starting points, not derived values — tests and operators
//! adjust them freely.

use serde::{Deserialize, Serialize};

/// Top-level Ferry settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FerrySettings {
    /// Settings schema version.
    pub version: String,
    /// Routing thresholds and discounts.
    pub routing: RoutingSettings,
    /// Semantic cache bounds.
    pub cache: CacheSettings,
    /// Embedding/LLM gateway connection.
    pub gateway: GatewaySettings,
    /// Unit dispatch bounds.
    pub dispatch: DispatchSettings,
    /// Conversation history handling.
    pub conversation: ConversationSettings,
}

impl Default for FerrySettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".into(),
            routing: RoutingSettings::default(),
            cache: CacheSettings::default(),
            gateway: GatewaySettings::default(),
            dispatch: DispatchSettings::default(),
            conversation: ConversationSettings::default(),
        }
    }
}

/// Routing thresholds and confidence calibration factors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingSettings {
    /// Confidence at or above which the supervisor accepts a decision
    /// without second-guessing.
    pub accept_threshold: f64,
    /// Upper bound on fallback-path confidence. Must stay below
    /// `accept_threshold`; the loader clamps it if it does not.
    pub fallback_confidence_cap: f64,
    /// Discount applied to model confidence for short queries.
    pub short_query_discount: f64,
    /// Discount applied when extracted signals conflict with the model's
    /// chosen unit.
    pub conflict_discount: f64,
    /// Queries at or under this many characters count as short.
    pub short_query_max_chars: usize,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            accept_threshold: 0.7,
            fallback_confidence_cap: 0.45,
            short_query_discount: 0.8,
            conflict_discount: 0.75,
            short_query_max_chars: 12,
        }
    }
}

/// Semantic cache bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    /// Whether the cache participates in routing at all.
    pub enabled: bool,
    /// Maximum number of entries before LRU eviction.
    pub capacity: usize,
    /// Entry time-to-live in seconds.
    pub ttl_secs: u64,
    /// Cosine similarity at or above which a stored embedding counts as
    /// the same question.
    pub similarity_threshold: f64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 1_024,
            ttl_secs: 24 * 60 * 60,
            similarity_threshold: 0.92,
        }
    }
}

/// Embedding/LLM gateway connection settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySettings {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// API key. Usually supplied via `FERRY_GATEWAY_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Embedding model name.
    pub embedding_model: String,
    /// Structured-completion model name.
    pub completion_model: String,
    /// Expected embedding dimensions.
    pub embedding_dimensions: usize,
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum retries for transient failures.
    pub max_retries: u32,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            embedding_model: "text-embedding-3-small".into(),
            completion_model: "gpt-4o-mini".into(),
            embedding_dimensions: 1_536,
            timeout_ms: 10_000,
            max_retries: 2,
        }
    }
}

/// Unit dispatch bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchSettings {
    /// Per-dispatch timeout in milliseconds; exceeding it is terminal for
    /// the request.
    pub timeout_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

/// Conversation history handling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationSettings {
    /// Maximum messages loaded from persistence per request.
    pub history_limit: usize,
    /// Messages from the tail of history included in classification
    /// context.
    pub context_window: usize,
    /// Language assumed when detection finds nothing.
    pub default_language: String,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            history_limit: 20,
            context_window: 3,
            default_language: "pt-BR".into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
