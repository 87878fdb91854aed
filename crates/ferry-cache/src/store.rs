//! Cache store trait.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use ferry_core::decision::RouterDecision;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors a cache backend may raise.
///
/// Callers of [`crate::SemanticCache`] never see these: the facade degrades
/// every failure to a miss or a no-op.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend is unreachable or refused the operation.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded.
    #[error("cache entry corrupt: {0}")]
    Corrupt(String),
}

/// Storage backend for routing decisions.
///
/// Implementations may be in-memory or backed by an external store. All
/// operations are best-effort; the caller treats errors as misses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Exact lookup by fingerprint.
    async fn get(&self, key: &str) -> Result<Option<RouterDecision>>;

    /// Nearest stored decision whose embedding similarity meets
    /// `threshold`, if any.
    async fn get_similar(&self, vector: &[f32], threshold: f64)
    -> Result<Option<RouterDecision>>;

    /// Insert or replace an entry.
    async fn put(
        &self,
        key: String,
        vector: Option<Vec<f32>>,
        decision: RouterDecision,
        ttl: Duration,
    ) -> Result<()>;

    /// Number of live entries (expired entries may be counted until
    /// they are lazily collected).
    fn len(&self) -> usize;

    /// Whether the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
