//! Gateway trait and deterministic mock implementation.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::errors::{GatewayError, Result};

/// Embedding and structured-completion access to an external model
/// provider.
///
/// Implementations are stateless per call, bounded by a timeout, and
/// surface every failure as a typed [`GatewayError`] — never a hang.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Embed a single text into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Request a completion constrained to a JSON schema.
    async fn complete_structured(&self, prompt: &str, schema: &Value) -> Result<Value>;
}

/// Deterministic mock gateway for tests.
///
/// Embeddings are derived from a SHA-256 hash of the input text, so equal
/// texts embed identically and different texts diverge. Completions are
/// served from a scripted queue; when the queue is empty the mock repeats
/// its default response. Failure switches let tests force the
/// gateway-unavailable paths.
pub struct MockGateway {
    dims: usize,
    fail_embeddings: AtomicBool,
    fail_completions: AtomicBool,
    scripted: Mutex<VecDeque<Value>>,
    default_response: Mutex<Value>,
    embed_calls: AtomicU64,
    complete_calls: AtomicU64,
}

impl MockGateway {
    /// Create a mock with the given embedding dimensions.
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            fail_embeddings: AtomicBool::new(false),
            fail_completions: AtomicBool::new(false),
            scripted: Mutex::new(VecDeque::new()),
            default_response: Mutex::new(serde_json::json!({
                "unit": "triage",
                "confidence": 0.5,
                "rationale": "mock default",
            })),
            embed_calls: AtomicU64::new(0),
            complete_calls: AtomicU64::new(0),
        }
    }

    /// Force every call to fail, simulating a gateway outage.
    pub fn fail_all(&self) {
        self.fail_embeddings.store(true, Ordering::SeqCst);
        self.fail_completions.store(true, Ordering::SeqCst);
    }

    /// Force embedding calls to fail.
    pub fn set_fail_embeddings(&self, fail: bool) {
        self.fail_embeddings.store(fail, Ordering::SeqCst);
    }

    /// Force completion calls to fail.
    pub fn set_fail_completions(&self, fail: bool) {
        self.fail_completions.store(fail, Ordering::SeqCst);
    }

    /// Queue a scripted completion response (FIFO).
    pub fn push_completion(&self, response: Value) {
        self.scripted.lock().push_back(response);
    }

    /// Set the response returned when the scripted queue is empty.
    pub fn set_default_completion(&self, response: Value) {
        *self.default_response.lock() = response;
    }

    /// Number of embedding calls made.
    pub fn embed_calls(&self) -> u64 {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Number of completion calls made.
    pub fn complete_calls(&self) -> u64 {
        self.complete_calls.load(Ordering::SeqCst)
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        // One hash per 32-byte block so every component is independent,
        // however many dimensions are requested.
        let mut v: Vec<f32> = Vec::with_capacity(self.dims);
        let mut block: u32 = 0;
        while v.len() < self.dims {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(block.to_le_bytes());
            for byte in hasher.finalize() {
                if v.len() == self.dims {
                    break;
                }
                // Map byte to [-1, 1].
                v.push((f32::from(byte) / 127.5) - 1.0);
            }
            block += 1;
        }

        // Normalize to a unit vector so cosine similarity behaves.
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let _ = self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embeddings.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 503,
                message: "mock embedding outage".into(),
                retryable: true,
            });
        }
        Ok(self.hash_to_vector(text))
    }

    async fn complete_structured(&self, _prompt: &str, _schema: &Value) -> Result<Value> {
        let _ = self.complete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_completions.load(Ordering::SeqCst) {
            return Err(GatewayError::Timeout { timeout_ms: 0 });
        }
        if let Some(next) = self.scripted.lock().pop_front() {
            return Ok(next);
        }
        Ok(self.default_response.lock().clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
