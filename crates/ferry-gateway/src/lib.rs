//! # ferry-gateway
//!
//! Embedding and structured-completion access to an external model
//! provider.
//!
//! - [`Gateway`] — the trait consumed by the classifier and the units
//! - [`OpenAiGateway`] — OpenAI-compatible HTTP implementation with
//!   per-call timeout and bounded retry
//! - [`MockGateway`] — deterministic in-process implementation for tests
//!   and keyless local runs
//!
//! The gateway is stateless per call and surfaces every failure as a typed
//! [`GatewayError`]; callers (the classifier in particular) treat failure
//! as a normal data-driven branch, never as a reason to propagate upward.

#![deny(unsafe_code)]

pub mod errors;
pub mod gateway;
pub mod openai;

pub use errors::{GatewayError, Result};
pub use gateway::{Gateway, MockGateway};
pub use openai::OpenAiGateway;
