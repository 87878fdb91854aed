//! # ferry-routing
//!
//! The decision-making core of Ferry:
//!
//! - [`signals`] — deterministic signal extraction and language resolution
//! - [`profiles`] — per-unit reference profiles for embedding comparison
//! - [`Classifier`] — model-backed classification with confidence
//!   calibration and a total deterministic fallback
//! - [`Router`] — cache lookup → classify → cache write coordination
//! - [`Supervisor`] — domain override, confidence gate, and the
//!   single-pass fallback re-route
//!
//! Totality is the load-bearing property: `Classifier::classify`,
//! `Router::route`, and `Supervisor::supervise` all return a value for
//! every input, and a request never sees more than two classification
//! attempts.

#![deny(unsafe_code)]

pub mod classifier;
pub mod profiles;
pub mod router;
pub mod signals;
pub mod supervisor;

pub use classifier::Classifier;
pub use profiles::ReferenceProfiles;
pub use router::Router;
pub use supervisor::Supervisor;
