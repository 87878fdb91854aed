//! Branded ID newtypes.
//!
//! IDs are plain strings on the wire but distinct types in code, so a
//! request ID can never be passed where a thread ID is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generate a prefixed, time-ordered ID (`<prefix>_<uuidv7>`).
fn generate(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::now_v7().simple())
}

macro_rules! branded_id {
    ($(#[doc = $doc:literal])* $name:ident, $prefix:literal) => {
        $(#[doc = $doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(generate($prefix))
            }

            /// Wrap an existing ID string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

branded_id!(
    /// Identifies one in-flight request through the pipeline.
    RequestId,
    "req"
);

branded_id!(
    /// Identifies a conversation thread across requests.
    ThreadId,
    "thr"
);

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
