//! Immutable query input.

use serde::{Deserialize, Serialize};

use crate::ids::ThreadId;

/// MIME types recognized as commercial documents (invoices, orders,
/// receipts and their scanned forms).
const COMMERCE_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/xml",
    "text/xml",
    "image/png",
    "image/jpeg",
    "image/tiff",
];

/// Descriptor for a file attached to a query.
///
/// Only metadata travels through the routing core; file bytes stay with
/// the storage layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Original file name as uploaded.
    pub filename: String,
    /// MIME type reported at upload.
    pub mime_type: String,
}

impl Attachment {
    /// Create an attachment descriptor.
    #[must_use]
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Whether the MIME type belongs to the recognized commerce set.
    #[must_use]
    pub fn is_commerce_document(&self) -> bool {
        let mime = self.mime_type.trim().to_ascii_lowercase();
        // Strip parameters such as `; charset=utf-8`.
        let mime = mime.split(';').next().unwrap_or("").trim();
        COMMERCE_MIME_TYPES.contains(&mime)
    }
}

/// One inbound request, immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Query text. May be empty when the request is attachment-only.
    pub text: String,
    /// Conversation thread, if the caller is continuing one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    /// Attached file descriptor, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    /// Explicit language hint (e.g. `pt-BR`). Detected when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Query {
    /// Create a text-only query.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            thread_id: None,
            attachment: None,
            language: None,
        }
    }

    /// Attach a thread ID.
    #[must_use]
    pub fn with_thread(mut self, thread_id: ThreadId) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    /// Attach a file descriptor.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Set an explicit language hint.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Whether the query carries a recognized commerce document.
    #[must_use]
    pub fn has_commerce_document(&self) -> bool {
        self.attachment
            .as_ref()
            .is_some_and(Attachment::is_commerce_document)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
