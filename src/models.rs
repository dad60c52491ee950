//! Core data models used throughout docdigest.
//!
//! These types represent the documents, persisted conversations, and wire
//! shapes that flow through ingestion and history retrieval.

use serde::Serialize;

use crate::error::DigestError;

/// Text substituted for a record whose envelope cannot be decrypted.
pub const DECRYPTION_SENTINEL: &str = "decryption error";

/// Text substituted for the summary when the model call fails.
pub const DEGRADED_SUMMARY: &str = "Erreur lors de la génération du résumé via le modèle.";

/// Output of the extraction collaborator.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub page_count: u32,
    pub original_filename: String,
}

/// Persisted conversation row. `ciphertext` is the `<ivHex>:<payloadHex>`
/// envelope; plaintext never reaches this type.
#[derive(Debug, Clone)]
pub struct ConversationRecord {
    pub id: String,
    pub ciphertext: String,
    pub original_filename: Option<String>,
    pub page_count: Option<u32>,
    pub title: String,
    /// Unix milliseconds.
    pub created_at: i64,
}

/// A record read back through the store, with its text decrypted
/// independently of every other record.
#[derive(Debug)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub original_filename: Option<String>,
    pub page_count: Option<u32>,
    pub created_at: i64,
    pub text: Result<String, DigestError>,
}

impl Conversation {
    /// Renders the wire shape, substituting [`DECRYPTION_SENTINEL`] for a
    /// failed decryption.
    pub fn into_item(self) -> ConversationItem {
        ConversationItem {
            response: self
                .text
                .unwrap_or_else(|_| DECRYPTION_SENTINEL.to_string()),
            id: self.id,
            title: self.title,
            filename: self.original_filename,
            page_count: self.page_count,
            created_at: format_ts_iso(self.created_at),
        }
    }
}

/// Conversation listing item, as returned by history reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationItem {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub created_at: String, // ISO8601
    pub response: String,
}

/// Pipeline result returned to the uploader.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub summary: String,
    pub title: String,
    pub page_count: u32,
    pub filename: String,
}

pub fn format_ts_iso(ts_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_millis)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| ts_millis.to_string())
}
