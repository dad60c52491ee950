//! Error types for the summarization pipeline and conversation store.
//!
//! Every failure the core can produce is one [`DigestError`] variant. Callers
//! decide per variant whether it is fatal (nothing to return) or absorbed
//! into a sentinel value:
//!
//! | Variant | Policy |
//! |---------|--------|
//! | `ExtractionFailed`, `UnsupportedContentType` | fatal for the request, no record produced |
//! | `ModelUnavailable`, `ModelMalformedResponse` | degrade to the sentinel summary |
//! | `KeyNotConfigured` | fatal at startup for the encrypted path |
//! | `MalformedEnvelope`, `DecryptionFailed` | per-record sentinel on read |
//! | `PersistenceFailed` | logged, does not fail an ingestion request |
//! | `NotFound`, `InvalidTitle` | surfaced to the caller |

use thiserror::Error;

/// Main error type for document digestion and conversation storage.
#[derive(Error, Debug)]
pub enum DigestError {
    /// The extraction collaborator could not read the document.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// The uploaded content type has no extractor.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Connection refused, timeout, or a non-success HTTP status.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// HTTP success, but the body lacks the generated text field.
    #[error("Malformed model response: {0}")]
    ModelMalformedResponse(String),

    /// No secret key was configured for this process.
    #[error("Secret key is not configured")]
    KeyNotConfigured,

    /// The cipher refused to encrypt the plaintext.
    #[error("Encryption failed")]
    EncryptionFailed,

    /// The stored envelope could not be split into IV and payload.
    #[error("Malformed cipher envelope: {0}")]
    MalformedEnvelope(String),

    /// The cipher rejected the payload (wrong key, tampering).
    #[error("Decryption failed")]
    DecryptionFailed,

    /// The underlying storage returned an error.
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// No conversation exists with this id.
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// Rename target title is empty after trimming.
    #[error("Invalid title: must not be empty")]
    InvalidTitle,
}

impl From<sqlx::Error> for DigestError {
    fn from(err: sqlx::Error) -> Self {
        DigestError::PersistenceFailed(err.to_string())
    }
}

/// Result alias for operations that fail with a [`DigestError`].
pub type Result<T> = std::result::Result<T, DigestError>;
