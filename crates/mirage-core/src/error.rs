// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mirage feed generator.

use thiserror::Error;

/// The primary error type used across all Mirage adapters and pipeline stages.
#[derive(Debug, Error)]
pub enum MirageError {
    /// Configuration errors (invalid values, missing API key, bad header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Generative service errors (HTTP failure, quota, malformed response).
    ///
    /// `status` is the HTTP status code when one was received and `code` the
    /// provider's status string (e.g. `RESOURCE_EXHAUSTED`). Both feed the
    /// retry classifier.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        status: Option<u16>,
        code: Option<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Content or rate-limit store errors.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Media handling errors (missing bytes, unsupported encoding).
    #[error("media error: {0}")]
    Media(String),

    /// Admission control rejected the request.
    #[error("rate limited, retry after {retry_after}")]
    RateLimited {
        retry_after: chrono::DateTime<chrono::Utc>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MirageError {
    /// Shorthand for a provider error carrying only a message.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            status: None,
            code: None,
            source: None,
        }
    }

    /// Provider error with the HTTP status and provider status string attached.
    pub fn provider_status(
        message: impl Into<String>,
        status: u16,
        code: Option<String>,
    ) -> Self {
        Self::Provider {
            message: message.into(),
            status: Some(status),
            code,
            source: None,
        }
    }

    /// HTTP status code carried by a provider error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => *status,
            _ => None,
        }
    }

    /// Provider status string carried by a provider error, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Provider { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
