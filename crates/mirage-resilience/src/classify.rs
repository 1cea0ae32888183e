// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failure classification for outbound calls.

use mirage_core::MirageError;

/// Provider status string signalling quota exhaustion.
pub const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// HTTP statuses that signal temporary overload.
pub const TRANSIENT_STATUSES: &[u16] = &[429, 503];

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Temporary overload; retry after a backoff.
    Transient,
    /// Anything else; surface immediately.
    Fatal,
}

/// Classifies transient-quota failures.
///
/// A failure is transient when it carries HTTP status 429 or 503, the
/// provider status `RESOURCE_EXHAUSTED`, or a message mentioning `quota`,
/// `429`, or `RESOURCE_EXHAUSTED`. Cancellation is never transient.
pub fn default_classifier(error: &MirageError) -> FailureClass {
    if matches!(error, MirageError::Cancelled) {
        return FailureClass::Fatal;
    }
    if error
        .status()
        .is_some_and(|status| TRANSIENT_STATUSES.contains(&status))
    {
        return FailureClass::Transient;
    }
    if error.code() == Some(RESOURCE_EXHAUSTED) {
        return FailureClass::Transient;
    }

    let message = error.to_string();
    if message.to_ascii_lowercase().contains("quota")
        || message.contains("429")
        || message.contains(RESOURCE_EXHAUSTED)
    {
        FailureClass::Transient
    } else {
        FailureClass::Fatal
    }
}
