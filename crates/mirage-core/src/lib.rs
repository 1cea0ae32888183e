// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mirage feed generator.
//!
//! This crate provides the error type, the domain types that flow through the
//! generation pipeline, and the traits at each external seam: the generative
//! service, the content sink, the media store, and the rate-limit store.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MirageError;
pub use types::{
    AdmissionDecision, Category, ContentFormat, ContentItem, GenerationRequest, ItemId, PlanItem,
};

pub use traits::{ContentSink, GenerativeAdapter, MediaStore, PluginAdapter, RateLimitStore};
