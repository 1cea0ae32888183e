// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter and collaborator traits.
//!
//! Service adapters extend [`PluginAdapter`]; the store traits are plain
//! `Send + Sync` seams. All use `#[async_trait]` for dynamic dispatch.

pub mod adapter;
pub mod generative;
pub mod media;
pub mod rate_limit;
pub mod sink;

pub use adapter::PluginAdapter;
pub use generative::GenerativeAdapter;
pub use media::MediaStore;
pub use rate_limit::RateLimitStore;
pub use sink::ContentSink;
