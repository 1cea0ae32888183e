// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process stores for the Mirage feed generator.
//!
//! [`MemoryFeed`] is the display/store sink the pipeline publishes into,
//! [`MemoryMediaStore`] holds generated binary assets, and
//! [`MemoryRateLimitStore`] keeps admission-control counters. None of them
//! survive a restart.

pub mod feed;
pub mod media;
pub mod rate_limit;

pub use feed::MemoryFeed;
pub use media::MemoryMediaStore;
pub use rate_limit::MemoryRateLimitStore;
