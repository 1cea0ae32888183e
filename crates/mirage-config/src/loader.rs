// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./mirage.toml` > `~/.config/mirage/mirage.toml` > `/etc/mirage/mirage.toml`
//! with environment variable overrides via `MIRAGE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MirageConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/mirage/mirage.toml";

/// Local configuration file, relative to the working directory.
pub const LOCAL_CONFIG_FILE: &str = "mirage.toml";

/// Sections that `MIRAGE_<SECTION>_<KEY>` variables map into.
const ENV_SECTIONS: &[&str] = &[
    "app",
    "gemini",
    "retry",
    "pipeline",
    "video",
    "gateway",
    "rate_limit",
];

/// Path of the per-user configuration file, if a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mirage").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/mirage/mirage.toml`
/// 3. `~/.config/mirage/mirage.toml`
/// 4. `./mirage.toml`
/// 5. `MIRAGE_*` environment variables
pub fn load_config() -> Result<MirageConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the compiled defaults.
///
/// No files or environment variables are consulted.
pub fn load_config_from_str(toml_content: &str) -> Result<MirageConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MirageConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MirageConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MirageConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The layered Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MirageConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider mapping `MIRAGE_GEMINI_API_KEY` to `gemini.api_key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that contain underscores survive intact. `rate_limit` classes nest
/// one level deeper: `MIRAGE_RATE_LIMIT_CREATE_MAX_REQUESTS` maps to
/// `rate_limit.create.max_requests`.
fn env_provider() -> Env {
    Env::prefixed("MIRAGE_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env key to its dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        else {
            continue;
        };

        if *section == "rate_limit" {
            for class in ["general", "create", "upload", "chat", "search"] {
                if let Some(field) = rest.strip_prefix(class).and_then(|r| r.strip_prefix('_')) {
                    return format!("rate_limit.{class}.{field}");
                }
            }
        }
        return format!("{section}.{rest}");
    }
    key.to_string()
}
