// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: batch bounds, non-zero
//! intervals, valid bind addresses, non-empty model names.

use crate::diagnostic::ConfigError;
use crate::model::MirageConfig;

/// Largest batch any configuration may request.
pub const MAX_ITEMS_CEILING: usize = 5;

/// Longest time a video job may be polled, one day.
pub const MAX_VIDEO_WAIT_SECS: u64 = 86_400;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns every violation found rather than stopping at the first.
pub fn validate_config(config: &MirageConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let pipeline = &config.pipeline;
    if pipeline.max_items == 0 || pipeline.max_items > MAX_ITEMS_CEILING {
        fail(format!(
            "pipeline.max_items must be between 1 and {MAX_ITEMS_CEILING}, got {}",
            pipeline.max_items
        ));
    }
    if pipeline.default_items == 0 || pipeline.default_items > pipeline.max_items {
        fail(format!(
            "pipeline.default_items must be between 1 and pipeline.max_items ({}), got {}",
            pipeline.max_items, pipeline.default_items
        ));
    }

    if config.retry.base_delay_ms == 0 {
        fail("retry.base_delay_ms must be positive".to_string());
    }
    if config.retry.max_retries > 10 {
        fail(format!(
            "retry.max_retries must be at most 10, got {}",
            config.retry.max_retries
        ));
    }
    if let Some(max) = config.retry.max_delay_ms
        && max < config.retry.base_delay_ms
    {
        fail(format!(
            "retry.max_delay_ms ({max}) must not be below retry.base_delay_ms ({})",
            config.retry.base_delay_ms
        ));
    }

    if config.video.poll_interval_ms == 0 {
        fail("video.poll_interval_ms must be positive".to_string());
    }
    if config.video.max_wait_secs > MAX_VIDEO_WAIT_SECS {
        fail(format!(
            "video.max_wait_secs must be at most {MAX_VIDEO_WAIT_SECS}, got {}",
            config.video.max_wait_secs
        ));
    } else if config.video.max_wait_secs.saturating_mul(1000) < config.video.poll_interval_ms {
        fail("video.max_wait_secs must cover at least one poll interval".to_string());
    }

    for (field, value) in [
        ("gemini.base_url", &config.gemini.base_url),
        ("gemini.text_model", &config.gemini.text_model),
        ("gemini.image_model", &config.gemini.image_model),
        ("gemini.tts_model", &config.gemini.tts_model),
        ("gemini.video_model", &config.gemini.video_model),
    ] {
        if value.trim().is_empty() {
            fail(format!("{field} must not be empty"));
        }
    }
    if !config.gemini.base_url.starts_with("http://") && !config.gemini.base_url.starts_with("https://")
    {
        fail(format!(
            "gemini.base_url `{}` must be an http(s) URL",
            config.gemini.base_url
        ));
    }

    let host = config.gateway.host.trim();
    let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
    let is_valid_hostname = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !is_valid_ip && !is_valid_hostname {
        fail(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        ));
    }

    if config.gateway.request_timeout_secs == 0 {
        fail("gateway.request_timeout_secs must be positive".to_string());
    }

    if config.rate_limit.sweep_interval_secs == 0 {
        fail("rate_limit.sweep_interval_secs must be positive".to_string());
    }
    for (name, class) in config.rate_limit.classes() {
        if class.window_ms == 0 {
            fail(format!("rate_limit.{name}.window_ms must be positive"));
        }
        if class.max_requests == 0 {
            fail(format!("rate_limit.{name}.max_requests must be positive"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&MirageConfig::default()).is_ok());
    }

    #[test]
    fn oversized_batch_fails_validation() {
        let mut config = MirageConfig::default();
        config.pipeline.max_items = 12;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "pipeline.max_items"));
    }

    #[test]
    fn default_items_above_max_fails() {
        let mut config = MirageConfig::default();
        config.pipeline.max_items = 2;
        config.pipeline.default_items = 3;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "pipeline.default_items"));
    }

    #[test]
    fn zero_base_delay_fails() {
        let mut config = MirageConfig::default();
        config.retry.base_delay_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "retry.base_delay_ms"));
    }

    #[test]
    fn max_delay_below_base_fails() {
        let mut config = MirageConfig::default();
        config.retry.max_delay_ms = Some(100);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "retry.max_delay_ms"));
    }

    #[test]
    fn bad_host_fails() {
        let mut config = MirageConfig::default();
        config.gateway.host = "not a host!".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "gateway.host"));
    }

    #[test]
    fn zero_quota_fails_per_class() {
        let mut config = MirageConfig::default();
        config.rate_limit.upload.max_requests = 0;
        config.rate_limit.search.window_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "rate_limit.upload.max_requests"));
        assert!(has_error(&errors, "rate_limit.search.window_ms"));
    }

    #[test]
    fn oversized_video_wait_fails() {
        let mut config = MirageConfig::default();
        config.video.max_wait_secs = u64::MAX / 2;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "video.max_wait_secs must be at most"));
    }

    #[test]
    fn video_wait_shorter_than_interval_fails() {
        let mut config = MirageConfig::default();
        config.video.max_wait_secs = 1;
        config.video.poll_interval_ms = 5_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "cover at least one poll interval"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = MirageConfig::default();
        config.retry.base_delay_ms = 0;
        config.video.poll_interval_ms = 0;
        config.gemini.text_model = " ".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "got: {errors:?}");
    }
}
