// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Mirage configuration system.

use mirage_config::diagnostic::ConfigError;
use mirage_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_mirage_config() {
    let toml = r#"
[app]
name = "feed-lab"
log_level = "debug"

[gemini]
api_key = "g-123"
text_model = "gemini-2.5-pro"
voice = "Puck"

[retry]
max_retries = 3
base_delay_ms = 500
max_delay_ms = 10000

[pipeline]
max_items = 4
default_items = 2
inter_item_delay_ms = 1000

[video]
poll_interval_ms = 2000
max_wait_secs = 120

[gateway]
host = "0.0.0.0"
port = 8080
trust_forwarded_for = true

[rate_limit]
sweep_interval_secs = 30

[rate_limit.create]
window_ms = 10000
max_requests = 2
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.app.name, "feed-lab");
    assert_eq!(config.gemini.api_key.as_deref(), Some("g-123"));
    assert_eq!(config.gemini.text_model, "gemini-2.5-pro");
    assert_eq!(config.gemini.voice, "Puck");
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.max_delay_ms, Some(10000));
    assert_eq!(config.pipeline.max_items, 4);
    assert_eq!(config.pipeline.inter_item_delay_ms, 1000);
    assert_eq!(config.video.max_wait_secs, 120);
    assert_eq!(config.gateway.port, 8080);
    assert!(config.gateway.trust_forwarded_for);
    assert!(!config.gateway.trust_client_id);
    assert_eq!(config.rate_limit.sweep_interval_secs, 30);
    assert_eq!(config.rate_limit.create.max_requests, 2);
    // Untouched classes keep their defaults.
    assert_eq!(config.rate_limit.general.max_requests, 100);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.app.name, "mirage");
    assert_eq!(config.retry.base_delay_ms, 4000);
    assert_eq!(config.pipeline.inter_item_delay_ms, 8000);
    assert_eq!(config.video.poll_interval_ms, 5000);
}

#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[gemini]
api_kye = "x"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject unknown key");
    let found = errors.iter().any(|e| match e {
        ConfigError::UnknownKey { key, suggestion, .. } => {
            key == "api_kye" && suggestion.as_deref() == Some("api_key")
        }
        _ => false,
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[pipeline]
max_items = "lots"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(
        errors.iter().any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "got: {errors:?}"
    );
}

#[test]
fn semantic_violation_is_reported() {
    let toml = r#"
[pipeline]
max_items = 9
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("max_items"))));
}

#[test]
fn huge_video_wait_is_reported_not_panicked() {
    let toml = r#"
[video]
max_wait_secs = 9223372036854775807
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("video.max_wait_secs"))
    ));
}

#[test]
fn rate_limit_class_requires_both_fields() {
    let toml = r#"
[rate_limit.chat]
window_ms = 1000
"#;
    assert!(load_config_from_str(toml).is_err());
}

#[test]
#[serial_test::serial]
fn file_config_is_loaded_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirage.toml");
    std::fs::write(&path, "[gateway]\nport = 9191\n").unwrap();

    let config = load_and_validate_path(&path).expect("file should load");
    assert_eq!(config.gateway.port, 9191);
}
