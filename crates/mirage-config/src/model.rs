// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Mirage feed generator.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Mirage configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MirageConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Retry policy for outbound generative calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Plan and fill settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Video job polling settings.
    #[serde(default)]
    pub video: VideoConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Admission control settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name used in logs.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "mirage".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// Gemini API key. `None` requires the `GEMINI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for plans, drafts, metadata, and scripts.
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Model used for image synthesis.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Model used for text-to-speech.
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    /// Model used for video jobs.
    #[serde(default = "default_video_model")]
    pub video_model: String,

    /// Prebuilt voice name for speech synthesis.
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            tts_model: default_tts_model(),
            video_model: default_video_model(),
            voice: default_voice(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_video_model() -> String {
    "veo-3.0-fast-generate-001".to_string()
}

fn default_voice() -> String {
    "Kore".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Retry policy for generative calls.
///
/// Retry `n` (1-based) waits `base_delay_ms * 2^n`, so the defaults wait
/// 8s, 16s, 32s, 64s, 128s.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first failed attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Optional cap on a single wait, in milliseconds.
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: None,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay_ms.map(Duration::from_millis)
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    4000
}

/// Plan and fill configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Hard cap on items per batch.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Items generated when the caller does not specify a count.
    #[serde(default = "default_default_items")]
    pub default_items: usize,

    /// Cool-down between consecutive fills, in milliseconds.
    #[serde(default = "default_inter_item_delay_ms")]
    pub inter_item_delay_ms: u64,

    /// Upper bound of the random offset added to the comment counter.
    #[serde(default = "default_max_comment_offset")]
    pub max_comment_offset: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            default_items: default_default_items(),
            inter_item_delay_ms: default_inter_item_delay_ms(),
            max_comment_offset: default_max_comment_offset(),
        }
    }
}

impl PipelineConfig {
    pub fn inter_item_delay(&self) -> Duration {
        Duration::from_millis(self.inter_item_delay_ms)
    }
}

fn default_max_items() -> usize {
    5
}

fn default_default_items() -> usize {
    3
}

fn default_inter_item_delay_ms() -> u64 {
    8000
}

fn default_max_comment_offset() -> u32 {
    40
}

/// Video job polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VideoConfig {
    /// Interval between status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up waiting (reporting "still processing") after this many seconds.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl VideoConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_max_wait_secs() -> u64 {
    600
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Enable the HTTP gateway.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Deadline for non-streaming requests, in seconds.
    #[serde(default = "default_gateway_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Key admission on the first `x-forwarded-for` hop. Enable only behind
    /// a proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,

    /// Key admission on the `x-client-id` header.
    #[serde(default)]
    pub trust_client_id: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            request_timeout_secs: default_gateway_request_timeout_secs(),
            trust_forwarded_for: false,
            trust_client_id: false,
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_request_timeout_secs() -> u64 {
    30
}

/// Admission control configuration: one fixed-window quota per endpoint class.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Seconds between sweeps of expired counters.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Reads and lightweight requests.
    #[serde(default = "default_general_class")]
    pub general: RateLimitClassConfig,

    /// Content creation (generation batches).
    #[serde(default = "default_create_class")]
    pub create: RateLimitClassConfig,

    /// Media-heavy requests (video jobs, uploads).
    #[serde(default = "default_upload_class")]
    pub upload: RateLimitClassConfig,

    /// Conversational requests.
    #[serde(default = "default_chat_class")]
    pub chat: RateLimitClassConfig,

    /// Search requests.
    #[serde(default = "default_search_class")]
    pub search: RateLimitClassConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            general: default_general_class(),
            create: default_create_class(),
            upload: default_upload_class(),
            chat: default_chat_class(),
            search: default_search_class(),
        }
    }
}

impl RateLimitConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// All classes with their names, in a stable order.
    pub fn classes(&self) -> [(&'static str, &RateLimitClassConfig); 5] {
        [
            ("general", &self.general),
            ("create", &self.create),
            ("upload", &self.upload),
            ("chat", &self.chat),
            ("search", &self.search),
        ]
    }
}

/// Quota for one endpoint class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitClassConfig {
    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests admitted per window.
    pub max_requests: u32,
}

impl RateLimitClassConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_general_class() -> RateLimitClassConfig {
    RateLimitClassConfig {
        window_ms: 60_000,
        max_requests: 100,
    }
}

fn default_create_class() -> RateLimitClassConfig {
    RateLimitClassConfig {
        window_ms: 60_000,
        max_requests: 10,
    }
}

fn default_upload_class() -> RateLimitClassConfig {
    RateLimitClassConfig {
        window_ms: 60_000,
        max_requests: 5,
    }
}

fn default_chat_class() -> RateLimitClassConfig {
    RateLimitClassConfig {
        window_ms: 60_000,
        max_requests: 30,
    }
}

fn default_search_class() -> RateLimitClassConfig {
    RateLimitClassConfig {
        window_ms: 60_000,
        max_requests: 60,
    }
}
