// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini adapter for the Mirage feed generator.
//!
//! Implements [`GenerativeAdapter`] over the Gemini REST API: structured JSON
//! output, image synthesis, text-to-speech, and long-running video jobs.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use mirage_config::model::GeminiConfig;
use mirage_core::error::MirageError;
use mirage_core::traits::{GenerativeAdapter, PluginAdapter};
use mirage_core::types::{
    AdapterType, GeneratedMedia, HealthStatus, ImageRequest, SpeechRequest, StructuredRequest,
    VideoOperation, VideoRequest,
};
use tracing::{debug, info};

use crate::client::GeminiClient;
use crate::types::{
    GenerateContentRequest, GenerationConfig, ImageConfig, InlineData, OperationResponse,
    PredictLongRunningRequest, SpeechConfig, VideoImage, VideoInstance, VideoParameters,
};

/// Environment variable consulted when `gemini.api_key` is unset.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Gemini provider implementing [`GenerativeAdapter`].
///
/// API key resolution order: config -> `GEMINI_API_KEY` env var -> error.
pub struct GeminiProvider {
    client: GeminiClient,
    text_model: String,
    image_model: String,
    tts_model: String,
    video_model: String,
    voice: String,
}

impl GeminiProvider {
    /// Creates a provider from the `[gemini]` config section.
    pub fn new(config: &GeminiConfig) -> Result<Self, MirageError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = GeminiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        info!(
            text_model = config.text_model,
            video_model = config.video_model,
            "Gemini provider initialized"
        );

        Ok(Self::with_client(client, config))
    }

    /// Creates a provider around an existing client.
    pub fn with_client(client: GeminiClient, config: &GeminiConfig) -> Self {
        Self {
            client,
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            tts_model: config.tts_model.clone(),
            video_model: config.video_model.clone(),
            voice: config.voice.clone(),
        }
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generative
    }

    async fn health_check(&self) -> Result<HealthStatus, MirageError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MirageError> {
        Ok(())
    }
}

#[async_trait]
impl GenerativeAdapter for GeminiProvider {
    async fn generate_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<serde_json::Value, MirageError> {
        let body = GenerateContentRequest::prompt(
            request.prompt,
            GenerationConfig {
                response_mime_type: Some("application/json".into()),
                response_schema: Some(request.schema),
                ..Default::default()
            },
        );
        let response = self.client.generate_content(&self.text_model, &body).await?;
        let text = response
            .text()
            .ok_or_else(|| MirageError::provider("structured response contained no text"))?;

        serde_json::from_str(strip_code_fence(&text)).map_err(|e| MirageError::Provider {
            message: format!("structured response was not valid JSON: {e}"),
            status: None,
            code: None,
            source: Some(Box::new(e)),
        })
    }

    async fn generate_image(
        &self,
        request: ImageRequest,
    ) -> Result<Option<GeneratedMedia>, MirageError> {
        let body = GenerateContentRequest::prompt(
            request.prompt,
            GenerationConfig {
                response_modalities: Some(vec!["IMAGE".into()]),
                image_config: Some(ImageConfig {
                    aspect_ratio: request.aspect_ratio.to_string(),
                }),
                ..Default::default()
            },
        );
        let response = self.client.generate_content(&self.image_model, &body).await?;
        match response.inline_data() {
            Some(inline) => decode_inline(inline).map(Some),
            None => {
                debug!(model = self.image_model, "image response carried no inline data");
                Ok(None)
            }
        }
    }

    async fn synthesize_speech(
        &self,
        request: SpeechRequest,
    ) -> Result<GeneratedMedia, MirageError> {
        let voice = request.voice.unwrap_or_else(|| self.voice.clone());
        let body = GenerateContentRequest::prompt(
            request.text,
            GenerationConfig {
                response_modalities: Some(vec!["AUDIO".into()]),
                speech_config: Some(SpeechConfig::voice(voice)),
                ..Default::default()
            },
        );
        let response = self.client.generate_content(&self.tts_model, &body).await?;
        let inline = response
            .inline_data()
            .ok_or_else(|| MirageError::provider("speech response carried no audio"))?;
        decode_inline(inline)
    }

    async fn submit_video(&self, request: VideoRequest) -> Result<VideoOperation, MirageError> {
        let image = request.image.map(|media| VideoImage {
            bytes_base64_encoded: BASE64.encode(&media.data),
            mime_type: media.mime_type,
        });
        let body = PredictLongRunningRequest {
            instances: vec![VideoInstance {
                prompt: request.prompt,
                image,
            }],
            parameters: VideoParameters {
                aspect_ratio: request.aspect_ratio.to_string(),
            },
        };
        let op = self
            .client
            .predict_long_running(&self.video_model, &body)
            .await?;
        info!(operation = op.name, "video job submitted");
        Ok(to_video_operation(op))
    }

    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation, MirageError> {
        let op = self.client.get_operation(&operation.name).await?;
        Ok(to_video_operation(op))
    }

    async fn fetch_asset(&self, locator: &str) -> Result<GeneratedMedia, MirageError> {
        let (mime_type, bytes) = self.client.download(locator).await?;
        Ok(GeneratedMedia {
            mime_type,
            data: bytes.to_vec(),
        })
    }
}

/// API key from config, falling back to [`API_KEY_ENV`].
fn resolve_api_key(config_key: &Option<String>) -> Result<String, MirageError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            MirageError::Config(format!(
                "Gemini API key not found. Set gemini.api_key in config or {API_KEY_ENV} environment variable."
            ))
        })
}

fn decode_inline(inline: &InlineData) -> Result<GeneratedMedia, MirageError> {
    let data = BASE64
        .decode(inline.data.as_bytes())
        .map_err(|e| MirageError::Media(format!("invalid base64 inline data: {e}")))?;
    Ok(GeneratedMedia {
        mime_type: inline.mime_type.clone(),
        data,
    })
}

fn to_video_operation(op: OperationResponse) -> VideoOperation {
    VideoOperation {
        locator: op.video_uri().map(str::to_string),
        error: op.error.map(|e| e.message),
        done: op.done,
        name: op.name,
    }
}

/// Models sometimes wrap JSON output in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
