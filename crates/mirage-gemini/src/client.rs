// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini REST API.
//!
//! [`GeminiClient`] builds requests, authenticates with the API key header,
//! and maps non-success responses into [`MirageError::Provider`] carrying the
//! HTTP status and the provider status string. It performs exactly one request
//! per call; retries are the caller's executor's job.

use std::time::Duration;

use bytes::Bytes;
use mirage_core::MirageError;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::types::{
    ApiErrorResponse, GenerateContentRequest, GenerateContentResponse, OperationResponse,
    PredictLongRunningRequest,
};

/// HTTP client for Gemini API communication.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Creates a client authenticating with `api_key` against `base_url`.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, MirageError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| MirageError::Config(format!("invalid API key header value: {e}")))?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| MirageError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
                code: None,
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST models/{model}:generateContent`.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, MirageError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        self.post_json(&url, request).await
    }

    /// `POST models/{model}:predictLongRunning`.
    pub async fn predict_long_running(
        &self,
        model: &str,
        request: &PredictLongRunningRequest,
    ) -> Result<OperationResponse, MirageError> {
        let url = format!("{}/models/{model}:predictLongRunning", self.base_url);
        self.post_json(&url, request).await
    }

    /// `GET {name}` for a long-running operation.
    pub async fn get_operation(&self, name: &str) -> Result<OperationResponse, MirageError> {
        let url = format!("{}/{}", self.base_url, name.trim_start_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let body = checked_body(response).await?;
        parse_json(&body)
    }

    /// Downloads an absolute asset URI. Returns the content type and bytes.
    pub async fn download(&self, uri: &str) -> Result<(String, Bytes), MirageError> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        debug!(status = %status, uri, "asset download response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok((mime_type, bytes))
    }

    async fn post_json<Req, Resp>(&self, url: &str, request: &Req) -> Result<Resp, MirageError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let body = checked_body(response).await?;
        parse_json(&body)
    }

    fn transport_error(&self, e: reqwest::Error) -> MirageError {
        if e.is_timeout() {
            return MirageError::Timeout {
                duration: self.timeout,
            };
        }
        MirageError::Provider {
            message: format!("HTTP request failed: {e}"),
            status: None,
            code: None,
            source: Some(Box::new(e)),
        }
    }
}

/// Reads the body of a success response, or converts a failure into an error.
async fn checked_body(response: reqwest::Response) -> Result<String, MirageError> {
    let status = response.status();
    debug!(status = %status, "gemini response received");

    let body = response.text().await.map_err(|e| MirageError::Provider {
        message: format!("failed to read response body: {e}"),
        status: Some(status.as_u16()),
        code: None,
        source: Some(Box::new(e)),
    })?;

    if status.is_success() {
        Ok(body)
    } else {
        Err(api_error(status, &body))
    }
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, MirageError> {
    serde_json::from_str(body).map_err(|e| MirageError::Provider {
        message: format!("failed to parse API response: {e}"),
        status: None,
        code: None,
        source: Some(Box::new(e)),
    })
}

/// Maps an error response onto a provider error with status and code.
fn api_error(status: reqwest::StatusCode, body: &str) -> MirageError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => {
            let code = api_err.error.status.clone();
            let label = code.as_deref().unwrap_or("UNKNOWN");
            MirageError::provider_status(
                format!("Gemini API error ({status}, {label}): {}", api_err.error.message),
                status.as_u16(),
                code,
            )
        }
        Err(_) => MirageError::provider_status(
            format!("API returned {status}: {body}"),
            status.as_u16(),
            None,
        ),
    }
}
