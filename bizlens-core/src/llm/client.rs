//! HTTP client for the chat-completions API
//!
//! Failures map to three distinct error categories so callers can tell a
//! dead network from a rejected request from a malformed body. On any of
//! them the analysis fails; a report is never fabricated locally.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::{ApiErrorBody, ChatMessage, ChatRequest, ChatResponse};

/// Client for the external text-generation service.
pub struct ChatClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

impl ChatClient {
    /// Create a new client from configuration.
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: LlmConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Model identifier this client sends.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a message list and return the completion text.
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(
            model = %request.model,
            message_count = request.messages.len(),
            "Calling text-generation API"
        );

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::LlmNetwork(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .map(|detail| detail.message)
                .unwrap_or_else(|| "unknown error".to_string());

            return Err(Error::LlmApi {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LlmResponse(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::LlmResponse("response contained no choices".to_string()))?;

        tracing::debug!(length = content.len(), "Received completion");

        Ok(content)
    }
}
