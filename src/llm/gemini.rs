//! Gemini API client implementation
//!
//! This module implements the Generator trait for the Gemini
//! `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::LlmConfig;
use crate::error::{ChunkdError, Result};
use crate::llm::client::Generator;
use crate::llm::schema::{ResponseShape, block_reason};
use crate::llm::types::GenerationRequest;

/// Longest slice of an upstream body copied into error messages
const MAX_ERROR_BODY: usize = 500;

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    shape: ResponseShape,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::with_api_key(api_key, config)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: &LlmConfig) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(ChunkdError::Configuration("Gemini API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ChunkdError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            shape: config.response_shape,
        })
    }

    /// URL of the generateContent method for a model (key goes in the query)
    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Build the request body for the generateContent API
    fn build_request(&self, request: &GenerationRequest) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }]
            }],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_output_tokens
            }
        })
    }

    /// Pull the generated text out of a response body
    fn parse_response(&self, body: &Value) -> Result<String> {
        if let Some(text) = self.shape.extract(body) {
            return Ok(text);
        }

        log::error!("Gemini returned no content: {}", body);
        match block_reason(body) {
            Some(reason) => Err(ChunkdError::Upstream(format!("Prompt blocked by Gemini: {}", reason))),
            None => Err(ChunkdError::Upstream("No content returned from Gemini".to_string())),
        }
    }

    /// Send a request to the Gemini API
    async fn send_request(&self, model: &str, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            // The URL carries the key, keep it out of messages
            .map_err(|e| ChunkdError::Upstream(format!("Request failed: {}", e.without_url())))?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Gemini API error {}: {}", status, error_body);
            return Err(ChunkdError::Upstream(format!(
                "API error {}: {}",
                status,
                truncate(&error_body, MAX_ERROR_BODY)
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ChunkdError::Upstream(format!("Failed to parse response: {}", e.without_url())))
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        log::debug!(
            "Calling {} (prompt {} chars, maxOutputTokens {})",
            request.model,
            request.prompt.len(),
            request.max_output_tokens
        );
        let body = self.build_request(&request);
        let response = self.send_request(&request.model, body).await?;
        self.parse_response(&response)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("shape", &self.shape)
            .finish()
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
