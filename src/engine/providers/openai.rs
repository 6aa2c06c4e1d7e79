// Dungeon Oracle — OpenAI-Compatible Generator
// Non-streaming chat/completions against OpenAI, OpenRouter, Ollama or any
// API speaking the same wire format. One attempt per call; the caller
// decides what a failure means.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{Generation, GenerationRequest, Generator, ProviderError};
use crate::engine::config::ProviderConfig;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const ERROR_BODY_PREVIEW: usize = 200;

pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiGenerator {
    /// Fails when the HTTP client cannot be built (TLS backend setup).
    pub fn new(config: &ProviderConfig, request_timeout: Duration) -> EngineResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                error!("[provider] Could not build HTTP client: {}", e);
                EngineError::from(e)
            })?;
        Ok(OpenAiGenerator {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_secs: request_timeout.as_secs(),
        })
    }

    fn body(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system_context},
                {"role": "user", "content": request.user_context},
            ],
            "temperature": request.temperature,
        })
    }

    /// Pull text and usage out of a chat/completions response body.
    fn parse_completion(v: &Value) -> Result<Generation, ProviderError> {
        let text = v["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        let usage = &v["usage"];
        Ok(Generation {
            text,
            prompt_tokens: token_count(&usage["prompt_tokens"]),
            completion_tokens: token_count(&usage["completion_tokens"]),
        })
    }
}

/// Missing counts are zero; absurd ones saturate.
fn token_count(v: &Value) -> u32 {
    v.as_u64().map(|n| u32::try_from(n).unwrap_or(u32::MAX)).unwrap_or(0)
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("[provider] Request to {} model={} temp={:.2}", url, self.model, request.temperature);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout_secs)
                } else {
                    ProviderError::Transport(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body_text = response.text().await.unwrap_or_default();
            let message = format!("API error {}: {}", status, preview(&body_text));
            error!("[provider] OpenAI error {}: {}", status, preview(&body_text));
            return Err(match status {
                401 | 403 => ProviderError::Auth(message),
                429 => ProviderError::RateLimited { message, retry_after_secs: retry_after },
                _ => ProviderError::Api { status, message },
            });
        }

        let v: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(format!("Unreadable response body: {}", e)))?;
        Self::parse_completion(&v)
    }
}
