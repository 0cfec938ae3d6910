//! Language-model client
//!
//! OpenAI-compatible chat-completions client behind the `LlmClient` trait.
//! Uses a long-lived reqwest::Client for connection pooling. The client is
//! optional everywhere: agents fall back to templated output without it.

use crate::config::LlmConfig;
use crate::error::AnalyzerError;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const TEMPERATURE: f32 = 0.2;
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Text completion capability used by the agents
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String>;
}

/// Reusable chat-completions client (connection-pooled)
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(AnalyzerError::LlmError(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        info!(model = %self.model, "Calling language model");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Language model request failed: {}", e);
                AnalyzerError::LlmError(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Language model error response: {}", error_text);
            return Err(AnalyzerError::LlmError(format!(
                "API returned {}: {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse language model response: {}", e);
            AnalyzerError::LlmError(format!("parse error: {}", e))
        })?;

        let answer = extract_answer(chat_response)?;
        info!(characters = answer.len(), "Language model response received");

        Ok(answer)
    }
}

/// Build the shared client when a credential is configured.
///
/// Returns `None` (and logs why) instead of failing, so a missing or broken
/// credential never stops the service.
pub fn client_from_config(config: Option<&LlmConfig>) -> Option<Arc<dyn LlmClient>> {
    let Some(config) = config else {
        info!("OPENAI_API_KEY not set; agents will produce tool-only output");
        return None;
    };

    match OpenAiClient::new(config) {
        Ok(client) => {
            info!(model = %config.model, base_url = %config.base_url, "Language model client ready");
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!(error = %e, "Could not build language model client; using tool-only output");
            None
        }
    }
}

fn extract_answer(response: ChatResponse) -> Result<String> {
    let answer = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();

    if answer.is_empty() {
        return Err(AnalyzerError::LlmError(
            "Empty response from language model".to_string(),
        ));
    }

    Ok(answer)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
