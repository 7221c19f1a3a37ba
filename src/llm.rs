//! Completion Client - the language model behind an injectable trait
//!
//! The pipeline only ever calls [`CompletionClient::complete`]. Two HTTP
//! backends ship with the crate: a llama.cpp server hosting the local GGUF
//! model, and any OpenAI-compatible chat completions endpoint. Tests swap in
//! their own implementations.

use crate::config::{ModelConfig, ProviderConfig};
use crate::error::{AskDbError, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Generate raw text for a fully rendered prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for a llama.cpp server (`/completion` endpoint).
pub struct LlamaCppClient {
    http: reqwest::Client,
    base_url: String,
    config: ModelConfig,
}

impl LlamaCppClient {
    pub fn new(base_url: impl Into<String>, config: ModelConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config,
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        serde_json::json!({
            "prompt": prompt,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "n_predict": self.config.max_tokens,
            "stream": false,
        })
    }
}

#[async_trait]
impl CompletionClient for LlamaCppClient {
    fn name(&self) -> &str {
        "llama.cpp"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/completion", self.base_url))
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| AskDbError::Llm(format!("llama.cpp call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AskDbError::Llm(format!("llama.cpp error ({}): {}", status, error_text)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AskDbError::Llm(format!("Failed to parse llama.cpp response: {}", e)))?;

        let text = parse_llama_response(&body)?;
        debug!("llama.cpp returned {} chars", text.len());
        Ok(text)
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    config: ModelConfig,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, base_url: String, config: ModelConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "max_tokens": self.config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| AskDbError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AskDbError::Llm(format!("LLM API error ({}): {}", status, error_text)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AskDbError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        parse_chat_response(&body)
    }
}

/// Build the client named by the provider configuration.
pub fn client_from_config(
    provider: &ProviderConfig,
    model: &ModelConfig,
) -> Box<dyn CompletionClient> {
    match provider {
        ProviderConfig::LlamaCpp { base_url } => {
            info!(
                "Using llama.cpp server at {} (launch args: {})",
                base_url,
                model.server_args().join(" ")
            );
            Box::new(LlamaCppClient::new(base_url.clone(), model.clone()))
        }
        ProviderConfig::OpenAi { api_key, model: model_name, base_url } => {
            info!("Using OpenAI-compatible endpoint {} (model {})", base_url, model_name);
            Box::new(OpenAiClient::new(
                api_key.clone(),
                model_name.clone(),
                base_url.clone(),
                model.clone(),
            ))
        }
    }
}

fn parse_llama_response(body: &Value) -> Result<String> {
    if let Some(error) = body.get("error") {
        return Err(AskDbError::Llm(format!("llama.cpp error: {}", error)));
    }
    body.get("content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AskDbError::Llm("No content in llama.cpp response".to_string()))
}

fn parse_chat_response(body: &Value) -> Result<String> {
    if let Some(error) = body.get("error") {
        return Err(AskDbError::Llm(format!("LLM API error: {}", error)));
    }
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AskDbError::Llm("No content in LLM response".to_string()))
}
