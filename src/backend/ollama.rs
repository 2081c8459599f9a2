//! Ollama chat API backend.
//!
//! Implements both backend capabilities on top of `POST /api/chat`
//! with streaming disabled.

use super::{parse_analysis_content, AnalysisBackend, AnalysisReply, SynthesisBackend, SynthesisReply};
use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for one model.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Ask Ollama to constrain output to JSON.
    pub json_output: bool,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.3,
            timeout_seconds: 300,
            json_output: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaChatResponse {
    fn tokens_used(&self) -> u64 {
        self.prompt_eval_count.unwrap_or(0) + self.eval_count.unwrap_or(0)
    }
}

/// A model served by Ollama.
pub struct OllamaBackend {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaBackend {
    /// Create a backend for `config`.
    pub fn new(config: OllamaConfig) -> Result<Self, reqwest::Error> {
        info!(
            "Initializing Ollama backend with model {} at {}",
            config.model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Send a system + user prompt and return the reply.
    async fn chat(&self, system: &str, user: &str) -> Result<OllamaChatResponse, BackendError> {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));

        let request = OllamaChatRequest {
            model: &self.config.model_name,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            stream: false,
            format: self.config.json_output.then_some("json"),
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!(
            "Sending chat request to {} ({} bytes)",
            self.config.model_name,
            user.len()
        );

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Transient(format!(
                        "request timed out after {}s",
                        self.config.timeout_seconds
                    ))
                } else if e.is_connect() {
                    BackendError::Transient(format!(
                        "cannot connect to Ollama at {}",
                        self.config.ollama_url
                    ))
                } else {
                    BackendError::Failed(format!("failed to send request: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        response
            .json::<OllamaChatResponse>()
            .await
            .map_err(|e| BackendError::Failed(format!("failed to parse Ollama response: {}", e)))
    }
}

/// Map an unsuccessful HTTP response onto the backend error taxonomy.
fn classify_failure(status: reqwest::StatusCode, body: &str) -> BackendError {
    let lowered = body.to_lowercase();
    let detail = format!("Ollama API error {}: {}", status, body);

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        BackendError::RateLimited(detail)
    } else if lowered.contains("context length")
        || lowered.contains("context_length_exceeded")
        || lowered.contains("context window")
    {
        BackendError::ContextLengthExceeded(detail)
    } else if status.is_server_error() {
        BackendError::Transient(detail)
    } else {
        BackendError::Failed(detail)
    }
}

#[async_trait]
impl AnalysisBackend for OllamaBackend {
    async fn analyze(
        &self,
        transcript: &str,
        instructions: &str,
    ) -> Result<AnalysisReply, BackendError> {
        let user = format!("Analyze this chat segment:\n\n{}", transcript);
        let response = self.chat(instructions, &user).await?;
        let tokens_used = response.tokens_used();

        Ok(AnalysisReply {
            messages: parse_analysis_content(&response.message.content),
            tokens_used,
        })
    }
}

#[async_trait]
impl SynthesisBackend for OllamaBackend {
    async fn synthesize(
        &self,
        payload: &str,
        instructions: &str,
    ) -> Result<SynthesisReply, BackendError> {
        let response = self.chat(instructions, payload).await?;
        let tokens_used = response.tokens_used();

        Ok(SynthesisReply {
            artifact: response.message.content,
            tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_ollama_config_default() {
        let config = OllamaConfig::default();
        assert_eq!(config.model_name, "llama3.2:latest");
        assert!(config.json_output);
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            BackendError::RateLimited(_)
        ));
        assert!(matches!(
            classify_failure(
                StatusCode::BAD_REQUEST,
                "This model's maximum context length is 8192 tokens"
            ),
            BackendError::ContextLengthExceeded(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_GATEWAY, ""),
            BackendError::Transient(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, "model not found"),
            BackendError::Failed(_)
        ));
    }

    #[test]
    fn test_response_token_usage() {
        let response: OllamaChatResponse = serde_json::from_str(
            r#"{"message": {"role": "assistant", "content": "{}"}, "done": true,
                "prompt_eval_count": 120, "eval_count": 30}"#,
        )
        .unwrap();
        assert_eq!(response.tokens_used(), 150);

        let bare: OllamaChatResponse =
            serde_json::from_str(r#"{"message": {"role": "assistant", "content": ""}}"#).unwrap();
        assert_eq!(bare.tokens_used(), 0);
    }

    #[test]
    fn test_request_serialization() {
        let request = OllamaChatRequest {
            model: "m",
            messages: vec![],
            stream: false,
            format: None,
            options: OllamaOptions { temperature: 0.1 },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("format"));
        assert!(json.contains("\"stream\":false"));
    }

    #[test]
    fn test_unreachable_backend_is_transient() {
        let backend = OllamaBackend::new(OllamaConfig {
            ollama_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            ..Default::default()
        })
        .unwrap();

        let result = tokio_test::block_on(backend.analyze("A: hi", "analyze"));
        assert!(matches!(result, Err(BackendError::Transient(_))));
    }
}
