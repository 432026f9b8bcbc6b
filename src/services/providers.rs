// AI Provider Service
// Gemini generateContent calls used for classification and rewriting

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

pub const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 80;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl ProviderClient {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send a single-turn prompt and return the first candidate's text.
    pub async fn generate(&self, prompt: &str) -> Result<ChatResult, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let start = Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                model = %self.model,
                status = status.as_u16(),
                latency_ms,
                "gemini.request_failed"
            );
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = extract_candidate_text(&data).ok_or(ProviderError::MissingContent)?;

        info!(model = %self.model, latency_ms, chars = content.chars().count(), "gemini.ok");

        Ok(ChatResult {
            content,
            latency_ms,
        })
    }
}

/// Gemini response format: {"candidates":[{"content":{"parts":[{"text":"..."}]}}]}
pub fn extract_candidate_text(data: &serde_json::Value) -> Option<String> {
    data["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_candidate_text() {
        let data = json!({
            "candidates": [{"content": {"parts": [{"text": "hello"}], "role": "model"}}]
        });
        assert_eq!(extract_candidate_text(&data).as_deref(), Some("hello"));
        assert_eq!(extract_candidate_text(&json!({"candidates": []})), None);
        assert_eq!(extract_candidate_text(&json!({})), None);
    }

    #[test]
    fn test_endpoint_uses_model_and_trims_slash() {
        let client = ProviderClient::new("http://localhost:9000/v1beta/", "gemini-x", None, 5);
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-x:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_fast() {
        let client = ProviderClient::new("http://127.0.0.1:9", GEMINI_DEFAULT_MODEL, None, 1);
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey));
    }
}
