// Text Analyzer
// The seam between request handlers and the generative-AI provider

use async_trait::async_trait;
use tracing::{info, warn};

use super::classifier::{build_detection_prompt, parse_classification, ClassificationError};
use super::humanizer::{build_rewrite_prompt, finish_rewrite, RewriteError};
use crate::models::Classification;
use crate::services::providers::ProviderClient;
use crate::services::text_processor::preview;

#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError>;
    async fn rewrite(&self, text: &str) -> Result<String, RewriteError>;
}

/// Gemini-backed analyzer. One provider round trip per call.
pub struct GeminiAnalyzer {
    client: ProviderClient,
}

impl GeminiAnalyzer {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextAnalyzer for GeminiAnalyzer {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        if text.trim().is_empty() {
            return Err(ClassificationError::EmptyText);
        }

        let result = self.client.generate(&build_detection_prompt(text)).await?;
        match parse_classification(&result.content) {
            Ok(classification) => {
                info!(
                    model = self.client.model(),
                    latency_ms = result.latency_ms,
                    ai_score = classification.ai_score,
                    confidence = %classification.confidence,
                    flagged = classification.ai_sentences.len(),
                    "[ANALYZER] classification ok"
                );
                Ok(classification)
            }
            Err(e) => {
                warn!(
                    reply = %preview(&result.content, 200),
                    "[ANALYZER] unparseable classification: {}", e
                );
                Err(e)
            }
        }
    }

    async fn rewrite(&self, text: &str) -> Result<String, RewriteError> {
        if text.trim().is_empty() {
            return Err(RewriteError::EmptyText);
        }

        let result = self.client.generate(&build_rewrite_prompt(text)).await?;
        let rewritten = finish_rewrite(&result.content)?;
        info!(
            model = self.client.model(),
            latency_ms = result.latency_ms,
            input_chars = text.chars().count(),
            output_chars = rewritten.chars().count(),
            "[ANALYZER] rewrite ok"
        );
        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_text_rejected_before_network() {
        let analyzer = GeminiAnalyzer::new(ProviderClient::new("http://127.0.0.1:9", "m", None, 1));
        assert!(matches!(analyzer.classify("   ").await, Err(ClassificationError::EmptyText)));
        assert!(matches!(analyzer.rewrite("").await, Err(RewriteError::EmptyText)));
    }

    #[tokio::test]
    async fn test_missing_key_surfaces_as_provider_error() {
        let analyzer = GeminiAnalyzer::new(ProviderClient::new("http://127.0.0.1:9", "m", None, 1));
        let err = analyzer.classify("Some text.").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Provider(_)));
    }
}
