// Classifier
// Detection prompt and lenient parsing of the model's JSON verdict

use crate::models::{lenient_strings, Classification, ConfidenceLevel};
use crate::services::providers::ProviderError;
use crate::services::text_processor::{extract_json, strip_code_fences};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("No text provided")]
    EmptyText,
    #[error("Classification request failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("Invalid classification payload: {0}")]
    InvalidPayload(String),
}

pub fn build_detection_prompt(text: &str) -> String {
    format!(
        r#"Analyze the following text for AI generation.
Return ONLY a valid JSON object with the following schema, no markdown blocks:
{{
  "humanScore": <integer 0-100>,
  "aiScore": <integer 0-100>,
  "confidence": "<Low | Medium | High>",
  "aiSentences": ["<sentences most likely AI generated, copied verbatim>", "..."],
  "analysis": "<short explanation>"
}}

Text to analyze:
{}
"#,
        text
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassification {
    human_score: f64,
    ai_score: f64,
    confidence: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    ai_sentences: Vec<String>,
    #[serde(default)]
    analysis: Option<String>,
}

fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

/// Parse the model reply into a classification.
pub fn parse_classification(content: &str) -> Result<Classification, ClassificationError> {
    let cleaned = strip_code_fences(content);
    let json_str = extract_json(&cleaned).map_err(ClassificationError::InvalidPayload)?;
    let raw: RawClassification = serde_json::from_str(&json_str)
        .map_err(|e| ClassificationError::InvalidPayload(format!("JSON parse error: {}", e)))?;

    let confidence: ConfidenceLevel = raw
        .confidence
        .parse()
        .map_err(ClassificationError::InvalidPayload)?;

    Ok(Classification {
        human_score: clamp_score(raw.human_score),
        ai_score: clamp_score(raw.ai_score),
        confidence,
        ai_sentences: raw.ai_sentences,
        analysis: raw.analysis.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_reply() {
        let reply = r#"```json
{"humanScore": 30, "aiScore": 70, "confidence": "High",
 "aiSentences": ["It is important to note.", 42, "In conclusion."],
 "analysis": "Formulaic transitions."}
```"#;
        let c = parse_classification(reply).unwrap();
        assert_eq!(c.human_score, 30);
        assert_eq!(c.ai_score, 70);
        assert_eq!(c.confidence, ConfidenceLevel::High);
        assert_eq!(c.ai_sentences, vec!["It is important to note.", "In conclusion."]);
        assert_eq!(c.analysis, "Formulaic transitions.");
    }

    #[test]
    fn test_scores_are_rounded_and_clamped() {
        let reply = r#"{"humanScore": 12.6, "aiScore": 140, "confidence": "low"}"#;
        let c = parse_classification(reply).unwrap();
        assert_eq!(c.human_score, 13);
        assert_eq!(c.ai_score, 100);
        assert_eq!(c.confidence, ConfidenceLevel::Low);
        assert!(c.ai_sentences.is_empty());
        assert_eq!(c.analysis, "");
    }

    #[test]
    fn test_reply_with_prose_around_json() {
        let reply = r#"Here you go: {"humanScore": 50, "aiScore": 50, "confidence": "Medium", "aiSentences": null} Thanks"#;
        let c = parse_classification(reply).unwrap();
        assert_eq!(c.confidence, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_leading_json_with_trailing_prose() {
        let reply = "{\"humanScore\": 50, \"aiScore\": 50, \"confidence\": \"Medium\"}\nHope this helps!";
        let c = parse_classification(reply).unwrap();
        assert_eq!(c.human_score, 50);
        assert_eq!(c.confidence, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(
            parse_classification("I cannot help with that."),
            Err(ClassificationError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_classification(r#"{"humanScore": 1, "aiScore": 2, "confidence": "Certain"}"#),
            Err(ClassificationError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_classification(r#"{"aiScore": 2, "confidence": "Low"}"#),
            Err(ClassificationError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_prompt_embeds_text() {
        let prompt = build_detection_prompt("My essay.");
        assert!(prompt.ends_with("My essay.\n"));
        assert!(prompt.contains("\"aiSentences\""));
    }
}
