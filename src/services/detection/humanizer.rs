// Humanizer
// Rewrite prompt and reply handling

use crate::services::providers::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("No text provided")]
    EmptyText,
    #[error("Rewrite request failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("Rewrite returned no text")]
    EmptyRewrite,
}

pub fn build_rewrite_prompt(text: &str) -> String {
    format!(
        "Rewrite the following text to sound highly natural and human-like.\n\
         Remove any robotic tone, complex AI-style phrasing, or repetitive structures.\n\
         Make it engaging, conversational yet professional. Return only the rewritten text.\n\n\
         Text to rewrite:\n{}\n",
        text
    )
}

/// Trim the model reply; an all-blank reply is a failure.
pub fn finish_rewrite(content: &str) -> Result<String, RewriteError> {
    let text = content.trim();
    if text.is_empty() {
        return Err(RewriteError::EmptyRewrite);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_rewrite() {
        assert_eq!(finish_rewrite("\n  New text.  \n").unwrap(), "New text.");
        assert!(matches!(finish_rewrite("  \n"), Err(RewriteError::EmptyRewrite)));
    }

    #[test]
    fn test_prompt_embeds_text() {
        let prompt = build_rewrite_prompt("Original words.");
        assert!(prompt.contains("Text to rewrite:\nOriginal words.\n"));
    }
}
