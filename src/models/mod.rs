// Humyze Data Models
// Shapes shared by the HTTP layer, the store and the renderer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ============ Confidence ============

/// Document-level confidence reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum ConfidenceLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfidenceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ConfidenceLevel::Low),
            "medium" => Ok(ConfidenceLevel::Medium),
            "high" => Ok(ConfidenceLevel::High),
            other => Err(format!("unrecognized confidence label: {:?}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for ConfidenceLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Accepts any JSON array (or null) and keeps only its string entries.
/// Classifier output is not trusted to be homogeneous.
pub fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

/// Stored confidence column: unknown or non-string labels read as `None`
/// so one odd row cannot fail a whole listing.
pub fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<ConfidenceLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

// ============ Classification ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub human_score: u8,
    pub ai_score: u8,
    pub confidence: ConfidenceLevel,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub ai_sentences: Vec<String>,
    #[serde(default)]
    pub analysis: String,
}

// ============ Reports ============

/// One row of the `reports` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    pub original_text: String,
    #[serde(default)]
    pub human_score: Option<u8>,
    #[serde(default)]
    pub ai_score: Option<u8>,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: Option<ConfidenceLevel>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub ai_sentences: Vec<String>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub humanized_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Humanized text, when a non-empty rewrite has been stored.
    pub fn humanized(&self) -> Option<&str> {
        self.humanized_text.as_deref().filter(|t| !t.is_empty())
    }

    /// Text offered for download: the rewrite if present, else the original.
    pub fn download_text(&self) -> &str {
        self.humanized().unwrap_or(&self.original_text)
    }

    pub fn download_file_name(&self) -> String {
        let base = self.file_name.as_deref().unwrap_or("report");
        format!("Humyze_Annotated_{}.txt", base)
    }
}

/// Insert payload; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewReport {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub original_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceLevel>,
    #[serde(default)]
    pub ai_sentences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humanized_text: Option<String>,
}

impl NewReport {
    pub fn from_classification(
        user_id: &str,
        original_text: &str,
        file_name: Option<String>,
        file_url: Option<String>,
        classification: Classification,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            file_name,
            file_url,
            original_text: original_text.to_string(),
            human_score: Some(classification.human_score),
            ai_score: Some(classification.ai_score),
            confidence: Some(classification.confidence),
            ai_sentences: classification.ai_sentences,
            analysis: Some(classification.analysis),
            humanized_text: None,
        }
    }

    pub fn humanized_only(user_id: &str, original_text: &str, humanized_text: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            original_text: original_text.to_string(),
            humanized_text: Some(humanized_text.to_string()),
            ..Default::default()
        }
    }
}

// ============ Segments ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentOffsets {
    /// UTF-8 byte offset (0-based) into the original text.
    pub start: usize,
    /// UTF-8 byte offset (0-based, end-exclusive) into the original text.
    pub end: usize,
}

/// A contiguous span of the original text, plain or flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Segment {
    Plain {
        text: String,
        offsets: SegmentOffsets,
    },
    Flagged {
        text: String,
        offsets: SegmentOffsets,
        confidence: ConfidenceLevel,
    },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain { text, .. } | Segment::Flagged { text, .. } => text,
        }
    }

    pub fn offsets(&self) -> SegmentOffsets {
        match self {
            Segment::Plain { offsets, .. } | Segment::Flagged { offsets, .. } => *offsets,
        }
    }

    pub fn is_flagged(&self) -> bool {
        matches!(self, Segment::Flagged { .. })
    }
}

/// What a report shows: the rewrite verbatim, or the annotated original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ReportView {
    Humanized {
        text: String,
    },
    Annotated {
        confidence: ConfidenceLevel,
        segments: Vec<Segment>,
    },
}

// ============ Identity ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// ============ Requests & Responses ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanizeRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub report_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanizeResponse {
    pub rewritten_text: String,
    pub report: Report,
}
