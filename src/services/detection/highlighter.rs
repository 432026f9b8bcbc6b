// Highlighter
// Partitions a document into plain and flagged segments using the
// classifier's flagged sentences as split points.
//
// Entries are matched longest-first against a single forward cursor.
// Each entry consumes at most one occurrence and text behind the cursor
// is never revisited, so partially overlapping entries resolve in sort order.

use crate::models::{ConfidenceLevel, Report, ReportView, Segment, SegmentOffsets};
use tracing::debug;

/// Drop blank entries, order the rest longest-first (stable, by the UTF-16
/// length of the entry as received) and trim them.
pub fn normalize_flagged<S: AsRef<str>>(flagged: &[S]) -> Vec<&str> {
    let mut entries: Vec<&str> = flagged
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| !s.trim().is_empty())
        .collect();
    entries.sort_by_key(|s| std::cmp::Reverse(s.encode_utf16().count()));
    entries.into_iter().map(str::trim).collect()
}

/// Split `original` into segments. Never fails: entries that do not occur in
/// the remaining text are skipped.
pub fn render_segments<S: AsRef<str>>(
    original: &str,
    flagged: &[S],
    confidence: ConfidenceLevel,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0usize;

    for needle in normalize_flagged(flagged) {
        let Some(pos) = original[cursor..].find(needle) else {
            debug!(chars = needle.chars().count(), "flagged sentence not found, skipping");
            continue;
        };

        let start = cursor + pos;
        let end = start + needle.len();
        if start > cursor {
            segments.push(plain(original, cursor, start));
        }
        segments.push(Segment::Flagged {
            text: needle.to_string(),
            offsets: SegmentOffsets { start, end },
            confidence,
        });
        cursor = end;
    }

    if cursor < original.len() {
        segments.push(plain(original, cursor, original.len()));
    }

    segments
}

fn plain(original: &str, start: usize, end: usize) -> Segment {
    Segment::Plain {
        text: original[start..end].to_string(),
        offsets: SegmentOffsets { start, end },
    }
}

/// The humanized rewrite, when present, replaces the highlighted view entirely.
pub fn render_report(report: &Report) -> ReportView {
    if let Some(text) = report.humanized() {
        return ReportView::Humanized {
            text: text.to_string(),
        };
    }

    let confidence = report.confidence.unwrap_or_default();
    ReportView::Annotated {
        confidence,
        segments: render_segments(&report.original_text, &report.ai_sentences, confidence),
    }
}
