// Detection Module
// Classification, rewriting and highlight rendering:
// - highlighter: partitions a document into plain/flagged segments
// - classifier: detection prompt and verdict parsing
// - humanizer: rewrite prompt and reply handling
// - analyzer: TextAnalyzer seam and the Gemini implementation
// - single_flight: optional one-humanization-per-report guard

pub mod analyzer;
pub mod classifier;
pub mod highlighter;
pub mod humanizer;
pub mod single_flight;

pub use analyzer::{GeminiAnalyzer, TextAnalyzer};
pub use classifier::{build_detection_prompt, parse_classification, ClassificationError};
pub use highlighter::{normalize_flagged, render_report, render_segments};
pub use humanizer::{build_rewrite_prompt, finish_rewrite, RewriteError};
pub use single_flight::{InFlightGuard, InFlightReports};
