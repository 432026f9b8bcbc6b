use anyhow::Context;
use humyze_lib::models::{ConfidenceLevel, Segment};
use humyze_lib::services::text_processor::preview;
use humyze_lib::services::{
    extract_document_text, render_segments, ConfigStore, GeminiAnalyzer, TextAnalyzer,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_arg_values(args: &[String], key: &str) -> Vec<String> {
    args.windows(2)
        .filter(|w| w[0] == key)
        .map(|w| w[1].clone())
        .collect()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  cargo run --bin annotate -- <path.(pdf|docx|txt)> [--flag <sentence>]... [--classify] [--confidence <low|medium|high>] [--segments <n>] [--out <json_path>]\n\nNotes:\n  - `--flag` may be repeated; each value is highlighted like a classifier-flagged sentence.\n  - `--classify` asks Gemini for the flagged sentences instead (needs GEMINI_API_KEY)."
        );
        return Ok(());
    }

    humyze_lib::init_console_only_logging(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    );

    let path = args[1].clone();
    let mut flagged = parse_arg_values(&args, "--flag");
    let classify = has_flag(&args, "--classify");
    let mut confidence: ConfidenceLevel = match parse_arg_value(&args, "--confidence") {
        Some(c) => c.parse().map_err(anyhow::Error::msg)?,
        None => ConfidenceLevel::default(),
    };
    let segments_n: usize = parse_arg_value(&args, "--segments")
        .and_then(|s| s.parse().ok())
        .unwrap_or(50);
    let out_path = parse_arg_value(&args, "--out");

    let bytes = std::fs::read(&path).with_context(|| format!("read file failed: {}", path))?;
    let file_name = std::path::Path::new(&path)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "input.txt".to_string());

    let text = extract_document_text(&file_name, &bytes)?;

    println!("File: {}", path);
    println!("Extracted: {} chars ({} bytes)", text.chars().count(), text.len());

    let mut scores: Option<(u8, u8)> = None;
    if classify {
        let config_dir = ConfigStore::default_config_dir()
            .context("Cannot determine config directory")?;
        let mut config = ConfigStore::new(config_dir)
            .load()
            .map_err(anyhow::Error::msg)?;
        config.apply_env();

        let analyzer = GeminiAnalyzer::new(humyze_lib::gemini_client(&config));
        let classification = analyzer.classify(&text).await?;
        println!(
            "Classification: human={} ai={} confidence={}",
            classification.human_score, classification.ai_score, classification.confidence
        );
        println!("Analysis: {}", preview(&classification.analysis, 200));
        scores = Some((classification.human_score, classification.ai_score));
        confidence = classification.confidence;
        flagged.extend(classification.ai_sentences);
    }
    println!("Flagged entries: {}", flagged.len());
    println!();

    let segments = render_segments(&text, &flagged, confidence);
    let flagged_count = segments.iter().filter(|s| s.is_flagged()).count();
    println!("Segments: {} ({} flagged)", segments.len(), flagged_count);
    for (i, seg) in segments.iter().take(segments_n).enumerate() {
        let offsets = seg.offsets();
        println!(
            "[{}{:04}] bytes=[{},{}]  {}",
            if seg.is_flagged() { "F" } else { "P" },
            i,
            offsets.start,
            offsets.end,
            preview(seg.text(), 120)
        );
    }
    if segments.len() > segments_n {
        println!("... ({} more segments)", segments.len() - segments_n);
    }

    if let Some(out_path) = out_path {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Output {
            file: String,
            extracted_chars: usize,
            #[serde(skip_serializing_if = "Option::is_none")]
            human_score: Option<u8>,
            #[serde(skip_serializing_if = "Option::is_none")]
            ai_score: Option<u8>,
            confidence: ConfidenceLevel,
            flagged: Vec<String>,
            segments: Vec<Segment>,
        }

        let out = Output {
            file: path.clone(),
            extracted_chars: text.chars().count(),
            human_score: scores.map(|s| s.0),
            ai_score: scores.map(|s| s.1),
            confidence,
            flagged,
            segments,
        };

        let json = serde_json::to_string_pretty(&out)?;
        std::fs::write(&out_path, json).with_context(|| format!("write out failed: {}", out_path))?;
        println!();
        println!("Wrote JSON: {}", out_path);
    }

    Ok(())
}
