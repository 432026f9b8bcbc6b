// Text Processing Service
// Upload text extraction and model-reply cleanup

use regex::Regex;
use std::io::{Cursor, Read};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file format: {0} (expected .pdf, .docx or .txt)")]
    UnsupportedFormat(String),
    #[error("Failed to read PDF: {0}")]
    Pdf(String),
    #[error("Failed to read DOCX: {0}")]
    Docx(String),
    #[error("No text could be extracted from {0}")]
    Empty(String),
    #[error("Text extraction aborted for {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = std::path::Path::new(file_name)
            .extension()?
            .to_string_lossy()
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::Text),
            _ => None,
        }
    }
}

/// Extract plain text from an uploaded document.
pub fn extract_document_text(file_name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let kind = DocumentKind::from_file_name(file_name)
        .ok_or_else(|| ExtractError::UnsupportedFormat(file_name.to_string()))?;

    let raw = match kind {
        DocumentKind::Text => String::from_utf8_lossy(bytes).into_owned(),
        DocumentKind::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?
        }
        DocumentKind::Docx => extract_docx_text(bytes)?,
    };

    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        return Err(ExtractError::Empty(file_name.to_string()));
    }
    Ok(text)
}

fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    match docx_rs::read_docx(bytes) {
        Ok(docx) => Ok(docx_paragraphs(&docx).join("\n")),
        Err(e) => {
            tracing::debug!("docx-rs rejected package ({:?}), reading document.xml directly", e);
            extract_docx_xml(bytes)
        }
    }
}

fn docx_paragraphs(docx: &docx_rs::Docx) -> Vec<String> {
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    docx.document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(p) => Some(p),
            _ => None,
        })
        .map(|p| {
            let mut line = String::new();
            for pc in &p.children {
                if let ParagraphChild::Run(run) = pc {
                    for rc in &run.children {
                        match rc {
                            RunChild::Text(t) => line.push_str(&t.text),
                            RunChild::Tab(_) => line.push('\t'),
                            _ => {}
                        }
                    }
                }
            }
            line
        })
        .collect()
}

/// Fallback for packages docx-rs cannot parse: pull `<w:t>` runs out of
/// `word/document.xml`, one line per `<w:p>`.
fn extract_docx_xml(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let lines: Vec<String> = paragraph_re()
        .find_iter(&xml)
        .map(|p| {
            text_run_re()
                .captures_iter(p.as_str())
                .map(|c| unescape_xml(&c[1]))
                .collect::<String>()
        })
        .collect();

    Ok(lines.join("\n"))
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>").expect("valid regex"))
}

fn text_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>").expect("valid regex"))
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Collapse horizontal whitespace, trim each line, and drop runs of blank
/// lines down to a single paragraph break.
pub fn normalize_whitespace(text: &str) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    let ws = WS.get_or_init(|| Regex::new(r"[ \t\x0C\x0B\u{00A0}\u{3000}]+").expect("valid regex"));

    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out: Vec<String> = Vec::new();
    let mut blank_run = 0;
    for line in normalized.lines() {
        let line = ws.replace_all(line, " ").trim().to_string();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// Remove Markdown code fences the model sometimes wraps JSON in.
pub fn strip_code_fences(content: &str) -> String {
    content.replace("```json", "").replace("```", "").trim().to_string()
}

/// Extract the outermost JSON object from response content, ignoring any
/// prose before or after it.
pub fn extract_json(content: &str) -> Result<String, String> {
    let start = content.find('{').ok_or_else(|| "No JSON in response".to_string())?;
    match content.rfind('}') {
        Some(end) if end > start => Ok(content[start..=end].to_string()),
        _ => Err("Invalid JSON response".to_string()),
    }
}

/// First `max_chars` characters on one line, for logs and CLI output.
pub fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_document_kind_from_extension() {
        assert_eq!(DocumentKind::from_file_name("Essay.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_file_name("a.b.docx"), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_file_name("notes.txt"), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_file_name("image.png"), None);
        assert_eq!(DocumentKind::from_file_name("README"), None);
    }

    #[test]
    fn test_extract_plain_text() {
        let text = extract_document_text("notes.txt", "  Hello   world.  \r\n\r\n\r\nBye.\n".as_bytes())
            .unwrap();
        assert_eq!(text, "Hello world.\n\nBye.");
    }

    #[test]
    fn test_unsupported_and_empty_uploads() {
        assert!(matches!(
            extract_document_text("x.png", b"abc"),
            Err(ExtractError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            extract_document_text("blank.txt", b"  \n\t\n"),
            Err(ExtractError::Empty(_))
        ));
    }

    #[test]
    fn test_docx_falls_back_to_document_xml() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body><w:p><w:r><w:t>First &amp; foremost.</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">Second </w:t></w:r><w:r><w:t>line.</w:t></w:r></w:p></w:body></w:document>"#;
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zw = zip::ZipWriter::new(&mut buf);
            zw.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zw.write_all(xml.as_bytes()).unwrap();
            zw.finish().unwrap();
        }
        let text = extract_document_text("paper.docx", buf.get_ref()).unwrap();
        assert_eq!(text, "First & foremost.\nSecond line.");
    }

    #[test]
    fn test_strip_code_fences_and_extract_json() {
        let reply = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(reply), "{\"a\": 1}");
        assert_eq!(extract_json("Sure! {\"a\": 1} done").unwrap(), "{\"a\": 1}");
        assert_eq!(extract_json("{\"a\": 1}\nHope this helps!").unwrap(), "{\"a\": 1}");
        assert!(extract_json("no json here").is_err());
        assert!(extract_json("} {").is_err());
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("abc\ndef", 10), "abc def");
        assert_eq!(preview("abcdef", 3), "abc...");
    }
}
