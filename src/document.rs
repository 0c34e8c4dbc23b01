use anyhow::{Context, Result};
use log::{debug, info, warn};
use mime_guess::from_path;
use pdf_extract::extract_text;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Heading where the useful part of an exported CV begins
const CONTENT_START_MARKER: &str = "CAREER SUMMARY";

/// Represents a document with its content and metadata
#[derive(Debug, Clone)]
pub struct Document {
    /// The actual text content of the document
    pub content: String,
    /// The document's file name (used as document ID)
    pub document_id: String,
    /// The document's MIME type
    pub mime_type: String,
}

impl Document {
    /// Load a document from a file path. A missing file is an error.
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref();
        if !path.exists() {
            return Err(anyhow::anyhow!("CV document not found at {}", path.display()));
        }

        let file_name = path
            .file_name()
            .context("Invalid file name")?
            .to_str()
            .context("Invalid file name encoding")?
            .to_string();

        // Detect MIME type
        let mime = from_path(path).first_or_octet_stream();
        let mime_type = mime.to_string();
        debug!("Detected MIME type: {}", mime_type);

        let content = read_document_content(path, &mime_type)?;

        Ok(Document {
            content,
            document_id: file_name,
            mime_type,
        })
    }
}

/// Read content from a document based on its MIME type
pub fn read_document_content<P: AsRef<Path>>(file_path: P, mime_type: &str) -> Result<String> {
    let path = file_path.as_ref();

    match mime_type {
        // PDFs are extracted and cleaned into plain text
        mime if mime.starts_with("application/pdf") => {
            info!("Processing PDF document: {}", path.display());
            let content = extract_text(path)
                .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))?;

            let cleaned_content = clean_cv_text(&content)?;

            if cleaned_content.is_empty() {
                warn!("Extracted PDF content is empty or contains only whitespace");
            }

            Ok(cleaned_content)
        }

        // Plain text and markdown are used as-is
        mime if mime.starts_with("text/") => {
            info!("Processing text document: {}", path.display());
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read text file: {}", path.display()))?;
            Ok(content)
        }

        _ => Err(anyhow::anyhow!(
            "Unsupported document format: {}. Only text and PDF files are supported.",
            mime_type
        )),
    }
}

/// Tidy text extracted from a CV export.
///
/// Drops everything before the career summary heading, repairs hyphenation
/// and punctuation spacing broken by extraction, and removes blank lines.
/// The patterns are compiled per call, which is once per converted PDF; the
/// only error returned is a pattern failing to compile.
pub fn clean_cv_text(text: &str) -> Result<String> {
    let text = match text.find(CONTENT_START_MARKER) {
        Some(start) => &text[start..],
        None => text,
    };

    let page_marker = Regex::new(r"<!-- Page \d+ -->")?;
    let text = page_marker.replace_all(text, "").replace('\u{ad}', "");

    let hyphen = Regex::new(r"\s*-\s*")?;
    let runs = Regex::new(r"\s{2,}")?;
    let space_before = Regex::new(r"\s+([,.:;])")?;
    let missing_after = Regex::new(r"([,.:;])(\S)")?;

    let text = hyphen.replace_all(&text, "-");
    let text = runs.replace_all(&text, " ");
    let text = space_before.replace_all(&text, "$1");
    let text = missing_after.replace_all(&text, "$1 $2");

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    Ok(lines.join("\n"))
}

/// Convert a source CV into cleaned plain text and write it out
pub fn convert_to_text<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<usize> {
    let document = Document::from_file(&input)?;
    let output = output.as_ref();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    fs::write(output, &document.content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("CV text saved to {}", output.display());

    Ok(document.content.len())
}
