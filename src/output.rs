//! Output and reporting types: discovered references, per-document outcomes,
//! and the run summary.
//!
//! Everything here derives `Serialize` so the CLI can emit a machine-readable
//! run report (`--json`) in addition to the human summary. The types are
//! deliberately plain data — all behaviour lives in the pipeline.

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A discovered (name, URL) pair pointing at one document to process.
///
/// Produced by link discovery in listing-page order; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    /// Anchor text from the listing page, used for the Markdown heading
    /// and the output file name.
    pub display_name: String,
    /// Absolute URL of the PDF to download.
    pub source_url: String,
}

impl DocumentReference {
    pub fn new(display_name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            source_url: source_url.into(),
        }
    }
}

/// Why a document produced no output.
///
/// The stage name is part of the variant so the summary can say *where* the
/// document fell out of the pipeline, not just that it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "detail")]
pub enum SkipReason {
    /// Download failed, timed out, or returned something that is not a PDF.
    Fetch(String),
    /// The rasterizer rejected the document or failed on a page.
    Rasterize(String),
    /// Every page filtered down to nothing.
    NoUsableContent,
}

impl From<DocumentError> for SkipReason {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::Fetch { .. }
            | DocumentError::FetchTimeout { .. }
            | DocumentError::NotAPdf { .. } => SkipReason::Fetch(e.to_string()),
            DocumentError::Rasterize { detail } => SkipReason::Rasterize(detail),
            DocumentError::NoUsableContent => SkipReason::NoUsableContent,
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Fetch(d) => write!(f, "fetch: {d}"),
            SkipReason::Rasterize(d) => write!(f, "rasterize: {d}"),
            SkipReason::NoUsableContent => write!(f, "no usable content after filtering"),
        }
    }
}

/// One successfully emitted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub display_name: String,
    pub source_url: String,
    /// Path of the per-document Markdown file.
    pub output_path: PathBuf,
    /// Pages that survived filtering (dropped-empty pages excluded).
    pub page_count: usize,
    /// Pages whose OCR output was replaced by a placeholder after an
    /// engine fault.
    pub placeholder_pages: usize,
}

/// One document that reached the terminal `Skipped` state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub display_name: String,
    pub source_url: String,
    pub reason: SkipReason,
}

/// Final accounting for a whole run.
///
/// The combined report omits skipped documents silently; their absence is
/// visible only here. `combined_path` is `None` when no document reached
/// `Done` — callers must check rather than expect an empty file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub processed: Vec<ProcessedDocument>,
    pub skipped: Vec<SkippedDocument>,
    /// Path of the combined report, when at least one document succeeded.
    pub combined_path: Option<PathBuf>,
}

impl RunSummary {
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// True when the run produced no output at all.
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

/// Derive a file-name stem from a display name.
///
/// Every non-alphanumeric scalar becomes `_`, runs are collapsed, and
/// leading/trailing separators are trimmed. `char::is_alphanumeric` is
/// Unicode-aware, so Cyrillic document titles keep their letters.
pub fn sanitize_file_stem(display_name: &str) -> String {
    let mut out = String::with_capacity(display_name.len());
    let mut last_was_sep = true;
    for ch in display_name.chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}
