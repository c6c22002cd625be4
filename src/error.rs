//! Error types for the ocrmill library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`MillError`] — **Fatal**: the run cannot proceed at all (invalid
//!   configuration, OCR engine or rasterizer unavailable at startup, listing
//!   page unreachable). Returned as `Err(MillError)` from the top-level
//!   `harvest*` functions before any document work begins.
//!
//! * [`DocumentError`] — **Document-fatal, run-recoverable**: one document
//!   could not be processed (download failed, corrupt PDF, nothing left after
//!   filtering). The document is skipped with a logged reason and the run
//!   continues with the next reference.
//!
//! * [`OcrError`] — **Page-fatal, document-recoverable**: the OCR engine
//!   faulted on a single page. The pipeline substitutes a placeholder text
//!   for that page and keeps going, so one unreadable page never costs the
//!   whole document.
//!
//! The separation mirrors the propagation policy: page faults are absorbed
//! in place, document faults become [`crate::output::SkipReason`] entries in
//! the run summary, and only startup faults abort the batch.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the ocrmill library.
///
/// Document-level failures use [`DocumentError`] and are reported through
/// [`crate::output::RunSummary`] rather than propagated here.
#[derive(Debug, Error)]
pub enum MillError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Engine startup errors ─────────────────────────────────────────────
    /// The OCR engine binary could not be located or executed.
    #[error("OCR engine is not available: {detail}\nCheck that tesseract is installed and on PATH, or set --tesseract-path.")]
    OcrEngineUnavailable { detail: String },

    /// The configured recognition language has no installed data pack.
    #[error("OCR language '{language}' is not installed (available: {installed:?})\nDownload the matching .traineddata file into the tessdata directory.")]
    OcrLanguageMissing {
        language: String,
        installed: Vec<String>,
    },

    /// The PDF rasterizer native library could not be bound.
    #[error("Failed to bind the pdfium rasterizer library: {0}\nSet --pdfium-dir to a directory containing the pdfium shared library.")]
    RasterizerUnavailable(String),

    // ── Discovery errors ──────────────────────────────────────────────────
    /// The listing page itself could not be fetched.
    #[error("Failed to fetch listing page '{url}': {reason}")]
    ListingFetchFailed { url: String, reason: String },

    /// The listing page was fetched but yielded no document anchors.
    #[error("Listing page '{url}' contains no document links (expected anchors inside an ordered list)")]
    ListingEmpty { url: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not open or append to the removed-line audit log.
    #[error("Failed to open audit log '{path}': {source}")]
    AuditLogFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failure that abandons one document but not the run.
///
/// Converted into [`crate::output::SkipReason`] for the run summary; the
/// pipeline proceeds to the next [`crate::output::DocumentReference`].
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Download failed: transport error or non-2xx status.
    #[error("download failed for '{url}': {reason}")]
    Fetch { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("download timed out after {secs}s for '{url}'")]
    FetchTimeout { url: String, secs: u64 },

    /// The response body is not a PDF (missing `%PDF` magic).
    #[error("'{url}' is not a PDF (first bytes: {magic:?})")]
    NotAPdf { url: String, magic: [u8; 4] },

    /// The rasterizer rejected the document or failed on a page.
    ///
    /// Partial rasterization is not a safe half-success, so a single bad
    /// page abandons every page of the document.
    #[error("rasterization failed: {detail}")]
    Rasterize { detail: String },

    /// Every page filtered down to nothing — no output for this document.
    #[error("no usable content after filtering")]
    NoUsableContent,
}

/// An engine-level OCR fault on a single page.
///
/// Caught inside the pipeline and replaced with a placeholder page text;
/// never escapes to the document level. Blank pages are *not* errors — the
/// engine returns an empty string for those.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine process could not be spawned or its output read.
    #[error("failed to run OCR engine: {0}")]
    Io(#[from] std::io::Error),

    /// The engine exited with a failure status.
    #[error("OCR engine exited with {status}: {stderr}")]
    Engine { status: String, stderr: String },

    /// The page image could not be written for the engine to consume.
    #[error("failed to encode page image: {0}")]
    PageImage(#[from] image::ImageError),

    /// The engine produced output that is not valid UTF-8.
    #[error("OCR engine produced non-UTF-8 output")]
    InvalidUtf8,
}
