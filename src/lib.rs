//! # ocrmill
//!
//! Harvest PDF documents from an institutional listing page, OCR them, strip
//! digital-signature stamp noise, and emit clean Markdown.
//!
//! ## Why this crate?
//!
//! Institutional sites publish their charters, licenses, and policies as
//! scanned PDFs, each carrying a digital-signature visual stamp. Running OCR
//! over those pages yields the document text *plus* a recurring vocabulary of
//! stamp debris — provider names, serial numbers, validity ranges, all
//! partially garbled by the recognition itself. This crate automates the full
//! loop: discover the documents, OCR every page, filter the debris with an
//! audited denylist, and aggregate the results into one combined report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! listing page
//!  │
//!  ├─ 1. Discover  anchors in the page's ordered list → (name, URL) pairs
//!  ├─ 2. Fetch     download each PDF to a scoped temp file
//!  ├─ 3. Raster    render pages at 300 DPI via pdfium (spawn_blocking)
//!  ├─ 4. OCR       tesseract per page, sequential, fault → placeholder
//!  ├─ 5. Filter    drop stamp/noise lines, audit every removal
//!  └─ 6. Emit      one Markdown file per document + combined report
//! ```
//!
//! Failure is layered: a faulted page costs a placeholder, a failed document
//! is skipped with a recorded reason, and only a broken environment (missing
//! OCR language pack, unbindable rasterizer) aborts a run — detected eagerly,
//! before the first download.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocrmill::{harvest, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::builder()
//!         .listing_url("https://academy.example/documents")
//!         .output_dir("doc_md")
//!         .excluded_url("https://academy.example/uploads/license.pdf")
//!         .build()?;
//!     let summary = harvest(&config).await?;
//!     println!(
//!         "{} processed, {} skipped",
//!         summary.processed_count(),
//!         summary.skipped_count()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocrmill` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! ocrmill = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod audit;
pub mod config;
pub mod discover;
pub mod error;
pub mod harvest;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use audit::{AuditLog, RemovalReason};
pub use config::{RunConfig, RunConfigBuilder, DEFAULT_USER_AGENT};
pub use error::{DocumentError, MillError, OcrError};
pub use harvest::{harvest, harvest_documents};
pub use output::{
    DocumentReference, ProcessedDocument, RunSummary, SkipReason, SkippedDocument,
};
pub use pipeline::filter::{StampFilter, DEFAULT_STAMP_PATTERNS};
pub use pipeline::ocr::{OcrEngine, TesseractOcr, EMPTY_PAGE_MARKER};
pub use pipeline::raster::{PageRasterizer, PdfiumRasterizer};
pub use progress::{HarvestProgressCallback, NoopProgressCallback, ProgressCallback};
