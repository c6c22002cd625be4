//! Top-level harvest run: discover documents, drive each through the
//! pipeline, emit per-document Markdown and the combined report.
//!
//! ## Per-document state machine
//!
//! Each [`DocumentReference`] moves through
//! `Fetching → Rasterizing → RecognizingPages → Assembling → Done`, with a
//! terminal `Skipped` reachable from any stage. Stage outcomes are explicit
//! `Result` values checked at every transition — there is no exception-style
//! control transfer. The policy per stage:
//!
//! * **Fetching** — download failures, timeouts, and non-PDF bodies skip the
//!   document; the batch never retries or stalls on one bad host.
//! * **Rasterizing** — any page failing to render skips the document;
//!   partial rasterization is not a safe half-success.
//! * **RecognizingPages** — engine faults are absorbed per page with a
//!   placeholder; pages whose cleaned text is empty are dropped without
//!   abandoning the document.
//! * **Assembling** — zero surviving pages skips the document
//!   (`NoUsableContent`); otherwise the Markdown body is assembled with the
//!   display name as a level-1 heading.
//! * **Done** — one Markdown file is written (atomic temp-write + rename)
//!   and the body joins the combined-report buffer.
//!
//! Documents and pages are processed strictly sequentially: the engines are
//! blocking external processes with no concurrent API worth exploiting, and
//! sequential processing keeps temp-file and audit-log discipline trivial.

use crate::audit::AuditLog;
use crate::config::RunConfig;
use crate::discover;
use crate::error::{DocumentError, MillError};
use crate::output::{
    sanitize_file_stem, DocumentReference, ProcessedDocument, RunSummary, SkipReason,
    SkippedDocument,
};
use crate::pipeline::fetch::{build_client, fetch_document};
use crate::pipeline::filter::StampFilter;
use crate::pipeline::ocr::{ensure_ready, recognize_page, OcrEngine, TesseractOcr};
use crate::pipeline::raster::{rasterize_document, PageRasterizer, PdfiumRasterizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Blank-line separator between cleaned pages of one document.
const PAGE_SEPARATOR: &str = "\n\n";

/// Delimiter between document bodies in the combined report.
const REPORT_SEPARATOR: &str = "\n\n\n";

/// Discover documents on the configured listing page and process them all.
///
/// This is the primary entry point for the library. Engine availability is
/// verified before any document work begins; a missing OCR language pack or
/// an unbindable rasterizer library fails here, eagerly.
///
/// Returns `Ok(RunSummary)` even when every document was skipped — check
/// [`RunSummary::is_empty`] before relying on the combined report.
pub async fn harvest(config: &RunConfig) -> Result<RunSummary, MillError> {
    if config.listing_url.trim().is_empty() {
        return Err(MillError::InvalidConfig(
            "listing URL must be set (or use harvest_documents with an explicit list)".into(),
        ));
    }

    let mill = Mill::prepare(config)?;
    let refs = discover::discover_documents(
        &mill.client,
        &config.listing_url,
        &config.excluded_urls,
    )
    .await?;
    mill.run(&refs, config).await
}

/// Process a caller-supplied reference list, skipping discovery.
///
/// Useful when the document list comes from somewhere other than a listing
/// page — a sitemap, a database, or a test.
pub async fn harvest_documents(
    refs: &[DocumentReference],
    config: &RunConfig,
) -> Result<RunSummary, MillError> {
    let mill = Mill::prepare(config)?;
    mill.run(refs, config).await
}

/// One assembled document, ready to emit.
struct AssembledDocument {
    body: String,
    page_count: usize,
    placeholder_pages: usize,
}

/// Shared run state: HTTP client, engines, filter, audit sink.
struct Mill {
    client: reqwest::Client,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    filter: StampFilter,
    audit: AuditLog,
}

impl Mill {
    /// Build engines and verify the environment. All startup-fatal checks
    /// live here so `run` can assume working engines.
    fn prepare(config: &RunConfig) -> Result<Self, MillError> {
        std::fs::create_dir_all(&config.output_dir).map_err(|e| MillError::OutputWriteFailed {
            path: config.output_dir.clone(),
            source: e,
        })?;

        let rasterizer: Arc<dyn PageRasterizer> = match &config.rasterizer {
            Some(r) => Arc::clone(r),
            None => Arc::new(PdfiumRasterizer::new(config.pdfium_dir.clone())),
        };
        rasterizer.probe()?;

        let ocr: Arc<dyn OcrEngine> = match &config.ocr_engine {
            Some(e) => Arc::clone(e),
            None => Arc::new(TesseractOcr::new(
                config.tesseract_path.clone(),
                config.tessdata_dir.clone(),
            )),
        };
        ensure_ready(&*ocr, &config.ocr_language)?;

        let filter = match &config.stamp_patterns {
            Some(patterns) => StampFilter::new(patterns)?,
            None => StampFilter::default(),
        };

        Ok(Self {
            client: build_client(&config.user_agent, config.download_timeout_secs)?,
            rasterizer,
            ocr,
            filter,
            audit: AuditLog::open(config.resolved_audit_log_path())?,
        })
    }

    /// Process every reference in order and write all outputs.
    async fn run(
        &self,
        refs: &[DocumentReference],
        config: &RunConfig,
    ) -> Result<RunSummary, MillError> {
        let start = Instant::now();
        let mut summary = RunSummary::default();
        let mut combined: Vec<String> = Vec::new();

        if let Some(ref cb) = config.progress {
            cb.on_run_start(refs.len());
        }

        for (index, reference) in refs.iter().enumerate() {
            info!(
                "processing {}/{}: '{}' ({})",
                index + 1,
                refs.len(),
                reference.display_name,
                reference.source_url
            );
            if let Some(ref cb) = config.progress {
                cb.on_document_start(index, refs.len(), &reference.display_name);
            }

            match self.process_document(reference, config).await {
                Ok(doc) => {
                    let path = config
                        .output_dir
                        .join(output_file_name(&reference.display_name, index));
                    write_atomic(&path, &doc.body).await?;
                    info!(
                        "saved '{}' → {} ({} pages)",
                        reference.display_name,
                        path.display(),
                        doc.page_count
                    );
                    if let Some(ref cb) = config.progress {
                        cb.on_document_done(
                            index,
                            refs.len(),
                            &reference.display_name,
                            doc.page_count,
                        );
                    }
                    combined.push(doc.body);
                    summary.processed.push(ProcessedDocument {
                        display_name: reference.display_name.clone(),
                        source_url: reference.source_url.clone(),
                        output_path: path,
                        page_count: doc.page_count,
                        placeholder_pages: doc.placeholder_pages,
                    });
                }
                Err(e) => {
                    warn!("skipping '{}': {e}", reference.display_name);
                    let reason = SkipReason::from(e);
                    if let Some(ref cb) = config.progress {
                        cb.on_document_skipped(
                            index,
                            refs.len(),
                            &reference.display_name,
                            &reason,
                        );
                    }
                    summary.skipped.push(SkippedDocument {
                        display_name: reference.display_name.clone(),
                        source_url: reference.source_url.clone(),
                        reason,
                    });
                }
            }
        }

        if combined.is_empty() {
            warn!("no documents produced output; combined report not written");
        } else {
            let path = config.output_dir.join(&config.combined_filename);
            write_atomic(&path, &combined.join(REPORT_SEPARATOR)).await?;
            info!("combined report → {}", path.display());
            summary.combined_path = Some(path);
        }

        info!(
            "run complete: {} processed, {} skipped, {:.1}s",
            summary.processed_count(),
            summary.skipped_count(),
            start.elapsed().as_secs_f64()
        );
        if let Some(ref cb) = config.progress {
            cb.on_run_complete(summary.processed_count(), summary.skipped_count());
        }
        Ok(summary)
    }

    /// Drive one document through fetch → rasterize → recognize/filter →
    /// assemble. Returns the assembled Markdown or the reason to skip.
    async fn process_document(
        &self,
        reference: &DocumentReference,
        config: &RunConfig,
    ) -> Result<AssembledDocument, DocumentError> {
        // Fetching. The temp file lives until this function returns, which
        // is exactly as long as any later stage needs the bytes on disk.
        let pdf = fetch_document(
            &self.client,
            &reference.source_url,
            config.download_timeout_secs,
        )
        .await?;

        // Rasterizing: document-fatal on any page.
        let pages = rasterize_document(
            Arc::clone(&self.rasterizer),
            pdf.path().to_path_buf(),
            config.dpi,
        )
        .await?;
        let total_pages = pages.len();

        // RecognizingPages: sequential, in page order; each page filtered
        // immediately after recognition.
        let mut cleaned_pages: Vec<String> = Vec::with_capacity(total_pages);
        let mut placeholder_pages = 0usize;
        for (page_index, page) in pages.into_iter().enumerate() {
            match recognize_page(
                Arc::clone(&self.ocr),
                page,
                config.ocr_language.clone(),
            )
            .await
            {
                Ok(raw) => {
                    let cleaned = self.filter.clean(&raw, &self.audit);
                    if cleaned.trim().is_empty() {
                        info!(
                            "page {}/{} of '{}' empty after filtering, dropped",
                            page_index + 1,
                            total_pages,
                            reference.display_name
                        );
                    } else {
                        cleaned_pages.push(cleaned);
                    }
                }
                // Engine fault: page-fatal only. The placeholder carries the
                // error verbatim and bypasses the filter.
                Err(e) => {
                    warn!(
                        "OCR fault on page {}/{} of '{}': {e}",
                        page_index + 1,
                        total_pages,
                        reference.display_name
                    );
                    cleaned_pages.push(format!("OCR failed: {e}"));
                    placeholder_pages += 1;
                }
            }
        }

        // Assembling.
        if cleaned_pages.is_empty() {
            return Err(DocumentError::NoUsableContent);
        }
        let body = format!(
            "# {}\n\n{}",
            reference.display_name,
            cleaned_pages.join(PAGE_SEPARATOR)
        );

        Ok(AssembledDocument {
            body,
            page_count: cleaned_pages.len(),
            placeholder_pages,
        })
    }
}

/// Markdown file name for a document, with a positional fallback for
/// display names that sanitize away entirely.
fn output_file_name(display_name: &str, index: usize) -> String {
    let stem = sanitize_file_stem(display_name);
    if stem.is_empty() {
        format!("document_{}.md", index + 1)
    } else {
        format!("{stem}.md")
    }
}

/// Atomic write: temp file + rename, so readers never observe a partial
/// Markdown file.
async fn write_atomic(path: &Path, contents: &str) -> Result<(), MillError> {
    let tmp_path: PathBuf = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|e| MillError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| MillError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_display_name() {
        assert_eq!(output_file_name("Annual report", 0), "Annual_report.md");
    }

    #[test]
    fn file_name_falls_back_to_position() {
        assert_eq!(output_file_name("???", 2), "document_3.md");
        assert_eq!(output_file_name("", 0), "document_1.md");
    }

    #[tokio::test]
    async fn write_atomic_leaves_no_temp_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("report.md");
        write_atomic(&target, "# ok\n").await.expect("write");

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "# ok\n");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");
    }
}
