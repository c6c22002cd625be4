//! PDF rasterization: render every page to a `DynamicImage` via pdfium.
//!
//! ## Why a trait?
//!
//! The pipeline only needs "PDF bytes in, ordered page bitmaps out".
//! [`PageRasterizer`] keeps that seam narrow so tests can substitute a mock
//! engine and the pdfium dependency stays confined to this module.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! [`rasterize_document`] moves the work onto the blocking thread pool so the
//! Tokio worker threads never stall during CPU-heavy rendering.
//!
//! ## Failure policy
//!
//! Rasterization failure is document-fatal, not page-fatal: a half-rendered
//! document would silently lose content, so one bad page abandons the whole
//! document and the run moves on.

use crate::error::{DocumentError, MillError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Converts a PDF on disk into an ordered sequence of page bitmaps.
pub trait PageRasterizer: Send + Sync {
    /// Verify the underlying engine is usable. Called once, eagerly, before
    /// any document is processed — a missing native library must fail the
    /// run at startup, not the first document.
    fn probe(&self) -> Result<(), MillError>;

    /// Render all pages of `pdf_path` at `dpi`, in page order.
    fn rasterize(&self, pdf_path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, DocumentError>;
}

/// Production rasterizer backed by the pdfium native library.
pub struct PdfiumRasterizer {
    /// Directory holding the pdfium shared library; `None` binds the
    /// system-installed copy.
    lib_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(lib_dir: Option<PathBuf>) -> Self {
        Self { lib_dir }
    }

    /// Bind a fresh pdfium instance.
    ///
    /// Binding is cheap and pdfium is not freely shareable across threads,
    /// so each rasterize call binds inside its own blocking closure instead
    /// of caching one instance in the adapter.
    fn bind(lib_dir: Option<&Path>) -> Result<Pdfium, PdfiumError> {
        let bindings = match lib_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn probe(&self) -> Result<(), MillError> {
        Self::bind(self.lib_dir.as_deref())
            .map(|_| ())
            .map_err(|e| MillError::RasterizerUnavailable(format!("{e:?}")))
    }

    fn rasterize(&self, pdf_path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, DocumentError> {
        let pdfium = Self::bind(self.lib_dir.as_deref()).map_err(|e| DocumentError::Rasterize {
            detail: format!("pdfium binding failed: {e:?}"),
        })?;

        let document =
            pdfium
                .load_pdf_from_file(pdf_path, None)
                .map_err(|e| DocumentError::Rasterize {
                    detail: format!("{e:?}"),
                })?;

        let pages = document.pages();
        let total = pages.len();

        // PDF user space is 72 points per inch; the scale factor maps it to
        // the requested OCR resolution.
        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        let mut results = Vec::with_capacity(total as usize);
        for idx in 0..total {
            let page = pages.get(idx).map_err(|e| DocumentError::Rasterize {
                detail: format!("page {}: {e:?}", idx + 1),
            })?;
            let bitmap =
                page.render_with_config(&render_config)
                    .map_err(|e| DocumentError::Rasterize {
                        detail: format!("page {}: {e:?}", idx + 1),
                    })?;
            let image = bitmap.as_image();
            debug!(
                "rendered page {}/{} → {}x{} px",
                idx + 1,
                total,
                image.width(),
                image.height()
            );
            results.push(image);
        }

        Ok(results)
    }
}

/// Rasterize on the blocking thread pool.
///
/// Thin async wrapper over [`PageRasterizer::rasterize`]; the trait stays
/// synchronous because every real engine here is a blocking native call.
pub async fn rasterize_document(
    rasterizer: Arc<dyn PageRasterizer>,
    pdf_path: PathBuf,
    dpi: u32,
) -> Result<Vec<DynamicImage>, DocumentError> {
    tokio::task::spawn_blocking(move || rasterizer.rasterize(&pdf_path, dpi))
        .await
        .map_err(|e| DocumentError::Rasterize {
            detail: format!("render task panicked: {e}"),
        })?
}
