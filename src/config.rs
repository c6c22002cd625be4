//! Configuration for a harvest run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to thread the configuration through the pipeline, log it, and diff two
//! runs to understand why their outputs differ.
//!
//! The engine handles (`rasterizer`, `ocr_engine`) are injectable for the
//! same reason the knobs are explicit: tests substitute mock engines, and
//! embedders can wrap the real ones with their own policies.

use crate::error::MillError;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::raster::PageRasterizer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Browser identity presented on every HTTP request.
///
/// Document hosts routinely reject default library user agents; a mainstream
/// desktop browser string passes the trivial filters.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Configuration for one harvest run.
///
/// Built via [`RunConfig::builder()`] or [`RunConfig::default()`].
///
/// # Example
/// ```rust
/// use ocrmill::RunConfig;
///
/// let config = RunConfig::builder()
///     .listing_url("https://academy.example/documents")
///     .output_dir("out/md")
///     .dpi(300)
///     .ocr_language("rus")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Page whose ordered-list anchors name the documents to process.
    pub listing_url: String,

    /// Exact source URLs to drop from the discovered list before processing.
    pub excluded_urls: Vec<String>,

    /// Directory receiving per-document Markdown files and the combined
    /// report. Created on demand.
    pub output_dir: PathBuf,

    /// File name of the combined report inside `output_dir`.
    pub combined_filename: String,

    /// Rasterization resolution. Range: 72–600. Default: 300.
    ///
    /// 300 DPI is the OCR sweet spot: glyphs are large enough for reliable
    /// recognition of small print while page bitmaps stay in the tens of
    /// megabytes. Lower values trade accuracy for speed on clean scans.
    pub dpi: u32,

    /// Recognition language code passed to the OCR engine. Default: "rus".
    pub ocr_language: String,

    /// OCR engine binary. Default: "tesseract" resolved via PATH.
    pub tesseract_path: PathBuf,

    /// Language-data directory for the OCR engine; `None` uses the engine's
    /// compiled-in default.
    pub tessdata_dir: Option<PathBuf>,

    /// Directory holding the pdfium shared library; `None` binds the
    /// system-installed copy.
    pub pdfium_dir: Option<PathBuf>,

    /// Audit file for removed lines; `None` places `removed_stamps.log`
    /// inside `output_dir`.
    pub audit_log_path: Option<PathBuf>,

    /// Per-download timeout in seconds. Default: 60.
    ///
    /// One unreachable host must not stall the batch; a timed-out document
    /// is skipped exactly like any other fetch failure.
    pub download_timeout_secs: u64,

    /// HTTP `User-Agent` header value.
    pub user_agent: String,

    /// Stamp pattern catalogue override; `None` uses the built-in catalogue.
    pub stamp_patterns: Option<Vec<String>>,

    /// Pre-constructed rasterizer. `None` builds a pdfium-backed one.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Pre-constructed OCR engine. `None` builds a tesseract-backed one.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Per-document progress events; `None` for silent operation.
    pub progress: Option<ProgressCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            listing_url: String::new(),
            excluded_urls: Vec::new(),
            output_dir: PathBuf::from("doc_md"),
            combined_filename: "combined.md".to_string(),
            dpi: 300,
            ocr_language: "rus".to_string(),
            tesseract_path: PathBuf::from("tesseract"),
            tessdata_dir: None,
            pdfium_dir: None,
            audit_log_path: None,
            download_timeout_secs: 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            stamp_patterns: None,
            rasterizer: None,
            ocr_engine: None,
            progress: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("listing_url", &self.listing_url)
            .field("excluded_urls", &self.excluded_urls)
            .field("output_dir", &self.output_dir)
            .field("combined_filename", &self.combined_filename)
            .field("dpi", &self.dpi)
            .field("ocr_language", &self.ocr_language)
            .field("tesseract_path", &self.tesseract_path)
            .field("tessdata_dir", &self.tessdata_dir)
            .field("pdfium_dir", &self.pdfium_dir)
            .field("audit_log_path", &self.audit_log_path)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("stamp_patterns", &self.stamp_patterns.as_ref().map(Vec::len))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"))
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field("progress", &self.progress.as_ref().map(|_| "<dyn HarvestProgressCallback>"))
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }

    /// Audit log path, resolved to its default when unset.
    pub fn resolved_audit_log_path(&self) -> PathBuf {
        self.audit_log_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join("removed_stamps.log"))
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn listing_url(mut self, url: impl Into<String>) -> Self {
        self.config.listing_url = url.into();
        self
    }

    pub fn excluded_url(mut self, url: impl Into<String>) -> Self {
        self.config.excluded_urls.push(url.into());
        self
    }

    pub fn excluded_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.excluded_urls.extend(urls.into_iter().map(Into::into));
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn combined_filename(mut self, name: impl Into<String>) -> Self {
        self.config.combined_filename = name.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn pdfium_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_dir = Some(dir.into());
        self
    }

    pub fn audit_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.audit_log_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn stamp_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.stamp_patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, MillError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(MillError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(MillError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.combined_filename.trim().is_empty() {
            return Err(MillError::InvalidConfig(
                "combined report file name must not be empty".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(MillError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::builder().build().expect("defaults build");
        assert_eq!(config.dpi, 300);
        assert_eq!(config.ocr_language, "rus");
        assert_eq!(config.combined_filename, "combined.md");
    }

    #[test]
    fn dpi_out_of_range_is_rejected() {
        let err = RunConfig::builder().dpi(50).build().unwrap_err();
        assert!(matches!(err, MillError::InvalidConfig(_)));
        let err = RunConfig::builder().dpi(1200).build().unwrap_err();
        assert!(matches!(err, MillError::InvalidConfig(_)));
    }

    #[test]
    fn empty_language_is_rejected() {
        let err = RunConfig::builder().ocr_language("  ").build().unwrap_err();
        assert!(matches!(err, MillError::InvalidConfig(_)));
    }

    #[test]
    fn audit_log_defaults_inside_output_dir() {
        let config = RunConfig::builder().output_dir("out").build().unwrap();
        assert_eq!(
            config.resolved_audit_log_path(),
            PathBuf::from("out").join("removed_stamps.log")
        );
    }

    #[test]
    fn debug_elides_engine_handles() {
        let config = RunConfig::default();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("listing_url"));
        assert!(!rendered.contains("TesseractOcr"));
    }
}
