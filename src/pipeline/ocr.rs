//! OCR: derive text from a page bitmap via an external engine.
//!
//! ## Engine model
//!
//! The production engine is the `tesseract` binary driven over a pipe: the
//! page bitmap is written to a scoped temp PNG, tesseract reads it and prints
//! recognized text to stdout. Shelling out (rather than linking libtesseract)
//! keeps the crate free of C build dependencies and matches how the engine is
//! deployed on the machines this tool runs on.
//!
//! ## Failure model
//!
//! A page with no recognizable text is *expected* (scanned blanks, separator
//! sheets) and yields the [`EMPTY_PAGE_MARKER`] sentinel, not an error.
//! [`OcrError`] is reserved for engine-level faults — missing binary, crash,
//! unreadable image — and is absorbed per page by the pipeline. Engine
//! absence and missing language packs are checked once, eagerly, by
//! [`ensure_ready`] so they abort the run before any download happens.

use crate::error::{MillError, OcrError};
use image::DynamicImage;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info};

/// Marker substituted for a page on which the engine found no text.
///
/// Chosen to survive the artifact filter so an all-blank scan still produces
/// a visible placeholder in the emitted Markdown.
pub const EMPTY_PAGE_MARKER: &str = "No text recognized (blank page or poor scan quality)";

/// Converts one page bitmap into raw recognized text.
pub trait OcrEngine: Send + Sync {
    /// Engine version string, e.g. `tesseract 5.3.4`.
    fn version(&self) -> Result<String, OcrError>;

    /// Language packs the engine has installed.
    fn installed_languages(&self) -> Result<Vec<String>, OcrError>;

    /// Recognize text on `page` in the given language.
    ///
    /// An empty result means a blank page; engine faults are `Err`.
    fn recognize(&self, page: &DynamicImage, language: &str) -> Result<String, OcrError>;
}

/// Production engine: the `tesseract` CLI.
pub struct TesseractOcr {
    binary: PathBuf,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>, tessdata_dir: Option<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            tessdata_dir,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(ref dir) = self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd
    }
}

impl OcrEngine for TesseractOcr {
    fn version(&self) -> Result<String, OcrError> {
        let out = self.command().arg("--version").output()?;
        // tesseract 5 prints the version to stdout, 4.x to stderr.
        let raw = if out.stdout.is_empty() {
            out.stderr
        } else {
            out.stdout
        };
        let text = String::from_utf8(raw).map_err(|_| OcrError::InvalidUtf8)?;
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    fn installed_languages(&self) -> Result<Vec<String>, OcrError> {
        let out = self.command().arg("--list-langs").output()?;
        if !out.status.success() {
            return Err(OcrError::Engine {
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        let mut raw = String::from_utf8_lossy(&out.stdout).into_owned();
        raw.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(parse_lang_listing(&raw))
    }

    fn recognize(&self, page: &DynamicImage, language: &str) -> Result<String, OcrError> {
        // Scoped temp PNG: removed when `tmp` drops, even on error.
        let tmp = tempfile::Builder::new()
            .prefix("ocrmill-page-")
            .suffix(".png")
            .tempfile()?;
        page.save_with_format(tmp.path(), image::ImageFormat::Png)?;

        let out = self
            .command()
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .output()?;

        if !out.status.success() {
            return Err(OcrError::Engine {
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8(out.stdout).map_err(|_| OcrError::InvalidUtf8)?;
        debug!("recognized {} bytes of text", text.len());
        Ok(text)
    }
}

/// Extract language codes from `tesseract --list-langs` output.
///
/// The listing starts with a header line ("List of available languages
/// (123):") followed by one code per line.
fn parse_lang_listing(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.contains(':') && !l.contains(' '))
        .map(str::to_string)
        .collect()
}

/// Eager startup check: engine present, requested language installed.
///
/// Runs before any document work so a misconfigured machine fails the whole
/// run with a precise message instead of skipping every document one by one.
pub fn ensure_ready(engine: &dyn OcrEngine, language: &str) -> Result<(), MillError> {
    let version = engine
        .version()
        .map_err(|e| MillError::OcrEngineUnavailable {
            detail: e.to_string(),
        })?;
    info!("OCR engine: {version}");

    let installed = engine
        .installed_languages()
        .map_err(|e| MillError::OcrEngineUnavailable {
            detail: e.to_string(),
        })?;
    if !installed.iter().any(|l| l == language) {
        return Err(MillError::OcrLanguageMissing {
            language: language.to_string(),
            installed,
        });
    }
    info!("OCR language '{language}' available ({} installed)", installed.len());
    Ok(())
}

/// Recognize one page on the blocking thread pool.
///
/// Consumes the bitmap: a raster page is owned by the pipeline for exactly
/// one recognition and never outlives it. Whitespace-only engine output is
/// normalized to [`EMPTY_PAGE_MARKER`] here so every engine implementation
/// gets the blank-page guarantee.
pub async fn recognize_page(
    engine: Arc<dyn OcrEngine>,
    page: DynamicImage,
    language: String,
) -> Result<String, OcrError> {
    let text = tokio::task::spawn_blocking(move || engine.recognize(&page, &language))
        .await
        .map_err(|e| OcrError::Engine {
            status: "panic".to_string(),
            stderr: e.to_string(),
        })??;

    if text.trim().is_empty() {
        Ok(EMPTY_PAGE_MARKER.to_string())
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lang_listing_with_header() {
        let raw = "List of available languages in \"/usr/share/tessdata\" (3):\neng\nosd\nrus\n";
        assert_eq!(parse_lang_listing(raw), vec!["eng", "osd", "rus"]);
    }

    #[test]
    fn parses_empty_listing() {
        assert!(parse_lang_listing("List of available languages (0):\n").is_empty());
    }

    struct FixedEngine {
        langs: Vec<String>,
    }

    impl OcrEngine for FixedEngine {
        fn version(&self) -> Result<String, OcrError> {
            Ok("tesseract 5.3.4".into())
        }
        fn installed_languages(&self) -> Result<Vec<String>, OcrError> {
            Ok(self.langs.clone())
        }
        fn recognize(&self, _page: &DynamicImage, _language: &str) -> Result<String, OcrError> {
            Ok(String::new())
        }
    }

    #[test]
    fn ensure_ready_accepts_installed_language() {
        let engine = FixedEngine {
            langs: vec!["eng".into(), "rus".into()],
        };
        assert!(ensure_ready(&engine, "rus").is_ok());
    }

    #[test]
    fn ensure_ready_rejects_missing_language() {
        let engine = FixedEngine {
            langs: vec!["eng".into()],
        };
        let err = ensure_ready(&engine, "rus").unwrap_err();
        assert!(matches!(err, MillError::OcrLanguageMissing { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn blank_page_gets_the_sentinel() {
        let engine: Arc<dyn OcrEngine> = Arc::new(FixedEngine { langs: vec![] });
        let page = DynamicImage::new_rgb8(2, 2);
        let text = recognize_page(engine, page, "rus".into())
            .await
            .expect("recognize");
        assert_eq!(text, EMPTY_PAGE_MARKER);
    }
}
