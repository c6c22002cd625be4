//! Document download: one URL to one scoped temporary PDF file.
//!
//! ## Why a temp file?
//!
//! pdfium wants a filesystem path, not a byte buffer. Downloading into a
//! [`tempfile::NamedTempFile`] gives the rasterizer a path while guaranteeing
//! removal on every exit path from this stage onward — the file is deleted
//! when the handle drops, whether the document succeeds, fails, or the
//! process panics.
//!
//! ## Why validate magic bytes here?
//!
//! Institutional sites happily answer a PDF link with an HTML error page and
//! status 200. Checking for `%PDF` up front turns that into a precise
//! fetch-stage skip instead of an opaque rasterizer error.

use crate::error::{DocumentError, MillError};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Build the shared HTTP client for a run.
///
/// A realistic browser identity avoids the trivial bot-blocking some
/// document hosts apply to default library user agents. The timeout bounds
/// every download so one unreachable host cannot stall the batch.
pub fn build_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client, MillError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| MillError::Internal(format!("HTTP client: {e}")))
}

/// True when `bytes` starts with the PDF magic.
pub(crate) fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[..4] == b"%PDF"
}

/// Download `url` into a scoped temp file.
///
/// Any transport error, timeout, non-2xx status, or non-PDF body is a
/// [`DocumentError`] — the caller skips this document and continues.
pub async fn fetch_document(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<NamedTempFile, DocumentError> {
    info!("downloading {url}");

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            DocumentError::FetchTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DocumentError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DocumentError::Fetch {
            url: url.to_string(),
            reason: format!("HTTP {status}"),
        });
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            DocumentError::FetchTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DocumentError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !looks_like_pdf(&bytes) {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(DocumentError::NotAPdf {
            url: url.to_string(),
            magic,
        });
    }

    let mut tmp = NamedTempFile::new().map_err(|e| DocumentError::Fetch {
        url: url.to_string(),
        reason: format!("temp file: {e}"),
    })?;
    tmp.write_all(&bytes).map_err(|e| DocumentError::Fetch {
        url: url.to_string(),
        reason: format!("temp file write: {e}"),
    })?;

    debug!("downloaded {} bytes → {}", bytes.len(), tmp.path().display());
    Ok(tmp)
}
