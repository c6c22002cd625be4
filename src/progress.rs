//! Progress-callback trait for per-document harvest events.
//!
//! Inject an [`Arc<dyn HarvestProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through the document list.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a terminal progress bar, a WebSocket, or a database
//! record without the library knowing anything about how the host application
//! communicates. The trait is `Send + Sync` so a future parallel pipeline
//! could fire events from worker threads unchanged.

use crate::output::SkipReason;
use std::sync::Arc;

/// Called by the harvest pipeline as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Documents are processed sequentially, so events for
/// one run arrive in order.
pub trait HarvestProgressCallback: Send + Sync {
    /// Called once, after discovery, before any document is fetched.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before a document's download begins.
    ///
    /// `index` is 0-based position in the discovered list.
    fn on_document_start(&self, index: usize, total: usize, display_name: &str) {
        let _ = (index, total, display_name);
    }

    /// Called when a document's Markdown file has been written.
    fn on_document_done(&self, index: usize, total: usize, display_name: &str, pages: usize) {
        let _ = (index, total, display_name, pages);
    }

    /// Called when a document reached the terminal `Skipped` state.
    fn on_document_skipped(
        &self,
        index: usize,
        total: usize,
        display_name: &str,
        reason: &SkipReason,
    ) {
        let _ = (index, total, display_name, reason);
    }

    /// Called once after the whole list has been attempted.
    fn on_run_complete(&self, processed: usize, skipped: usize) {
        let _ = (processed, skipped);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl HarvestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn HarvestProgressCallback>;
