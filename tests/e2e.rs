//! End-to-end integration tests for ocrmill.
//!
//! The external engines (pdfium, tesseract) are replaced by scripted mocks
//! injected through `RunConfig`, and every network interaction goes through
//! a local `httpmock` server — the suite runs hermetically, with no native
//! libraries and no internet.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use httpmock::prelude::*;
use image::DynamicImage;
use ocrmill::{
    harvest, harvest_documents, DocumentReference, MillError, OcrEngine, OcrError,
    PageRasterizer, RunConfig, SkipReason, EMPTY_PAGE_MARKER,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Mock engines ─────────────────────────────────────────────────────────────

/// Rasterizer producing a fixed number of blank pages per document.
struct FixedRasterizer {
    pages: usize,
}

impl PageRasterizer for FixedRasterizer {
    fn probe(&self) -> Result<(), MillError> {
        Ok(())
    }

    fn rasterize(&self, pdf_path: &Path, _dpi: u32) -> Result<Vec<DynamicImage>, ocrmill::DocumentError> {
        // The pipeline must hand us a real file that still exists.
        assert!(pdf_path.exists(), "rasterizer called with missing file");
        Ok(vec![DynamicImage::new_rgb8(8, 8); self.pages])
    }
}

/// Rasterizer that rejects every document.
struct BrokenRasterizer;

impl PageRasterizer for BrokenRasterizer {
    fn probe(&self) -> Result<(), MillError> {
        Ok(())
    }

    fn rasterize(&self, _pdf_path: &Path, _dpi: u32) -> Result<Vec<DynamicImage>, ocrmill::DocumentError> {
        Err(ocrmill::DocumentError::Rasterize {
            detail: "mock renderer rejected the document".into(),
        })
    }
}

/// One scripted OCR response for one page.
enum PageScript {
    Text(&'static str),
    Fault,
}

/// OCR engine that replays a fixed page-by-page script across the run.
struct ScriptedOcr {
    script: Mutex<VecDeque<PageScript>>,
    languages: Vec<String>,
}

impl ScriptedOcr {
    fn new(pages: Vec<PageScript>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(pages.into()),
            languages: vec!["rus".into(), "eng".into()],
        })
    }

    fn with_languages(pages: Vec<PageScript>, languages: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(pages.into()),
            languages: languages.iter().map(|l| l.to_string()).collect(),
        })
    }
}

impl OcrEngine for ScriptedOcr {
    fn version(&self) -> Result<String, OcrError> {
        Ok("scripted-ocr 1.0".into())
    }

    fn installed_languages(&self) -> Result<Vec<String>, OcrError> {
        Ok(self.languages.clone())
    }

    fn recognize(&self, _page: &DynamicImage, language: &str) -> Result<String, OcrError> {
        assert_eq!(language, "rus", "pipeline must pass the configured language");
        match self.script.lock().unwrap().pop_front() {
            Some(PageScript::Text(t)) => Ok(t.to_string()),
            Some(PageScript::Fault) => Err(OcrError::Engine {
                status: "exit status: 1".into(),
                stderr: "mock engine fault".into(),
            }),
            None => Ok(String::new()),
        }
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

fn pdf_bytes() -> &'static [u8] {
    b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF\n"
}

fn listing_html(server: &MockServer, names_and_paths: &[(&str, &str)]) -> String {
    let items: String = names_and_paths
        .iter()
        .map(|(name, path)| format!("<li><a href=\"{}\">{}</a></li>", server.url(*path), name))
        .collect();
    format!("<html><body><h1>Documents</h1><ol>{items}</ol></body></html>")
}

fn base_config(
    out_dir: &Path,
    rasterizer_pages: usize,
    ocr: Arc<ScriptedOcr>,
) -> ocrmill::RunConfigBuilder {
    RunConfig::builder()
        .output_dir(out_dir)
        .rasterizer(Arc::new(FixedRasterizer {
            pages: rasterizer_pages,
        }))
        .ocr_engine(ocr)
}

fn md_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "md"))
        .collect();
    files.sort();
    files
}

// ── Full-run tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn full_run_emits_documents_and_combined_report() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();

    server
        .mock_async(|when, then| {
            when.method(GET).path("/a.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/b.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;
    let listing = listing_html(&server, &[("Устав организации", "/a.pdf"), ("Annual report", "/b.pdf")]);
    server
        .mock_async(move |when, then| {
            when.method(GET).path("/docs");
            then.status(200).body(listing);
        })
        .await;

    // One page per document: first carries stamp noise around real text.
    let ocr = ScriptedOcr::new(vec![
        PageScript::Text("Контур Крипто\nРаздел первый\nвладелец ООО АКАДЕМИЯ ДПО"),
        PageScript::Text("Содержание отчёта"),
    ]);
    let config = base_config(out.path(), 1, ocr)
        .listing_url(server.url("/docs"))
        .build()
        .unwrap();

    let summary = harvest(&config).await.expect("run succeeds");

    assert_eq!(summary.processed_count(), 2);
    assert_eq!(summary.skipped_count(), 0);

    let first = std::fs::read_to_string(out.path().join("Устав_организации.md")).unwrap();
    assert_eq!(first, "# Устав организации\n\nРаздел первый");

    let second = std::fs::read_to_string(out.path().join("Annual_report.md")).unwrap();
    assert_eq!(second, "# Annual report\n\nСодержание отчёта");

    let combined_path = summary.combined_path.as_ref().expect("combined written");
    let combined = std::fs::read_to_string(combined_path).unwrap();
    assert_eq!(combined, format!("{first}\n\n\n{second}"));
}

#[tokio::test]
async fn http_404_document_is_skipped_and_batch_continues() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();

    server
        .mock_async(|when, then| {
            when.method(GET).path("/missing.pdf");
            then.status(404).body("not here");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ok.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;

    let refs = vec![
        DocumentReference::new("Ghost", server.url("/missing.pdf")),
        DocumentReference::new("Survivor", server.url("/ok.pdf")),
    ];
    let ocr = ScriptedOcr::new(vec![PageScript::Text("выживший текст")]);
    let config = base_config(out.path(), 1, ocr).build().unwrap();

    let summary = harvest_documents(&refs, &config).await.expect("run succeeds");

    assert_eq!(summary.processed_count(), 1);
    assert_eq!(summary.skipped_count(), 1);
    assert_eq!(summary.skipped[0].display_name, "Ghost");
    match &summary.skipped[0].reason {
        SkipReason::Fetch(detail) => assert!(detail.contains("404"), "got: {detail}"),
        other => panic!("expected Fetch skip, got {other:?}"),
    }

    let combined = std::fs::read_to_string(summary.combined_path.unwrap()).unwrap();
    assert!(combined.contains("Survivor"));
    assert!(!combined.contains("Ghost"));
}

#[tokio::test]
async fn excluded_url_is_absent_from_processing_and_report() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();

    let excluded_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/license.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/charter.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;
    let listing = listing_html(&server, &[("License", "/license.pdf"), ("Charter", "/charter.pdf")]);
    server
        .mock_async(move |when, then| {
            when.method(GET).path("/docs");
            then.status(200).body(listing);
        })
        .await;

    let ocr = ScriptedOcr::new(vec![PageScript::Text("текст устава")]);
    let config = base_config(out.path(), 1, ocr)
        .listing_url(server.url("/docs"))
        .excluded_url(server.url("/license.pdf"))
        .build()
        .unwrap();

    let summary = harvest(&config).await.expect("run succeeds");

    // The excluded document is neither processed nor counted as skipped —
    // it never entered the pipeline.
    assert_eq!(summary.processed_count(), 1);
    assert_eq!(summary.skipped_count(), 0);
    assert_eq!(excluded_mock.hits_async().await, 0);

    let combined = std::fs::read_to_string(summary.combined_path.unwrap()).unwrap();
    assert!(combined.contains("Charter"));
    assert!(!combined.contains("License"));
}

// ── Page-level behaviour ─────────────────────────────────────────────────────

#[tokio::test]
async fn page_order_survives_a_dropped_middle_page() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/doc.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;

    let refs = vec![DocumentReference::new("Trilogy", server.url("/doc.pdf"))];
    // Middle page is pure stamp noise and filters to nothing.
    let ocr = ScriptedOcr::new(vec![
        PageScript::Text("первая страница"),
        PageScript::Text("сертификат\nэлектронная подпись"),
        PageScript::Text("третья страница"),
    ]);
    let config = base_config(out.path(), 3, ocr).build().unwrap();

    let summary = harvest_documents(&refs, &config).await.expect("run succeeds");
    assert_eq!(summary.processed[0].page_count, 2);

    let body = std::fs::read_to_string(&summary.processed[0].output_path).unwrap();
    assert_eq!(body, "# Trilogy\n\nпервая страница\n\nтретья страница");
}

#[tokio::test]
async fn ocr_fault_yields_placeholder_page_not_a_skip() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/doc.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;

    let refs = vec![DocumentReference::new("Flaky scan", server.url("/doc.pdf"))];
    let ocr = ScriptedOcr::new(vec![
        PageScript::Text("нормальный текст"),
        PageScript::Fault,
    ]);
    let config = base_config(out.path(), 2, ocr).build().unwrap();

    let summary = harvest_documents(&refs, &config).await.expect("run succeeds");

    assert_eq!(summary.processed_count(), 1);
    assert_eq!(summary.processed[0].placeholder_pages, 1);
    let body = std::fs::read_to_string(&summary.processed[0].output_path).unwrap();
    assert!(body.contains("нормальный текст"));
    assert!(body.contains("OCR failed:"), "got: {body}");
}

#[tokio::test]
async fn blank_page_gets_a_marker_that_survives_filtering() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/doc.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;

    let refs = vec![DocumentReference::new("Blank scan", server.url("/doc.pdf"))];
    let ocr = ScriptedOcr::new(vec![PageScript::Text("")]);
    let config = base_config(out.path(), 1, ocr).build().unwrap();

    let summary = harvest_documents(&refs, &config).await.expect("run succeeds");

    assert_eq!(summary.processed_count(), 1);
    let body = std::fs::read_to_string(&summary.processed[0].output_path).unwrap();
    assert!(body.contains(EMPTY_PAGE_MARKER));
}

// ── Skip paths ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn fully_filtered_document_is_skipped_with_no_file() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/stamps.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;

    let refs = vec![DocumentReference::new("Only stamps", server.url("/stamps.pdf"))];
    let ocr = ScriptedOcr::new(vec![PageScript::Text(
        "Контур Крипто\nвладелец ООО АКАДЕМИЯ ДПО\nсерийный номер 01",
    )]);
    let config = base_config(out.path(), 1, ocr).build().unwrap();

    let summary = harvest_documents(&refs, &config).await.expect("run succeeds");

    assert!(summary.is_empty());
    assert_eq!(summary.skipped[0].reason, SkipReason::NoUsableContent);
    assert!(summary.combined_path.is_none());
    // Only the audit log may exist in the output dir — no Markdown at all.
    assert!(md_files(out.path()).is_empty());
}

#[tokio::test]
async fn html_body_is_a_fetch_skip_not_a_rasterizer_error() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/page.pdf");
            then.status(200).body("<html><body>soft 404</body></html>");
        })
        .await;

    let refs = vec![DocumentReference::new("Soft404", server.url("/page.pdf"))];
    let ocr = ScriptedOcr::new(vec![]);
    let config = base_config(out.path(), 1, ocr).build().unwrap();

    let summary = harvest_documents(&refs, &config).await.expect("run succeeds");
    match &summary.skipped[0].reason {
        SkipReason::Fetch(detail) => assert!(detail.contains("not a PDF"), "got: {detail}"),
        other => panic!("expected Fetch skip, got {other:?}"),
    }
}

#[tokio::test]
async fn rasterizer_rejection_skips_the_document() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/bad.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;

    let refs = vec![DocumentReference::new("Corrupt", server.url("/bad.pdf"))];
    let config = RunConfig::builder()
        .output_dir(out.path())
        .rasterizer(Arc::new(BrokenRasterizer))
        .ocr_engine(ScriptedOcr::new(vec![]))
        .build()
        .unwrap();

    let summary = harvest_documents(&refs, &config).await.expect("run succeeds");
    match &summary.skipped[0].reason {
        SkipReason::Rasterize(detail) => assert!(detail.contains("rejected")),
        other => panic!("expected Rasterize skip, got {other:?}"),
    }
}

// ── Startup checks ───────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_ocr_language_fails_before_any_download() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();
    let doc_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/doc.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;

    let refs = vec![DocumentReference::new("Doc", server.url("/doc.pdf"))];
    let ocr = ScriptedOcr::with_languages(vec![], &["eng", "osd"]);
    let config = base_config(out.path(), 1, ocr).build().unwrap();

    let err = harvest_documents(&refs, &config).await.unwrap_err();
    assert!(matches!(err, MillError::OcrLanguageMissing { .. }), "got: {err:?}");
    assert_eq!(doc_mock.hits_async().await, 0, "no document may be fetched");
}

#[tokio::test]
async fn empty_listing_url_is_a_config_error() {
    let config = RunConfig::builder()
        .rasterizer(Arc::new(FixedRasterizer { pages: 1 }))
        .ocr_engine(ScriptedOcr::new(vec![]))
        .build()
        .unwrap();
    let err = harvest(&config).await.unwrap_err();
    assert!(matches!(err, MillError::InvalidConfig(_)), "got: {err:?}");
}

// ── Resource discipline ──────────────────────────────────────────────────────

#[tokio::test]
async fn output_dir_holds_only_markdown_and_audit_log_after_a_run() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/a.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/broken.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;

    // One success and one rasterizer failure: cleanup must hold on both paths.
    let refs = vec![DocumentReference::new("Good", server.url("/a.pdf"))];
    let ocr = ScriptedOcr::new(vec![PageScript::Text("контент")]);
    let config = base_config(out.path(), 1, ocr).build().unwrap();
    harvest_documents(&refs, &config).await.expect("run succeeds");

    let refs = vec![DocumentReference::new("Bad", server.url("/broken.pdf"))];
    let config2 = RunConfig::builder()
        .output_dir(out.path())
        .rasterizer(Arc::new(BrokenRasterizer))
        .ocr_engine(ScriptedOcr::new(vec![]))
        .build()
        .unwrap();
    harvest_documents(&refs, &config2).await.expect("run succeeds");

    for entry in std::fs::read_dir(out.path()).unwrap() {
        let name = entry.unwrap().file_name().to_string_lossy().into_owned();
        assert!(
            name.ends_with(".md") || name == "removed_stamps.log",
            "unexpected artifact in output dir: {name}"
        );
    }
}

#[tokio::test]
async fn downloaded_temp_file_is_removed_on_drop() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/doc.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;

    let client = reqwest::Client::new();
    let tmp = ocrmill::pipeline::fetch::fetch_document(&client, &server.url("/doc.pdf"), 30)
        .await
        .expect("download succeeds");
    let path = tmp.path().to_path_buf();
    assert!(path.exists());
    drop(tmp);
    assert!(!path.exists(), "temp PDF must not outlive its handle");
}

#[tokio::test]
async fn audit_log_records_removed_stamp_lines() {
    let server = MockServer::start_async().await;
    let out = tempfile::tempdir().unwrap();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/doc.pdf");
            then.status(200).body(pdf_bytes());
        })
        .await;

    let refs = vec![DocumentReference::new("Audited", server.url("/doc.pdf"))];
    let ocr = ScriptedOcr::new(vec![PageScript::Text("удостоверяющий центр\nтекст документа")]);
    let config = base_config(out.path(), 1, ocr).build().unwrap();

    harvest_documents(&refs, &config).await.expect("run succeeds");

    let audit = std::fs::read_to_string(out.path().join("removed_stamps.log")).unwrap();
    assert!(audit.contains("удостоверяющий центр"));
    assert!(audit.contains("stamp pattern"));
    assert!(!audit.contains("текст документа"));
}
