//! CLI binary for ocrmill.
//!
//! A thin shim over the library crate that maps CLI flags to `RunConfig`,
//! renders per-document progress, and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocrmill::{
    harvest, HarvestProgressCallback, ProgressCallback, RunConfig, SkipReason,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar over the document list plus one
/// log line per finished or skipped document.
struct CliProgress {
    bar: ProgressBar,
    /// Wall-clock start of the document currently in flight. Documents are
    /// processed sequentially, so a single slot is enough.
    started: Mutex<Option<Instant>>,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Checking engines…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .unwrap()
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl HarvestProgressCallback for CliProgress {
    fn on_run_start(&self, total_documents: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_documents as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Harvesting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, display_name: &str) {
        *self.started.lock().unwrap() = Some(Instant::now());
        self.bar.set_message(display_name.to_string());
    }

    fn on_document_done(&self, index: usize, total: usize, display_name: &str, pages: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index + 1,
            total,
            display_name,
            dim(&format!("{pages} pages, {:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_document_skipped(
        &self,
        index: usize,
        total: usize,
        display_name: &str,
        reason: &SkipReason,
    ) {
        let mut msg = reason.to_string();
        if msg.len() > 80 {
            msg.truncate(79);
            msg.push('…');
        }
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index + 1,
            total,
            display_name,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, processed: usize, skipped: usize) {
        self.bar.finish_and_clear();
        if skipped == 0 {
            eprintln!(
                "{} {} documents harvested successfully",
                green("✔"),
                bold(&processed.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents harvested  ({} skipped)",
                if processed == 0 { red("✘") } else { cyan("⚠") },
                bold(&processed.to_string()),
                processed + skipped,
                red(&skipped.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Harvest a document listing into ./doc_md
  ocrmill https://academy.example/documents

  # Custom output directory and combined report name
  ocrmill https://academy.example/documents -o out/md --combined charter_pack.md

  # Skip one known-bad document
  ocrmill https://academy.example/documents \
      --exclude https://academy.example/uploads/license.pdf

  # Explicit engine locations (air-gapped hosts)
  ocrmill --tesseract-path /opt/tesseract/bin/tesseract \
      --tessdata-dir /opt/tesseract/tessdata \
      --pdfium-dir /opt/pdfium/lib \
      https://academy.example/documents

  # Different recognition language and a custom stamp catalogue
  ocrmill --lang deu --patterns-file stamps_de.txt https://example.de/docs

  # Machine-readable run report
  ocrmill --json https://academy.example/documents > run.json

ENGINE SETUP:
  tesseract   must be installed with the requested language pack
              (e.g. rus.traineddata). Verified eagerly at startup.
  pdfium      the shared library is bound from --pdfium-dir, or from the
              system library path when the flag is omitted.

AUDIT LOG:
  Every line removed by the stamp filter is appended to
  <output-dir>/removed_stamps.log (override with --audit-log) together
  with a timestamp and the removal reason.
"#;

/// Harvest PDF documents from a listing page into cleaned Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "ocrmill",
    version,
    about = "Harvest PDF documents from a listing page, OCR them, and emit cleaned Markdown",
    long_about = "Download every PDF linked from a listing page's ordered list, rasterize and \
OCR each page, strip digital-signature stamp noise with an audited denylist, and write one \
Markdown file per document plus a combined report.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Listing page URL whose ordered-list anchors name the documents.
    listing_url: String,

    /// Directory receiving Markdown files and the combined report.
    #[arg(short, long, env = "OCRMILL_OUTPUT_DIR", default_value = "doc_md")]
    output_dir: PathBuf,

    /// File name of the combined report inside the output directory.
    #[arg(long, env = "OCRMILL_COMBINED", default_value = "combined.md")]
    combined: String,

    /// Document URL to exclude (repeatable).
    #[arg(long = "exclude", value_name = "URL")]
    excluded: Vec<String>,

    /// Rasterization DPI (72–600).
    #[arg(long, env = "OCRMILL_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// OCR recognition language code.
    #[arg(long, env = "OCRMILL_LANG", default_value = "rus")]
    lang: String,

    /// Path to the tesseract binary.
    #[arg(long, env = "OCRMILL_TESSERACT", default_value = "tesseract")]
    tesseract_path: PathBuf,

    /// Language-data directory for tesseract (--tessdata-dir).
    #[arg(long, env = "OCRMILL_TESSDATA_DIR")]
    tessdata_dir: Option<PathBuf>,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "OCRMILL_PDFIUM_DIR")]
    pdfium_dir: Option<PathBuf>,

    /// Audit log path for removed lines.
    #[arg(long, env = "OCRMILL_AUDIT_LOG")]
    audit_log: Option<PathBuf>,

    /// Replacement stamp-pattern catalogue: one regex per line, '#' comments.
    #[arg(long, env = "OCRMILL_PATTERNS_FILE")]
    patterns_file: Option<PathBuf>,

    /// Per-download timeout in seconds.
    #[arg(long, env = "OCRMILL_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// HTTP User-Agent header override.
    #[arg(long, env = "OCRMILL_USER_AGENT")]
    user_agent: Option<String>,

    /// Print the run summary as JSON to stdout.
    #[arg(long, env = "OCRMILL_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "OCRMILL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCRMILL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OCRMILL_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgress::new() as ProgressCallback)
    } else {
        None
    };

    let config = build_config(&cli, progress).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = harvest(&config).await.context("Harvest failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else if !cli.quiet {
        for skipped in &summary.skipped {
            eprintln!(
                "   {} {}  {}",
                red("skipped"),
                skipped.display_name,
                dim(&skipped.reason.to_string()),
            );
        }
        if let Some(ref path) = summary.combined_path {
            eprintln!("   combined report → {}", bold(&path.display().to_string()));
        }
    }

    if summary.is_empty() {
        anyhow::bail!("no documents produced any output (all skipped)");
    }

    Ok(())
}

/// Map CLI args to `RunConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RunConfig> {
    let mut builder = RunConfig::builder()
        .listing_url(&cli.listing_url)
        .excluded_urls(cli.excluded.iter().cloned())
        .output_dir(&cli.output_dir)
        .combined_filename(&cli.combined)
        .dpi(cli.dpi)
        .ocr_language(&cli.lang)
        .tesseract_path(&cli.tesseract_path)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref dir) = cli.tessdata_dir {
        builder = builder.tessdata_dir(dir);
    }
    if let Some(ref dir) = cli.pdfium_dir {
        builder = builder.pdfium_dir(dir);
    }
    if let Some(ref path) = cli.audit_log {
        builder = builder.audit_log_path(path);
    }
    if let Some(ref ua) = cli.user_agent {
        builder = builder.user_agent(ua);
    }
    if let Some(ref path) = cli.patterns_file {
        let patterns = load_patterns_file(path)
            .await
            .with_context(|| format!("Failed to read stamp patterns from {path:?}"))?;
        builder = builder.stamp_patterns(patterns);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Read a stamp-pattern catalogue file: one regex per line, blank lines and
/// `#` comments ignored.
async fn load_patterns_file(path: &Path) -> Result<Vec<String>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let patterns: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();
    anyhow::ensure!(!patterns.is_empty(), "pattern file contains no patterns");
    Ok(patterns)
}
