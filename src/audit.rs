//! Append-only audit log for lines removed by the artifact filter.
//!
//! Stamp filtering is a destructive, heuristic operation. Every discarded
//! line is therefore written verbatim to a durable side-channel together
//! with a timestamp and the reason category, so a human can later verify
//! that no real document content was eaten by the denylist.
//!
//! The sink is a single shared file behind a mutex: the pipeline is
//! sequential today, but serializing writes here keeps the log coherent if
//! documents are ever processed in parallel. Recording never fails the
//! pipeline — a write error is logged and the filter carries on.

use crate::error::MillError;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Why the filter discarded a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Empty or whitespace-only.
    BlankLine,
    /// A single non-whitespace character flanked by whitespace.
    SingleChar,
    /// Matched an entry of the stamp pattern catalogue.
    StampPattern,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::BlankLine => write!(f, "blank line"),
            RemovalReason::SingleChar => write!(f, "single character"),
            RemovalReason::StampPattern => write!(f, "stamp pattern"),
        }
    }
}

/// Durable sink for filter removals.
///
/// Opened in append mode so successive runs accumulate history rather than
/// clobbering it.
pub struct AuditLog {
    sink: Option<Mutex<File>>,
}

impl AuditLog {
    /// Open (or create) the audit file at `path` in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MillError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| MillError::AuditLogFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| MillError::AuditLogFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self {
            sink: Some(Mutex::new(file)),
        })
    }

    /// A sink that only mirrors removals to `tracing`, with no file behind
    /// it. Used by unit tests and by callers that opt out of auditing.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Record one removed line. Infallible by design: the filter must never
    /// raise, so audit I/O errors degrade to a warning.
    pub fn record(&self, reason: RemovalReason, line: &str) {
        debug!(%reason, line, "filter removed line");
        if let Some(ref sink) = self.sink {
            let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let mut file = match sink.lock() {
                Ok(f) => f,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(e) = writeln!(file, "{stamp} - removed ({reason}): {line}") {
                warn!("audit log write failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_append_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("removed_stamps.log");

        let log = AuditLog::open(&path).expect("open");
        log.record(RemovalReason::StampPattern, "Контур Крипто");
        log.record(RemovalReason::BlankLine, "");
        drop(log);

        let contents = std::fs::read_to_string(&path).expect("read back");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("stamp pattern"));
        assert!(lines[0].contains("Контур Крипто"));
        assert!(lines[1].contains("blank line"));
    }

    #[test]
    fn reopening_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.log");

        AuditLog::open(&path)
            .expect("open")
            .record(RemovalReason::SingleChar, "й");
        AuditLog::open(&path)
            .expect("reopen")
            .record(RemovalReason::SingleChar, "ъ");

        let contents = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn disabled_sink_is_silent() {
        AuditLog::disabled().record(RemovalReason::BlankLine, "   ");
    }
}
