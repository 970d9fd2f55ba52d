//! Per-run plain-text log.
//!
//! The log is created fresh (truncating any file left by an earlier run in a reused
//! workspace) and every line is flushed as soon as it is written, so a failed run keeps all
//! lines reported before the failure.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::{SnrError, SnrResult};

/// Appends human-readable results to `snr_<base>.txt`.
#[derive(Debug)]
pub struct Reporter {
    path: PathBuf,
    file: File,
}

impl Reporter {
    /// Creates (or truncates) the log file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> SnrResult<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(SnrError::LogWrite)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the run header: producing crate, version and UTC start time.
    pub fn header(&mut self, subject: &str) -> SnrResult<()> {
        self.line(format!(
            "SNR report for {} ({} {}, {})",
            subject,
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        ))
    }

    /// Appends one line and flushes it.
    pub fn line(&mut self, text: impl AsRef<str>) -> SnrResult<()> {
        let text = text.as_ref();
        tracing::info!("{}", text);
        writeln!(self.file, "{text}").map_err(SnrError::LogWrite)?;
        self.file.flush().map_err(SnrError::LogWrite)
    }

    /// Appends a `label: value` line.
    pub fn value(&mut self, label: &str, value: f64) -> SnrResult<()> {
        self.line(format!("{label}: {value:.6}"))
    }
}
