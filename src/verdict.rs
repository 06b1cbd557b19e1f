//! Pipeline verdicts.
//!
//! Every run ends with exactly one [`Verdict`]. Sinks consume themselves on
//! [`VerdictSink::report`], so a second report does not type-check.

use crate::ui;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass { summary: String },
    Fail { message: String, job_id: Option<String> },
}

impl Verdict {
    pub fn pass(summary: impl Into<String>) -> Self {
        Self::Pass {
            summary: summary.into(),
        }
    }

    /// A failure carrying the full error chain.
    pub fn fail(err: &anyhow::Error, job_id: Option<String>) -> Self {
        Self::Fail {
            message: format!("{err:#}"),
            job_id,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Pass { summary } => summary,
            Self::Fail { message, .. } => message,
        }
    }
}

/// Where the run's verdict goes.
pub trait VerdictSink {
    fn report(self, verdict: &Verdict) -> Result<()>;
}

/// Prints the verdict to the terminal.
pub struct ConsoleSink;

impl VerdictSink for ConsoleSink {
    fn report(self, verdict: &Verdict) -> Result<()> {
        match verdict {
            Verdict::Pass { summary } => ui::success(summary),
            Verdict::Fail { message, job_id } => {
                ui::error(message);
                if let Some(job_id) = job_id {
                    ui::error(&format!("Job {job_id} failed"));
                }
            }
        }
        Ok(())
    }
}

/// Writes the verdict as JSON.
pub struct FileSink {
    path: PathBuf,
}

#[derive(Debug, Serialize)]
struct VerdictRecord<'a> {
    status: &'static str,
    message: &'a str,
    job_id: Option<&'a str>,
    reported_at: DateTime<Utc>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VerdictSink for FileSink {
    fn report(self, verdict: &Verdict) -> Result<()> {
        let record = VerdictRecord {
            status: if verdict.is_pass() { "succeeded" } else { "failed" },
            message: verdict.message(),
            job_id: match verdict {
                Verdict::Fail { job_id, .. } => job_id.as_deref(),
                Verdict::Pass { .. } => None,
            },
            reported_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&record)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Could not write verdict to {}", self.path.display()))?;
        log::debug!("Wrote verdict to {}", self.path.display());
        Ok(())
    }
}

/// Console output plus an optional verdict file.
pub struct PipelineSink {
    console: ConsoleSink,
    file: Option<FileSink>,
}

impl PipelineSink {
    pub fn new(verdict_file: Option<PathBuf>) -> Self {
        Self {
            console: ConsoleSink,
            file: verdict_file.map(FileSink::new),
        }
    }
}

impl VerdictSink for PipelineSink {
    fn report(self, verdict: &Verdict) -> Result<()> {
        self.console.report(verdict)?;
        if let Some(file) = self.file {
            file.report(verdict)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use tempfile::TempDir;

    fn read_record(path: &std::path::Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_fail_keeps_error_chain() {
        let err = anyhow!("subnet missing").context("Reconciliation failed");
        let verdict = Verdict::fail(&err, Some("job-1".to_string()));
        assert!(!verdict.is_pass());
        assert_eq!(verdict.message(), "Reconciliation failed: subnet missing");
    }

    #[test]
    fn test_file_sink_pass() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("verdict.json");

        FileSink::new(&path)
            .report(&Verdict::pass("1 to create"))
            .unwrap();

        let record = read_record(&path);
        assert_eq!(record["status"], "succeeded");
        assert_eq!(record["message"], "1 to create");
        assert!(record["job_id"].is_null());
        assert!(record["reported_at"].is_string());
    }

    #[test]
    fn test_file_sink_fail_with_job_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("verdict.json");

        let verdict = Verdict::Fail {
            message: "Duplicate server name 'db1'".to_string(),
            job_id: Some("job-9".to_string()),
        };
        PipelineSink::new(Some(path.clone())).report(&verdict).unwrap();

        let record = read_record(&path);
        assert_eq!(record["status"], "failed");
        assert_eq!(record["job_id"], "job-9");
    }

    #[test]
    fn test_file_sink_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("verdict.json");
        assert!(FileSink::new(path).report(&Verdict::pass("ok")).is_err());
    }
}
