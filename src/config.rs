//! fleetgate configuration (`config.toml`)
//!
//! ```toml
//! [pipeline]
//! account = "111122223333"
//! region = "us-east-1"
//!
//! [inventory]
//! backend = "aws-cli"
//! profile = "fleet"
//!
//! [output]
//! artifact = "~/out/fleet.zip"
//! verdict = "~/out/verdict.json"
//! ```
//!
//! Command line flags and `FLEETGATE_*` environment variables win over the file.

use crate::cli::{BackendArg, PipelineArgs, ReconcileArgs};
use crate::paths;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default output artifact name when neither flag nor config names one.
pub const DEFAULT_ARTIFACT: &str = "fleetgate-output.zip";

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSection,
    pub inventory: InventorySection,
    pub output: OutputSection,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineSection {
    pub account: Option<String>,
    pub region: Option<String>,
    pub job_id: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InventorySection {
    pub backend: Option<BackendKind>,
    pub snapshot: Option<String>,
    pub profile: Option<String>,
    pub aws_path: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputSection {
    pub artifact: Option<String>,
    pub verdict: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    AwsCli,
    Snapshot,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::AwsCli => Self::AwsCli,
            BackendArg::Snapshot => Self::Snapshot,
        }
    }
}

impl Config {
    /// Load the config file.
    ///
    /// An explicit path must exist. The default path is optional and a
    /// missing file yields the default config.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => {
                let path = paths::config_file()?;
                if !path.exists() {
                    log::debug!("No config file at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };

        log::debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Job id from the command line or environment, else the config file.
    pub fn job_id(&self, args: &PipelineArgs) -> Option<String> {
        args.job_id.clone().or_else(|| self.pipeline.job_id.clone())
    }

    /// Verdict file from the command line, else the config file.
    pub fn verdict_path(&self, args: &PipelineArgs) -> Option<PathBuf> {
        args.verdict_file
            .clone()
            .or_else(|| self.output.verdict.as_deref().map(paths::expand))
    }

    /// Merge reconcile flags over the file into a complete run setup.
    pub fn resolve_reconcile(&self, args: &ReconcileArgs) -> Result<ReconcileSettings> {
        let account = args
            .account
            .clone()
            .or_else(|| self.pipeline.account.clone())
            .context("No pipeline account: pass --account, set FLEETGATE_ACCOUNT, or set pipeline.account")?;
        let region = args
            .region
            .clone()
            .or_else(|| self.pipeline.region.clone())
            .context("No pipeline region: pass --region, set FLEETGATE_REGION, or set pipeline.region")?;

        let snapshot = args
            .snapshot
            .clone()
            .or_else(|| self.inventory.snapshot.as_deref().map(paths::expand));

        // --snapshot alone implies the snapshot backend
        let kind = args
            .backend
            .map(BackendKind::from)
            .or_else(|| args.snapshot.as_ref().map(|_| BackendKind::Snapshot))
            .or(self.inventory.backend)
            .unwrap_or(BackendKind::AwsCli);

        let inventory = match kind {
            BackendKind::Snapshot => InventorySource::Snapshot(
                snapshot.context("Snapshot backend selected but no snapshot file given")?,
            ),
            BackendKind::AwsCli => InventorySource::AwsCli {
                profile: args.profile.clone().or_else(|| self.inventory.profile.clone()),
                aws_path: self.inventory.aws_path.as_deref().map(paths::expand),
            },
        };

        let output = args
            .output
            .clone()
            .or_else(|| self.output.artifact.as_deref().map(paths::expand))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT));

        Ok(ReconcileSettings {
            account,
            region,
            inventory,
            output,
        })
    }
}

/// Everything a reconcile run needs beyond the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    pub account: String,
    pub region: String,
    pub inventory: InventorySource,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventorySource {
    AwsCli {
        profile: Option<String>,
        aws_path: Option<PathBuf>,
    },
    Snapshot(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use tempfile::TempDir;

    fn reconcile_args(argv: &[&str]) -> ReconcileArgs {
        let mut full = vec!["fleetgate", "reconcile"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Reconcile(args) => args,
            _ => panic!("expected reconcile"),
        }
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
[pipeline]
account = "111"
region = "us-east-1"
job_id = "job-7"

[inventory]
backend = "snapshot"
snapshot = "/tmp/inv.json"

[output]
artifact = "/tmp/out.zip"
"#,
        )
        .unwrap();

        assert_eq!(config.pipeline.account.as_deref(), Some("111"));
        assert_eq!(config.inventory.backend, Some(BackendKind::Snapshot));
        assert_eq!(config.output.verdict, None);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Config::from_toml("[inventory]\nbackend = \"ssh\"\n").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pipeline]\nregion = \"eu-west-1\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.pipeline.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_flags_override_file() {
        let config = Config::from_toml(
            "[pipeline]\naccount = \"111\"\nregion = \"us-east-1\"\n[inventory]\nprofile = \"file\"\n",
        )
        .unwrap();
        let args = reconcile_args(&["--account", "222", "--profile", "cli"]);

        let settings = config.resolve_reconcile(&args).unwrap();
        assert_eq!(settings.account, "222");
        assert_eq!(settings.region, "us-east-1");
        assert_eq!(
            settings.inventory,
            InventorySource::AwsCli {
                profile: Some("cli".to_string()),
                aws_path: None,
            }
        );
        assert_eq!(settings.output, PathBuf::from(DEFAULT_ARTIFACT));
    }

    #[test]
    fn test_snapshot_flag_implies_snapshot_backend() {
        let args = reconcile_args(&[
            "--account",
            "111",
            "--region",
            "us-east-1",
            "--snapshot",
            "inv.json",
        ]);
        let settings = Config::default().resolve_reconcile(&args).unwrap();
        assert_eq!(
            settings.inventory,
            InventorySource::Snapshot(PathBuf::from("inv.json"))
        );
    }

    #[test]
    fn test_snapshot_backend_requires_file() {
        let args = reconcile_args(&[
            "--account",
            "111",
            "--region",
            "us-east-1",
            "--backend",
            "snapshot",
        ]);
        assert!(Config::default().resolve_reconcile(&args).is_err());
    }

    #[test]
    fn test_missing_account_is_error() {
        let config = Config::from_toml("[pipeline]\nregion = \"us-east-1\"\n").unwrap();
        let mut args = reconcile_args(&[]);
        args.account = None;
        let err = config.resolve_reconcile(&args).unwrap_err();
        assert!(err.to_string().contains("No pipeline account"));
    }
}
