use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fleetgate")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Validate and reconcile a fleet of managed configuration servers",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to <config dir>/config.toml)
    #[arg(short, long, global = true, env = "FLEETGATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check a manifest for errors before anything is touched (stage A)
    Validate(ValidateArgs),

    /// Diff a manifest against live inventory and write the action list (stage B)
    Reconcile(ReconcileArgs),

    /// Render the build script for an existing actionlist.json
    Render {
        /// Path to actionlist.json
        actionlist: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared pipeline arguments
// ============================================================================

#[derive(Args, Clone)]
pub struct PipelineArgs {
    /// Input artifact: a zip containing opsworkscmconfig.json, or the JSON itself
    #[arg(short, long, default_value = "opsworkscmconfig.json")]
    pub manifest: PathBuf,

    /// Pipeline job id reported with a failure verdict
    #[arg(long, env = "FLEETGATE_JOB_ID")]
    pub job_id: Option<String>,

    /// Also write the verdict as JSON to this file
    #[arg(long)]
    pub verdict_file: Option<PathBuf>,
}

// ============================================================================
// Validate
// ============================================================================

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

// ============================================================================
// Reconcile
// ============================================================================

#[derive(Args)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Account the pipeline runs under
    #[arg(long, env = "FLEETGATE_ACCOUNT")]
    pub account: Option<String>,

    /// Region the pipeline runs in (scanned in clean-up mode)
    #[arg(long, env = "FLEETGATE_REGION")]
    pub region: Option<String>,

    /// Inventory backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Inventory snapshot file (implies --backend snapshot)
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Named aws CLI profile
    #[arg(long)]
    pub profile: Option<String>,

    /// Output artifact (zip with actionlist.json and buildspec.yml)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show the plan without writing the output artifact
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Query live inventory with the aws CLI
    AwsCli,
    /// Read inventory from a JSON snapshot
    Snapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_reconcile() {
        let cli = Cli::try_parse_from([
            "fleetgate",
            "-vv",
            "reconcile",
            "--manifest",
            "in.zip",
            "--account",
            "111",
            "--snapshot",
            "inv.json",
            "-n",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Reconcile(args) = cli.command else {
            panic!("expected reconcile");
        };
        assert_eq!(args.pipeline.manifest, PathBuf::from("in.zip"));
        assert_eq!(args.account.as_deref(), Some("111"));
        assert_eq!(args.snapshot, Some(PathBuf::from("inv.json")));
        assert!(args.dry_run);
    }

    #[test]
    fn test_parse_backend_names() {
        let cli =
            Cli::try_parse_from(["fleetgate", "reconcile", "--backend", "aws-cli"]).unwrap();
        let Command::Reconcile(args) = cli.command else {
            panic!("expected reconcile");
        };
        assert_eq!(args.backend, Some(BackendArg::AwsCli));
    }
}
