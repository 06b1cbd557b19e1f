mod artifact;
mod cli;
mod commands;
mod config;
mod paths;
mod ui;
mod verdict;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, PipelineArgs};
use config::Config;
use std::io;
use std::process::ExitCode;
use verdict::{PipelineSink, Verdict, VerdictSink};

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

#[cfg(test)]
impl Context {
    pub const fn quiet() -> Self {
        Self {
            verbose: 0,
            quiet: true,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    log::trace!("verbosity {}", ctx.verbose);

    match cli.command {
        Command::Validate(args) => run_stage(cli.config.as_deref(), &args.pipeline, |_| {
            commands::validate::run(&ctx, &args)
        }),
        Command::Reconcile(args) => run_stage(cli.config.as_deref(), &args.pipeline, |config| {
            commands::reconcile::run(&ctx, config, &args)
        }),
        Command::Render { actionlist } => exit_with(commands::render::run(&actionlist)),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "fleetgate", &mut io::stdout());
            ExitCode::SUCCESS
        }
    }
}

/// Run a pipeline stage and report exactly one verdict for it.
fn run_stage<F>(config_path: Option<&std::path::Path>, args: &PipelineArgs, stage: F) -> ExitCode
where
    F: FnOnce(&Config) -> Result<String>,
{
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            // No config means no configured verdict file either
            let verdict = Verdict::fail(&e, args.job_id.clone());
            return report(PipelineSink::new(args.verdict_file.clone()), &verdict);
        }
    };

    let verdict = match stage(&config) {
        Ok(summary) => Verdict::pass(summary),
        Err(e) => {
            log::debug!("Stage failed: {e:?}");
            Verdict::fail(&e, config.job_id(args))
        }
    };

    report(PipelineSink::new(config.verdict_path(args)), &verdict)
}

fn report(sink: impl VerdictSink, verdict: &Verdict) -> ExitCode {
    if let Err(e) = sink.report(verdict) {
        ui::error(&format!("Could not report verdict: {e:#}"));
        return ExitCode::FAILURE;
    }
    if verdict.is_pass() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn exit_with(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
