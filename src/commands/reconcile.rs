//! Stage B: diff the manifest against live inventory and emit the action list.

use anyhow::{Context as _, Result};
use reconcile::{
    AwsCliBackend, Inventory, PipelineContext, Reconciliation, SnapshotBackend, render_buildspec,
};

use crate::Context;
use crate::artifact;
use crate::cli::ReconcileArgs;
use crate::commands::validate::load_validated;
use crate::config::{Config, InventorySource};
use crate::ui;

pub fn run(ctx: &Context, config: &Config, args: &ReconcileArgs) -> Result<String> {
    let manifest = load_validated(&args.pipeline.manifest)?;
    let settings = config.resolve_reconcile(args)?;
    let inventory = open_inventory(&settings.inventory)?;

    log::info!(
        "Reconciling {} for account {} from {}",
        ui::count(manifest.entries.len(), "server"),
        settings.account,
        settings.region
    );
    let context = PipelineContext::new(settings.account, settings.region);
    let result = reconcile::reconcile(&manifest, inventory, context)
        .context("Reconciliation failed")?;

    if !ctx.quiet {
        show_plan(&result);
    }

    if args.dry_run {
        if !ctx.quiet {
            ui::header("buildspec.yml");
            print!("{}", render_buildspec(&result.actions));
            println!();
            ui::info(&format!(
                "Dry run: {} not written",
                settings.output.display()
            ));
        }
    } else {
        artifact::write_artifact(&settings.output, &result.actions)?;
        if !ctx.quiet {
            ui::kv("Artifact", &settings.output.display().to_string());
        }
    }

    Ok(format!("Reconciled: {}", result.summary))
}

fn open_inventory(source: &InventorySource) -> Result<Box<dyn Inventory>> {
    match source {
        InventorySource::Snapshot(path) => {
            log::debug!("Using inventory snapshot {}", path.display());
            Ok(Box::new(SnapshotBackend::load(path)?))
        }
        InventorySource::AwsCli { profile, aws_path } => {
            let backend = match aws_path {
                Some(path) => AwsCliBackend::with_path(path),
                None => AwsCliBackend::new()?,
            };
            Ok(Box::new(backend.profile(profile.clone())))
        }
    }
}

fn show_plan(result: &Reconciliation) {
    let summary = &result.summary;

    ui::header("Plan");
    if summary.cleanup {
        ui::warn("Manifest is empty: every tagged server in the pipeline region is a deletion candidate");
    }
    ui::kv("Regions scanned", &ui::list_or_none(&summary.regions_scanned));

    if summary.is_converged() {
        ui::info("Fleet already matches the manifest");
    } else {
        println!();
        for spec in result.actions.creates() {
            ui::plan_create(
                &spec.name,
                &format!("({} in {}, {})", spec.engine, spec.region, spec.subnet),
            );
        }
        for intent in result.actions.deletes() {
            ui::plan_delete(&intent.name);
        }
    }

    if summary.unmanaged > 0 {
        ui::warn(&format!(
            "{} not in the manifest left in place (ops_delete_if_absent_entry is off)",
            ui::count(summary.unmanaged, "server")
        ));
    }
    println!();
}
