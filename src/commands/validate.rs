//! Stage A: reject a bad manifest before any live resource is touched.

use anyhow::{Context as _, Result};
use fleetspec::Manifest;
use std::path::Path;

use crate::Context;
use crate::artifact;
use crate::cli::ValidateArgs;
use crate::ui;

pub fn run(ctx: &Context, args: &ValidateArgs) -> Result<String> {
    let manifest = load_validated(&args.pipeline.manifest)?;

    if !ctx.quiet {
        ui::header("Manifest");
        ui::kv("Source", &args.pipeline.manifest.display().to_string());
        ui::kv("Servers", &manifest.entries.len().to_string());
        let regions: Vec<String> = manifest.regions().into_iter().map(String::from).collect();
        ui::kv("Regions", &ui::list_or_none(&regions));
        ui::kv(
            "Delete if absent",
            if manifest.delete_if_absent { "yes" } else { "no" },
        );
        for entry in &manifest.entries {
            ui::dim(&format!("{} ({} in {})", entry.name, entry.engine, entry.region));
        }
        println!();
    }

    Ok(format!(
        "Manifest is valid: {}",
        ui::count(manifest.entries.len(), "server")
    ))
}

/// Load an input artifact and run every validation rule over it.
pub fn load_validated(path: &Path) -> Result<Manifest> {
    let raw = artifact::load_manifest(path)?;
    let manifest = fleetspec::validate(&raw).context("Manifest validation failed")?;
    log::info!(
        "Validated {} from {}",
        ui::count(manifest.entries.len(), "server"),
        path.display()
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PipelineArgs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn args(manifest: PathBuf) -> ValidateArgs {
        ValidateArgs {
            pipeline: PipelineArgs {
                manifest,
                job_id: None,
                verdict_file: None,
            },
        }
    }

    fn write(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("opsworkscmconfig.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_valid_manifest_passes() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            r#"{"ops_env": [{"name": "db1", "ops_engine": "Chef", "ops_account": "111",
                "ops_region": "us-east-1", "ops_subnet": "subnet-abc"}]}"#,
        );

        let summary = run(&Context::quiet(), &args(path)).unwrap();
        assert_eq!(summary, "Manifest is valid: 1 server");
    }

    #[test]
    fn test_duplicate_names_fail() {
        let dir = TempDir::new().unwrap();
        let entry = r#"{"name": "db1", "ops_engine": "Chef", "ops_account": "111",
            "ops_region": "us-east-1", "ops_subnet": "subnet-abc"}"#;
        let path = write(&dir, &format!(r#"{{"ops_env": [{entry}, {entry}]}}"#));

        let err = run(&Context::quiet(), &args(path)).unwrap_err();
        assert!(err.to_string().contains("Manifest validation failed"));
        assert!(format!("{err:#}").contains("db1"));
    }

    #[test]
    fn test_malformed_manifest_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "{\"ops_env\": [");

        let err = run(&Context::quiet(), &args(path)).unwrap_err();
        assert!(err.to_string().contains("Could not load configuration"));
    }
}
