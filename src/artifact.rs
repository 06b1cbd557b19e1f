//! Pipeline artifacts on the local filesystem.
//!
//! The input artifact is either a zip archive holding `opsworkscmconfig.json`
//! or that JSON file on its own. The output artifact is a zip archive with
//! `actionlist.json` and `buildspec.yml`.

use anyhow::{Context, Result, bail};
use fleetspec::{MANIFEST_FILE_NAME, RawManifest};
use reconcile::{ActionList, render_buildspec};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

pub const ACTION_LIST_FILE_NAME: &str = "actionlist.json";
pub const BUILDSPEC_FILE_NAME: &str = "buildspec.yml";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Read the manifest out of an input artifact.
///
/// Every failure here is a manifest format error: the artifact is
/// unreadable, the manifest is missing from the archive, or the JSON is
/// malformed.
pub fn load_manifest(path: &Path) -> Result<RawManifest> {
    let content = read_manifest_text(path)
        .with_context(|| format!("Could not load configuration from {}", path.display()))?;
    RawManifest::from_json(&content)
        .with_context(|| format!("Could not load configuration from {}", path.display()))
}

fn read_manifest_text(path: &Path) -> Result<String> {
    let data = fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;

    if !data.starts_with(ZIP_MAGIC) {
        log::debug!("Reading {} as a bare manifest", path.display());
        return String::from_utf8(data).context("Manifest is not valid UTF-8");
    }

    log::debug!("Reading {MANIFEST_FILE_NAME} from archive {}", path.display());
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;

        // Only the archive root counts
        if file.is_file() && file.name() == MANIFEST_FILE_NAME {
            let mut content = String::new();
            file.read_to_string(&mut content)
                .context("Manifest is not valid UTF-8")?;
            return Ok(content);
        }
    }

    bail!("{MANIFEST_FILE_NAME} not found in archive")
}

/// Write the output artifact: the action list and its rendered build script.
pub fn write_artifact(path: &Path, actions: &ActionList) -> Result<()> {
    let json = actions.to_json()?;
    let script = render_buildspec(actions);

    let mut buffer = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(ACTION_LIST_FILE_NAME, options)?;
        zip.write_all(json.as_bytes())?;
        zip.start_file(BUILDSPEC_FILE_NAME, options)?;
        zip.write_all(script.as_bytes())?;
        zip.finish()?;
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    fs::write(path, buffer).with_context(|| format!("Could not write {}", path.display()))?;
    log::info!("Wrote {} action(s) to {}", actions.len(), path.display());
    Ok(())
}

/// Read an action list from a bare `actionlist.json` or an output artifact.
pub fn load_action_list(path: &Path) -> Result<ActionList> {
    let data = fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;

    let content = if data.starts_with(ZIP_MAGIC) {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
        let mut file = archive
            .by_name(ACTION_LIST_FILE_NAME)
            .with_context(|| format!("{ACTION_LIST_FILE_NAME} not found in {}", path.display()))?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        content
    } else {
        String::from_utf8(data).context("Action list is not valid UTF-8")?
    };

    ActionList::from_json(&content)
        .with_context(|| format!("Invalid action list in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetspec::{Engine, ManifestEntry};
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{"ops_env": [{"name": "db1", "ops_engine": "Puppet",
        "ops_account": "111", "ops_region": "us-east-1", "ops_subnet": "subnet-abc"}]}"#;

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            for (name, content) in files {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        fs::write(path, buffer).unwrap();
    }

    #[test]
    fn test_load_bare_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        fs::write(&path, MANIFEST).unwrap();

        let raw = load_manifest(&path).unwrap();
        assert_eq!(raw.ops_env.len(), 1);
    }

    #[test]
    fn test_load_from_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("source.zip");
        write_zip(
            &path,
            &[("README", "ignore me"), ("opsworkscmconfig.json", MANIFEST)],
        );

        let raw = load_manifest(&path).unwrap();
        assert_eq!(raw.ops_env.len(), 1);
    }

    #[test]
    fn test_nested_manifest_is_not_picked_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("source.zip");
        write_zip(&path, &[("cfg/opsworkscmconfig.json", MANIFEST)]);

        let err = load_manifest(&path).unwrap_err();
        assert!(format!("{err:#}").contains("opsworkscmconfig.json not found in archive"));
    }

    #[test]
    fn test_zip_without_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("source.zip");
        write_zip(&path, &[("other.json", "{}")]);

        let err = load_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("Could not load configuration"));
        assert!(format!("{err:#}").contains("not found in archive"));
    }

    #[test]
    fn test_missing_ops_env_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        fs::write(&path, r#"{"servers": []}"#).unwrap();

        let err = load_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("Could not load configuration"));
    }

    #[test]
    fn test_missing_file_is_format_error() {
        let dir = TempDir::new().unwrap();
        let err = load_manifest(&dir.path().join("absent.zip")).unwrap_err();
        assert!(err.to_string().contains("Could not load configuration"));
    }

    #[test]
    fn test_write_artifact_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("fleet.zip");

        let mut actions = ActionList::new();
        actions.push_create(
            ManifestEntry::new("db1", Engine::Puppet, "111", "us-east-1", "subnet-abc").resolve(),
        );
        actions.push_delete("legacy1");
        write_artifact(&path, &actions).unwrap();

        let mut archive = zip::ZipArchive::new(fs::File::open(&path).unwrap()).unwrap();
        let mut script = String::new();
        archive
            .by_name(BUILDSPEC_FILE_NAME)
            .unwrap()
            .read_to_string(&mut script)
            .unwrap();
        assert!(script.contains("delete-server --server-name 'legacy1'"));

        let loaded = load_action_list(&path).unwrap();
        assert_eq!(loaded, actions);
    }

    #[test]
    fn test_load_bare_action_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ACTION_LIST_FILE_NAME);
        fs::write(&path, r#"{"ops_env": [{"name": "legacy1", "ops_delete": true}]}"#).unwrap();

        let loaded = load_action_list(&path).unwrap();
        assert_eq!(loaded.deletes().count(), 1);
    }
}
