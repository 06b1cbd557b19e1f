use anyhow::Result;
use reconcile::render_buildspec;
use std::path::Path;

use crate::artifact;

/// Print the build script for an action list or output artifact.
pub fn run(path: &Path) -> Result<()> {
    let actions = artifact::load_action_list(path)?;
    log::debug!("Rendering {} action(s) from {}", actions.len(), path.display());
    print!("{}", render_buildspec(&actions));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_bare_action_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("actionlist.json");
        std::fs::write(&path, r#"{"ops_env": [{"name": "legacy1", "ops_delete": true}]}"#).unwrap();
        assert!(run(&path).is_ok());
    }

    #[test]
    fn test_render_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("actionlist.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(run(&path).is_err());
    }
}
