//! Inventory backend reading a recorded JSON snapshot.
//!
//! ```json
//! {
//!   "regions": {
//!     "us-east-1": {
//!       "instances": [
//!         {"instance_id": "i-1", "state": "running",
//!          "tags": {"opsworks-cm:server-name": "db1"}}
//!       ],
//!       "subnets": ["subnet-abc"],
//!       "key_pairs": ["ops"]
//!     }
//!   }
//! }
//! ```
//!
//! Regions missing from the snapshot are empty.

use crate::error::{Error, Result};
use crate::inventory::{Inventory, LiveInstance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Everything recorded for one region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    #[serde(default)]
    pub instances: Vec<LiveInstance>,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub key_pairs: Vec<String>,
}

/// Inventory served from memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBackend {
    #[serde(default)]
    pub regions: BTreeMap<String, RegionSnapshot>,
}

impl SnapshotBackend {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a snapshot document.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Self::from_json(&content)?;
        log::debug!(
            "Loaded inventory snapshot {} ({} regions)",
            path.display(),
            snapshot.regions.len()
        );
        Ok(snapshot)
    }

    fn region_mut(&mut self, region: &str) -> &mut RegionSnapshot {
        self.regions.entry(region.to_string()).or_default()
    }

    /// Add an instance to a region.
    pub fn with_instance(mut self, region: &str, instance: LiveInstance) -> Self {
        self.region_mut(region).instances.push(instance);
        self
    }

    /// Add a subnet to a region.
    pub fn with_subnet(mut self, region: &str, subnet: impl Into<String>) -> Self {
        self.region_mut(region).subnets.push(subnet.into());
        self
    }

    /// Add a key pair to a region.
    pub fn with_key_pair(mut self, region: &str, key_pair: impl Into<String>) -> Self {
        self.region_mut(region).key_pairs.push(key_pair.into());
        self
    }

    fn region(&self, region: &str) -> Option<&RegionSnapshot> {
        self.regions.get(region)
    }
}

impl Inventory for SnapshotBackend {
    fn instances(&self, region: &str) -> Result<Vec<LiveInstance>> {
        Ok(self
            .region(region)
            .map(|r| r.instances.clone())
            .unwrap_or_default())
    }

    fn subnets(&self, region: &str) -> Result<Vec<String>> {
        Ok(self
            .region(region)
            .map(|r| r.subnets.clone())
            .unwrap_or_default())
    }

    fn key_pairs(&self, region: &str) -> Result<Vec<String>> {
        Ok(self
            .region(region)
            .map(|r| r.key_pairs.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InstanceState;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_snapshot_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "regions": {{
                    "us-east-1": {{
                        "instances": [
                            {{"instance_id": "i-1", "state": "running",
                              "tags": {{"opsworks-cm:server-name": "db1"}}}}
                        ],
                        "subnets": ["subnet-abc"]
                    }}
                }}
            }}"#
        )
        .unwrap();

        let snapshot = SnapshotBackend::load(file.path()).unwrap();
        let instances = snapshot.instances("us-east-1").unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].state, InstanceState::Running);
        assert_eq!(instances[0].server_name(), Some("db1"));
        assert_eq!(snapshot.subnets("us-east-1").unwrap(), vec!["subnet-abc"]);
        assert!(snapshot.key_pairs("us-east-1").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_region_is_empty() {
        let snapshot = SnapshotBackend::new().with_subnet("us-east-1", "subnet-abc");
        assert!(snapshot.instances("eu-west-1").unwrap().is_empty());
        assert!(snapshot.subnets("eu-west-1").unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = SnapshotBackend::load(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(matches!(err, Error::Snapshot { .. }));
    }
}
