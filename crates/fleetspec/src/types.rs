//! Core types for fleet manifests.
//!
//! A manifest moves through three shapes:
//!
//! - [`RawManifest`] / [`RawEntry`]: what the JSON said, loosely typed
//! - [`Manifest`] / [`ManifestEntry`]: the validated form, only built by
//!   [`crate::validate`]
//! - [`ServerSpec`]: one entry with every optional field resolved to its default

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Instance type used when an entry does not declare one.
pub const DEFAULT_INSTANCE_TYPE: &str = "m4.large";

/// Number of automated backups retained when an entry does not declare one.
pub const DEFAULT_BACKUP_RETENTION: u8 = 30;

/// Key that marks a delete intent in `actionlist.json`. Reserved in manifests.
pub const DELETE_MARKER_FIELD: &str = "ops_delete";

/// Configuration-management engine of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Engine {
    /// Chef Automate
    Chef,
    /// Puppet Enterprise
    Puppet,
}

impl Engine {
    /// Get the wire name of this engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Chef => "Chef",
            Engine::Puppet => "Puppet",
        }
    }

    /// Parse an engine from its wire name (case sensitive).
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Chef" => Some(Engine::Chef),
            "Puppet" => Some(Engine::Puppet),
            _ => None,
        }
    }

    /// The only engine model this engine accepts, also its default.
    pub fn engine_model(&self) -> &'static str {
        match self {
            Engine::Chef => "Single",
            Engine::Puppet => "Monolithic",
        }
    }

    /// The only engine version this engine accepts, also its default.
    pub fn engine_version(&self) -> &'static str {
        match self {
            Engine::Chef => "12",
            Engine::Puppet => "2017",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Interpret a JSON value as a literal boolean.
///
/// Accepts JSON `true`/`false` and the legacy string encodings `"True"`/`"False"`.
/// Anything else (including `"true"`, `1` or `null`) is not a literal boolean.
pub fn literal_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "True" => Some(true),
        Value::String(s) if s == "False" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Raw (as loaded)
// ============================================================================

/// The manifest exactly as deserialized from `opsworkscmconfig.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawManifest {
    /// Desired servers, in order
    pub ops_env: Vec<RawEntry>,

    /// Prune live servers that no entry declares
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ops_delete_if_absent_entry: Option<Value>,
}

impl RawManifest {
    /// Parse a manifest document.
    pub fn from_json(content: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// One server declaration as deserialized, before any rule is checked.
///
/// Every field is kept as raw JSON so that a wrong type is reported by the
/// rule that owns the field, not as an unreadable manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub ops_engine: Option<Value>,
    #[serde(default)]
    pub ops_account: Option<Value>,
    #[serde(default)]
    pub ops_region: Option<Value>,
    #[serde(default)]
    pub ops_subnet: Option<Value>,
    #[serde(default)]
    pub ops_engine_model: Option<Value>,
    #[serde(default)]
    pub ops_engine_version: Option<Value>,
    #[serde(default)]
    pub ops_key_pair_name: Option<Value>,
    #[serde(default)]
    pub ops_instance_type: Option<Value>,
    #[serde(default)]
    pub ops_maintenance_window: Option<Value>,
    #[serde(default)]
    pub ops_use_automated_backup: Option<Value>,
    #[serde(default)]
    pub ops_backup_retention: Option<Value>,
    #[serde(default)]
    pub ops_backup_window: Option<Value>,

    /// Fields this tool does not interpret, forwarded untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ============================================================================
// Validated
// ============================================================================

/// A manifest that passed every validation rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Desired servers, in manifest order
    pub entries: Vec<ManifestEntry>,
    /// Whether live servers absent from the manifest should be deleted
    pub delete_if_absent: bool,
}

impl Manifest {
    /// True when the manifest asks to tear down every tagged server.
    pub fn is_cleanup(&self) -> bool {
        self.entries.is_empty() && self.delete_if_absent
    }

    /// Distinct regions referenced by the entries, in first-seen order.
    pub fn regions(&self) -> Vec<&str> {
        let mut regions: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !regions.contains(&entry.region.as_str()) {
                regions.push(&entry.region);
            }
        }
        regions
    }
}

/// One validated server declaration. Optional fields are `None` when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub name: String,
    pub engine: Engine,
    pub account: String,
    pub region: String,
    pub subnet: String,
    pub engine_model: Option<String>,
    pub engine_version: Option<String>,
    pub key_pair_name: Option<String>,
    pub instance_type: Option<String>,
    pub maintenance_window: Option<String>,
    pub use_automated_backup: Option<bool>,
    pub backup_retention: Option<u8>,
    pub backup_window: Option<String>,
    pub extra: BTreeMap<String, Value>,
}

impl ManifestEntry {
    /// Create an entry with only the required fields set.
    pub fn new(
        name: impl Into<String>,
        engine: Engine,
        account: impl Into<String>,
        region: impl Into<String>,
        subnet: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            engine,
            account: account.into(),
            region: region.into(),
            subnet: subnet.into(),
            engine_model: None,
            engine_version: None,
            key_pair_name: None,
            instance_type: None,
            maintenance_window: None,
            use_automated_backup: None,
            backup_retention: None,
            backup_window: None,
            extra: BTreeMap::new(),
        }
    }

    /// The declared key pair, ignoring empty names.
    pub fn key_pair(&self) -> Option<&str> {
        self.key_pair_name.as_deref().filter(|k| !k.is_empty())
    }

    /// Resolve every optional field to its effective value.
    ///
    /// Retention and backup window only apply while automated backup is
    /// enabled; they are dropped when it is disabled.
    pub fn resolve(&self) -> ServerSpec {
        let use_automated_backup = self.use_automated_backup.unwrap_or(true);
        let (backup_retention, backup_window) = if use_automated_backup {
            (
                Some(self.backup_retention.unwrap_or(DEFAULT_BACKUP_RETENTION)),
                self.backup_window.clone(),
            )
        } else {
            (None, None)
        };

        ServerSpec {
            name: self.name.clone(),
            engine: self.engine,
            account: self.account.clone(),
            region: self.region.clone(),
            subnet: self.subnet.clone(),
            engine_model: self
                .engine_model
                .clone()
                .unwrap_or_else(|| self.engine.engine_model().to_string()),
            engine_version: self
                .engine_version
                .clone()
                .unwrap_or_else(|| self.engine.engine_version().to_string()),
            key_pair_name: self.key_pair().map(str::to_string),
            instance_type: self
                .instance_type
                .clone()
                .unwrap_or_else(|| DEFAULT_INSTANCE_TYPE.to_string()),
            maintenance_window: self.maintenance_window.clone(),
            use_automated_backup,
            backup_retention,
            backup_window,
            extra: self.extra.clone(),
        }
    }
}

// ============================================================================
// Resolved
// ============================================================================

/// A server with every default applied, serialized with the manifest's wire names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSpec {
    pub name: String,
    #[serde(rename = "ops_engine")]
    pub engine: Engine,
    #[serde(rename = "ops_account")]
    pub account: String,
    #[serde(rename = "ops_region")]
    pub region: String,
    #[serde(rename = "ops_subnet")]
    pub subnet: String,
    #[serde(rename = "ops_engine_model")]
    pub engine_model: String,
    #[serde(rename = "ops_engine_version")]
    pub engine_version: String,
    #[serde(
        rename = "ops_key_pair_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub key_pair_name: Option<String>,
    #[serde(rename = "ops_instance_type")]
    pub instance_type: String,
    #[serde(
        rename = "ops_maintenance_window",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub maintenance_window: Option<String>,
    #[serde(rename = "ops_use_automated_backup")]
    pub use_automated_backup: bool,
    #[serde(
        rename = "ops_backup_retention",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub backup_retention: Option<u8>,
    #[serde(
        rename = "ops_backup_window",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub backup_window: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_wire_names() {
        assert_eq!(Engine::from_wire("Chef"), Some(Engine::Chef));
        assert_eq!(Engine::from_wire("Puppet"), Some(Engine::Puppet));
        assert_eq!(Engine::from_wire("chef"), None);
        assert_eq!(Engine::Puppet.to_string(), "Puppet");
    }

    #[test]
    fn test_literal_bool() {
        assert_eq!(literal_bool(&json!(true)), Some(true));
        assert_eq!(literal_bool(&json!("False")), Some(false));
        assert_eq!(literal_bool(&json!("true")), None);
        assert_eq!(literal_bool(&json!(1)), None);
        assert_eq!(literal_bool(&Value::Null), None);
    }

    #[test]
    fn test_resolve_applies_engine_defaults() {
        let entry = ManifestEntry::new("db1", Engine::Puppet, "111", "us-east-1", "subnet-abc");
        let spec = entry.resolve();

        assert_eq!(spec.engine_model, "Monolithic");
        assert_eq!(spec.engine_version, "2017");
        assert_eq!(spec.instance_type, "m4.large");
        assert!(spec.use_automated_backup);
        assert_eq!(spec.backup_retention, Some(30));
        assert_eq!(spec.key_pair_name, None);

        let chef = ManifestEntry::new("c1", Engine::Chef, "111", "us-east-1", "subnet-abc");
        let spec = chef.resolve();
        assert_eq!(spec.engine_model, "Single");
        assert_eq!(spec.engine_version, "12");
    }

    #[test]
    fn test_resolve_drops_backup_settings_when_disabled() {
        let mut entry = ManifestEntry::new("db1", Engine::Chef, "111", "us-east-1", "subnet-abc");
        entry.use_automated_backup = Some(false);
        entry.backup_retention = Some(7);
        entry.backup_window = Some("Mon:03:00".to_string());

        let spec = entry.resolve();
        assert!(!spec.use_automated_backup);
        assert_eq!(spec.backup_retention, None);
        assert_eq!(spec.backup_window, None);
    }

    #[test]
    fn test_resolve_ignores_empty_key_pair() {
        let mut entry = ManifestEntry::new("db1", Engine::Chef, "111", "us-east-1", "subnet-abc");
        entry.key_pair_name = Some(String::new());
        assert_eq!(entry.key_pair(), None);
        assert_eq!(entry.resolve().key_pair_name, None);
    }

    #[test]
    fn test_server_spec_wire_format() {
        let mut entry = ManifestEntry::new("db1", Engine::Puppet, "111", "us-east-1", "subnet-abc");
        entry
            .extra
            .insert("ops_owner".to_string(), json!("platform-team"));

        let value = serde_json::to_value(entry.resolve()).unwrap();
        assert_eq!(value["name"], "db1");
        assert_eq!(value["ops_engine"], "Puppet");
        assert_eq!(value["ops_engine_model"], "Monolithic");
        assert_eq!(value["ops_backup_retention"], 30);
        assert_eq!(value["ops_owner"], "platform-team");
        assert!(value.get("ops_key_pair_name").is_none());
        assert!(value.get("ops_maintenance_window").is_none());
    }

    #[test]
    fn test_raw_manifest_requires_ops_env() {
        assert!(RawManifest::from_json(r#"{"ops_delete_if_absent_entry": "True"}"#).is_err());

        let raw = RawManifest::from_json(r#"{"ops_env": [{"name": "db1", "team": "infra"}]}"#)
            .unwrap();
        assert_eq!(raw.ops_env[0].name, Some(json!("db1")));
        assert_eq!(raw.ops_env[0].extra["team"], "infra");
    }

    #[test]
    fn test_manifest_regions_are_distinct() {
        let manifest = Manifest {
            entries: vec![
                ManifestEntry::new("a", Engine::Chef, "1", "us-east-1", "s"),
                ManifestEntry::new("b", Engine::Chef, "1", "eu-west-1", "s"),
                ManifestEntry::new("c", Engine::Chef, "1", "us-east-1", "s"),
            ],
            delete_if_absent: false,
        };
        assert_eq!(manifest.regions(), vec!["us-east-1", "eu-west-1"]);
        assert!(!manifest.is_cleanup());
    }
}
