//! Action list: the create/delete work handed to the downstream executor.
//!
//! Wire format (`actionlist.json`):
//!
//! ```json
//! {"ops_env": [
//!     {"name": "db1", "ops_engine": "Puppet", "...": "..."},
//!     {"name": "legacy1", "ops_delete": true}
//! ]}
//! ```

use crate::error::Result;
use fleetspec::{ServerSpec, literal_bool};
use serde::{Deserialize, Deserializer, Serialize};

/// Intent to delete a live server that no manifest entry declares.
///
/// Exactly `name` and `ops_delete`; any other key makes the entry a create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteIntent {
    pub name: String,
    /// Always true; marks the entry as a deletion on the wire
    #[serde(deserialize_with = "delete_marker")]
    pub ops_delete: bool,
}

impl DeleteIntent {
    /// Create a delete intent for a server name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops_delete: true,
        }
    }
}

/// Accept `true` or the legacy `"True"`; anything else is not a delete marker.
fn delete_marker<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match literal_bool(&value) {
        Some(true) => Ok(true),
        _ => Err(serde::de::Error::custom(format!(
            "ops_delete must be true, got {value}"
        ))),
    }
}

/// One unit of work for the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionEntry {
    /// Delete a rogue server
    Delete(DeleteIntent),
    /// Create a server, with every default resolved
    Create(ServerSpec),
}

impl ActionEntry {
    /// Server name this action targets.
    pub fn name(&self) -> &str {
        match self {
            ActionEntry::Delete(d) => &d.name,
            ActionEntry::Create(s) => &s.name,
        }
    }

    /// Whether this is a delete intent.
    pub fn is_delete(&self) -> bool {
        matches!(self, ActionEntry::Delete(_))
    }
}

/// Ordered create/delete actions produced by one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionList {
    #[serde(rename = "ops_env")]
    pub entries: Vec<ActionEntry>,
}

impl ActionList {
    /// Create an empty action list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a create intent.
    pub fn push_create(&mut self, spec: ServerSpec) {
        self.entries.push(ActionEntry::Create(spec));
    }

    /// Append a delete intent.
    pub fn push_delete(&mut self, name: impl Into<String>) {
        self.entries.push(ActionEntry::Delete(DeleteIntent::new(name)));
    }

    /// Create intents, in order.
    pub fn creates(&self) -> impl Iterator<Item = &ServerSpec> {
        self.entries.iter().filter_map(|e| match e {
            ActionEntry::Create(spec) => Some(spec),
            ActionEntry::Delete(_) => None,
        })
    }

    /// Delete intents, in order.
    pub fn deletes(&self) -> impl Iterator<Item = &DeleteIntent> {
        self.entries.iter().filter_map(|e| match e {
            ActionEntry::Delete(intent) => Some(intent),
            ActionEntry::Create(_) => None,
        })
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to the `actionlist.json` document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an `actionlist.json` document.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
