//! Live inventory: what the fleet actually looks like in a region.
//!
//! The [`Inventory`] trait is the seam to the cloud. Backends live in
//! [`crate::backend`]; [`CachedInventory`] sits in front of any of them so a
//! run issues at most one query of each kind per region.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Tag carrying the managed server name on its backing instance.
pub const SERVER_NAME_TAG: &str = "opsworks-cm:server-name";

/// Lifecycle state of a compute instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
    /// A state name this tool does not know, kept verbatim
    Other(String),
}

impl InstanceState {
    /// Parse a state name as reported by the compute API.
    pub fn from_name(name: &str) -> Self {
        match name {
            "pending" => InstanceState::Pending,
            "running" => InstanceState::Running,
            "shutting-down" => InstanceState::ShuttingDown,
            "terminated" => InstanceState::Terminated,
            "stopping" => InstanceState::Stopping,
            "stopped" => InstanceState::Stopped,
            other => InstanceState::Other(other.to_string()),
        }
    }

    /// Get the API name of this state.
    pub fn name(&self) -> &str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::ShuttingDown => "shutting-down",
            InstanceState::Terminated => "terminated",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::Other(name) => name,
        }
    }

    /// Whether an instance in this state can still back a server.
    ///
    /// Terminated and shutting-down instances never count as existing.
    pub fn is_active(&self) -> bool {
        !matches!(self, InstanceState::Terminated | InstanceState::ShuttingDown)
    }
}

impl From<String> for InstanceState {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<InstanceState> for String {
    fn from(state: InstanceState) -> Self {
        state.name().to_string()
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One compute instance as seen in live inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    pub state: InstanceState,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl LiveInstance {
    /// Create an instance with the given state and no tags.
    pub fn new(state: InstanceState) -> Self {
        Self {
            instance_id: None,
            state,
            tags: BTreeMap::new(),
        }
    }

    /// Add a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Set the server-name tag.
    pub fn with_server_name(self, name: impl Into<String>) -> Self {
        self.with_tag(SERVER_NAME_TAG, name)
    }

    /// The managed server name this instance backs, if tagged.
    pub fn server_name(&self) -> Option<&str> {
        self.tags.get(SERVER_NAME_TAG).map(String::as_str)
    }

    /// The server name, but only while the instance is active.
    pub fn active_server_name(&self) -> Option<&str> {
        if self.state.is_active() {
            self.server_name()
        } else {
            None
        }
    }
}

/// Read access to live compute inventory, one region at a time.
pub trait Inventory {
    /// Every instance in the region, across all reservations.
    fn instances(&self, region: &str) -> Result<Vec<LiveInstance>>;

    /// Ids of every subnet in the region.
    fn subnets(&self, region: &str) -> Result<Vec<String>>;

    /// Names of every key pair in the region.
    fn key_pairs(&self, region: &str) -> Result<Vec<String>>;
}

impl<I: Inventory + ?Sized> Inventory for Box<I> {
    fn instances(&self, region: &str) -> Result<Vec<LiveInstance>> {
        (**self).instances(region)
    }

    fn subnets(&self, region: &str) -> Result<Vec<String>> {
        (**self).subnets(region)
    }

    fn key_pairs(&self, region: &str) -> Result<Vec<String>> {
        (**self).key_pairs(region)
    }
}

impl<I: Inventory + ?Sized> Inventory for &I {
    fn instances(&self, region: &str) -> Result<Vec<LiveInstance>> {
        (**self).instances(region)
    }

    fn subnets(&self, region: &str) -> Result<Vec<String>> {
        (**self).subnets(region)
    }

    fn key_pairs(&self, region: &str) -> Result<Vec<String>> {
        (**self).key_pairs(region)
    }
}

/// Per-run memo in front of an [`Inventory`].
///
/// Each query kind reaches the wrapped inventory at most once per region.
/// Failed queries are not cached.
pub struct CachedInventory<I> {
    inner: I,
    instances: HashMap<String, Vec<LiveInstance>>,
    subnets: HashMap<String, Vec<String>>,
    key_pairs: HashMap<String, Vec<String>>,
}

impl<I: Inventory> CachedInventory<I> {
    /// Wrap an inventory with an empty cache.
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            instances: HashMap::new(),
            subnets: HashMap::new(),
            key_pairs: HashMap::new(),
        }
    }

    /// Instances in a region, scanning it on first use.
    pub fn instances(&mut self, region: &str) -> Result<&[LiveInstance]> {
        if !self.instances.contains_key(region) {
            log::info!("Scanning instances in {region}");
            let found = self.inner.instances(region)?;
            log::debug!("Found {} instances in {region}", found.len());
            self.instances.insert(region.to_string(), found);
        }
        Ok(self
            .instances
            .get(region)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Whether a subnet exists in a region.
    pub fn has_subnet(&mut self, region: &str, subnet: &str) -> Result<bool> {
        if !self.subnets.contains_key(region) {
            log::debug!("Listing subnets in {region}");
            let found = self.inner.subnets(region)?;
            self.subnets.insert(region.to_string(), found);
        }
        Ok(self
            .subnets
            .get(region)
            .is_some_and(|s| s.iter().any(|id| id == subnet)))
    }

    /// Whether a key pair exists in a region.
    pub fn has_key_pair(&mut self, region: &str, key_pair: &str) -> Result<bool> {
        if !self.key_pairs.contains_key(region) {
            log::debug!("Listing key pairs in {region}");
            let found = self.inner.key_pairs(region)?;
            self.key_pairs.insert(region.to_string(), found);
        }
        Ok(self
            .key_pairs
            .get(region)
            .is_some_and(|k| k.iter().any(|name| name == key_pair)))
    }

    /// Regions whose instances were scanned so far, sorted.
    pub fn scanned_regions(&self) -> Vec<String> {
        self.instances
            .keys()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Unwrap the underlying inventory.
    pub fn into_inner(self) -> I {
        self.inner
    }
}
