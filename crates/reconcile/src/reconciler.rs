//! The reconciler: desired manifest vs. live inventory.
//!
//! For each entry, in manifest order:
//!
//! 1. The entry's account must be the pipeline's account (checked before any scan)
//! 2. A declared key pair must exist in the entry's region
//! 3. The region is scanned; every server name on an active instance is
//!    observed in the [`RogueRegistry`]
//! 4. If one of those names is the entry's, the server exists and is marked legit
//! 5. Otherwise its subnet must exist, and a create intent is queued
//!
//! With an empty manifest and `delete_if_absent`, the pipeline's own region
//! is scanned instead (clean-up mode). When `delete_if_absent` is set, every
//! name still rogue at the end becomes a delete intent.

use crate::action::ActionList;
use crate::error::{Error, Result};
use crate::inventory::{CachedInventory, Inventory};
use crate::registry::RogueRegistry;
use fleetspec::{Manifest, ManifestEntry, is_valid_server_name};

/// Where the pipeline itself runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    /// Account the pipeline executes under
    pub account: String,
    /// Region the pipeline executes in (scanned in clean-up mode)
    pub region: String,
}

impl PipelineContext {
    /// Create a context.
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }
}

/// Counts describing a finished reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Servers that need creating
    pub to_create: usize,
    /// Rogue servers queued for deletion
    pub to_delete: usize,
    /// Manifest servers already live
    pub existing: usize,
    /// Rogue servers left alone because pruning is off
    pub unmanaged: usize,
    /// Regions whose instances were scanned
    pub regions_scanned: Vec<String>,
    /// Whether the run was in clean-up mode
    pub cleanup: bool,
}

impl ReconcileSummary {
    /// Whether the fleet already matches the manifest.
    pub fn is_converged(&self) -> bool {
        self.to_create == 0 && self.to_delete == 0
    }
}

impl std::fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to delete, {} already present",
            self.to_create, self.to_delete, self.existing
        )?;
        if self.unmanaged > 0 {
            write!(f, ", {} unmanaged left in place", self.unmanaged)?;
        }
        Ok(())
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub actions: ActionList,
    pub summary: ReconcileSummary,
}

/// Single-run reconciler. Owns its registry and inventory cache.
pub struct Reconciler<I> {
    inventory: CachedInventory<I>,
    context: PipelineContext,
    registry: RogueRegistry,
    actions: ActionList,
}

impl<I: Inventory> Reconciler<I> {
    /// Create a reconciler for one run.
    pub fn new(inventory: I, context: PipelineContext) -> Self {
        Self {
            inventory: CachedInventory::new(inventory),
            context,
            registry: RogueRegistry::new(),
            actions: ActionList::new(),
        }
    }

    /// Reconcile a validated manifest. Consumes the reconciler.
    pub fn reconcile(mut self, manifest: &Manifest) -> Result<Reconciliation> {
        for entry in &manifest.entries {
            self.reconcile_entry(entry)?;
        }

        if manifest.is_cleanup() {
            log::info!(
                "Clean-up mode: every tagged server in {} is a deletion candidate",
                self.context.region
            );
            let region = self.context.region.clone();
            self.observe_region(&region)?;
        }

        let rogues: Vec<String> = self.registry.rogues().map(str::to_string).collect();
        let mut to_delete = 0;
        let mut unmanaged = 0;
        for name in rogues {
            if manifest.delete_if_absent {
                log::info!("Server '{name}' is not in the manifest, queueing deletion");
                self.actions.push_delete(name);
                to_delete += 1;
            } else {
                log::debug!("Server '{name}' is not in the manifest, leaving it in place");
                unmanaged += 1;
            }
        }

        let summary = ReconcileSummary {
            to_create: self.actions.creates().count(),
            to_delete,
            existing: self.registry.legit_count(),
            unmanaged,
            regions_scanned: self.inventory.scanned_regions(),
            cleanup: manifest.is_cleanup(),
        };

        Ok(Reconciliation {
            actions: self.actions,
            summary,
        })
    }

    fn reconcile_entry(&mut self, entry: &ManifestEntry) -> Result<()> {
        let name = entry.name.as_str();
        let region = entry.region.as_str();
        log::debug!("Checking server '{name}' in {region}");

        if entry.account != self.context.account {
            return Err(Error::AccountMismatch {
                name: name.to_string(),
                declared: entry.account.clone(),
                executing: self.context.account.clone(),
            });
        }

        if let Some(key_pair) = entry.key_pair()
            && !self.inventory.has_key_pair(region, key_pair)?
        {
            return Err(Error::KeyPairNotFound {
                name: name.to_string(),
                key_pair: key_pair.to_string(),
                region: region.to_string(),
            });
        }

        if self.observe_region(region)?.iter().any(|n| n == name) {
            log::info!("Server '{name}' exists in {region}");
            self.registry.mark_legit(name);
            return Ok(());
        }

        if !self.inventory.has_subnet(region, &entry.subnet)? {
            return Err(Error::SubnetNotFound {
                name: name.to_string(),
                subnet: entry.subnet.clone(),
                region: region.to_string(),
            });
        }

        log::info!(
            "Server '{name}' does not exist in {region}, queueing creation in {}",
            entry.subnet
        );
        self.actions.push_create(entry.resolve());
        Ok(())
    }

    /// Observe every server name on an active instance in a region.
    ///
    /// Tag values that cannot name a server are skipped. Returns the names
    /// observed.
    fn observe_region(&mut self, region: &str) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .inventory
            .instances(region)?
            .iter()
            .filter_map(|i| i.active_server_name())
            .filter(|name| {
                let valid = is_valid_server_name(name);
                if !valid {
                    log::warn!("Ignoring server-name tag {name:?} in {region}: not a valid server name");
                }
                valid
            })
            .map(str::to_string)
            .collect();

        for name in &names {
            self.registry.observe(name);
        }
        Ok(names)
    }
}

/// Reconcile a manifest against an inventory in one call.
pub fn reconcile<I: Inventory>(
    manifest: &Manifest,
    inventory: I,
    context: PipelineContext,
) -> Result<Reconciliation> {
    Reconciler::new(inventory, context).reconcile(manifest)
}
