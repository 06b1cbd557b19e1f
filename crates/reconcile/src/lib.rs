//! # Reconcile
//!
//! Fleet reconciliation: compare a validated [`fleetspec::Manifest`] with the
//! servers that actually exist and plan the work that closes the gap.
//!
//! ## Core Concepts
//!
//! - **Inventory**: read access to live instances, subnets and key pairs per region
//! - **RogueRegistry**: which live server names are backed by the manifest
//! - **Reconciler**: walks the manifest and builds the action list
//! - **ActionList**: create/delete intents, serialized as `actionlist.json`
//!   and rendered as `buildspec.yml`
//!
//! ## Example
//!
//! ```
//! use fleetspec::Manifest;
//! use reconcile::{
//!     InstanceState, LiveInstance, PipelineContext, SnapshotBackend, reconcile, render_buildspec,
//! };
//!
//! let manifest = Manifest::from_json(r#"{
//!     "ops_env": [],
//!     "ops_delete_if_absent_entry": "True"
//! }"#).unwrap();
//!
//! let inventory = SnapshotBackend::new().with_instance(
//!     "us-east-1",
//!     LiveInstance::new(InstanceState::Running).with_server_name("legacy1"),
//! );
//!
//! let result = reconcile(&manifest, inventory, PipelineContext::new("111", "us-east-1")).unwrap();
//! assert_eq!(result.summary.to_delete, 1);
//! assert!(render_buildspec(&result.actions).contains("delete-server --server-name 'legacy1'"));
//! ```

pub mod action;
pub mod backend;
pub mod error;
pub mod inventory;
pub mod reconciler;
pub mod registry;
pub mod render;

pub use action::{ActionEntry, ActionList, DeleteIntent};
pub use backend::{AwsCliBackend, SnapshotBackend};
pub use error::{Error, Result};
pub use inventory::{CachedInventory, InstanceState, Inventory, LiveInstance, SERVER_NAME_TAG};
pub use reconciler::{PipelineContext, ReconcileSummary, Reconciliation, Reconciler, reconcile};
pub use registry::{Classification, Observation, RogueRegistry};
pub use render::{render_buildspec, render_command, shell_quote};
