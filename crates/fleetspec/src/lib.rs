//! # fleetspec
//!
//! Desired-state manifests for a fleet of managed configuration servers.
//!
//! This crate provides:
//! - Loose deserialization of `opsworkscmconfig.json` ([`RawManifest`])
//! - Rule-by-rule validation with first-failure reporting ([`validate()`])
//! - A single defaulting pass from a validated entry to a [`ServerSpec`]
//!
//! ## Example
//!
//! ```
//! use fleetspec::Manifest;
//!
//! let manifest = Manifest::from_json(r#"{
//!     "ops_env": [{
//!         "name": "db1",
//!         "ops_engine": "Puppet",
//!         "ops_account": "111",
//!         "ops_region": "us-east-1",
//!         "ops_subnet": "subnet-abc"
//!     }]
//! }"#).unwrap();
//!
//! let spec = manifest.entries[0].resolve();
//! assert_eq!(spec.engine_model, "Monolithic");
//! assert_eq!(spec.instance_type, "m4.large");
//! ```

pub mod error;
pub mod types;
pub mod validate;

pub use error::{Error, Result, ValidationError, WindowKind};
pub use types::{
    DEFAULT_BACKUP_RETENTION, DEFAULT_INSTANCE_TYPE, DELETE_MARKER_FIELD, Engine, Manifest,
    ManifestEntry, RawEntry, RawManifest, ServerSpec, literal_bool,
};
pub use validate::{SUPPORTED_REGIONS, is_valid_server_name, validate};

/// File name of the manifest inside the pipeline's input artifact.
pub const MANIFEST_FILE_NAME: &str = "opsworkscmconfig.json";

impl Manifest {
    /// Parse and validate a manifest document in one step.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw = RawManifest::from_json(content)?;
        Ok(validate(&raw)?)
    }
}
