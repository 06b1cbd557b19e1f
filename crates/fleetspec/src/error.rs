//! Error types for manifest loading and validation.
//!
//! Loading errors ([`Error::Format`]) mean the manifest could not be read at
//! all. Validation errors ([`ValidationError`]) mean it was read but breaks a
//! rule. Each validation variant names the offending entry so the message can
//! be handed to the pipeline as-is.

use thiserror::Error;

/// Which maintenance/backup window a [`ValidationError::InvalidWindow`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// `ops_maintenance_window`
    Maintenance,
    /// `ops_backup_window`
    Backup,
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowKind::Maintenance => write!(f, "maintenance"),
            WindowKind::Backup => write!(f, "backup"),
        }
    }
}

/// A manifest rule violation. Validation stops at the first one found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `ops_delete_if_absent_entry` is not a boolean
    #[error(
        "You must specify a boolean value for the ops_delete_if_absent_entry parameter, got {value}"
    )]
    InvalidDeleteFlag {
        /// The offending raw value, JSON-encoded
        value: String,
    },

    /// An entry has no `name`
    #[error("Entry #{index} in ops_env has no name")]
    MissingName {
        /// Zero-based position of the entry
        index: usize,
    },

    /// `name` is not a valid server name
    #[error(
        "Server name {value} is not valid: it must start with a letter and contain only letters, digits and hyphens (at most 40 characters)"
    )]
    InvalidName {
        /// The offending raw value, JSON-encoded
        value: String,
    },

    /// Two entries share a `name`
    #[error("Duplicate name '{name}' detected in the manifest")]
    DuplicateName {
        /// The repeated name
        name: String,
    },

    /// A required field is absent or empty
    #[error("Required parameter {field} for server '{name}' is missing or empty")]
    MissingField {
        /// Server name
        name: String,
        /// Wire name of the missing field
        field: &'static str,
    },

    /// A field that must be a string holds another JSON type
    #[error("Parameter {field} for server '{name}' must be a string, got {value}")]
    NotAString {
        /// Server name
        name: String,
        /// Wire name of the field
        field: &'static str,
        /// The offending raw value, JSON-encoded
        value: String,
    },

    /// `ops_engine` is neither Chef nor Puppet
    #[error(
        "Acceptable values for ops_engine are Chef or Puppet (case sensitive), got '{engine}' for server '{name}'"
    )]
    UnsupportedEngine {
        /// Server name
        name: String,
        /// Declared engine
        engine: String,
    },

    /// `ops_engine_model` does not match the engine
    #[error(
        "Engine model '{model}' is not valid for the {engine} engine of server '{name}' (expected '{expected}')"
    )]
    EngineModelMismatch {
        /// Server name
        name: String,
        /// Declared engine
        engine: String,
        /// Declared model
        model: String,
        /// Model the engine requires
        expected: &'static str,
    },

    /// `ops_engine_version` does not match the engine
    #[error(
        "Engine version '{version}' is not valid for the {engine} engine of server '{name}' (expected '{expected}')"
    )]
    EngineVersionMismatch {
        /// Server name
        name: String,
        /// Declared engine
        engine: String,
        /// Declared version
        version: String,
        /// Version the engine requires
        expected: &'static str,
    },

    /// `ops_region` is not in the supported-region list
    #[error("Region {region} requested for server '{name}' does not support managed configuration servers")]
    UnsupportedRegion {
        /// Server name
        name: String,
        /// Declared region
        region: String,
    },

    /// `ops_instance_type` is unknown
    #[error("Instance type {instance_type} requested for server '{name}' is not supported")]
    UnsupportedInstanceType {
        /// Server name
        name: String,
        /// Declared instance type
        instance_type: String,
    },

    /// `ops_instance_type` is only valid for the other engine
    #[error(
        "Instance type {instance_type} requested for server '{name}' is only available for the {supported} engine, not {engine}"
    )]
    InstanceTypeEngineMismatch {
        /// Server name
        name: String,
        /// Declared instance type
        instance_type: String,
        /// Declared engine
        engine: String,
        /// Engine the instance type belongs to
        supported: String,
    },

    /// A window does not match `[DDD:]HH:MM`
    #[error(
        "Improper {kind} window format '{value}' for server '{name}', expected DDD:HH:MM or HH:MM"
    )]
    InvalidWindow {
        /// Server name
        name: String,
        /// Which window
        kind: WindowKind,
        /// Declared value
        value: String,
    },

    /// `ops_use_automated_backup` is not a boolean
    #[error(
        "You must specify a boolean value for ops_use_automated_backup of server '{name}', got {value}"
    )]
    InvalidBackupFlag {
        /// Server name
        name: String,
        /// The offending raw value, JSON-encoded
        value: String,
    },

    /// `ops_backup_retention` is not an integer in 1..=30
    #[error(
        "Backup retention of {value} for server '{name}' is not valid, you can retain between 1 and 30 backups"
    )]
    InvalidBackupRetention {
        /// Server name
        name: String,
        /// The offending raw value, JSON-encoded
        value: String,
    },

    /// An entry uses a key reserved for action list delete markers
    #[error("Server '{name}' uses the reserved parameter {field}")]
    ReservedField {
        /// Server name
        name: String,
        /// The reserved key
        field: &'static str,
    },
}

/// Errors produced while loading or validating a manifest.
#[derive(Debug, Error)]
pub enum Error {
    /// The manifest is not readable as the expected JSON document
    #[error("malformed manifest: {0}")]
    Format(#[from] serde_json::Error),

    /// The manifest was read but breaks a rule
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, Error>;
