//! Error types for fleet reconciliation.
//!
//! Every error ends the run. Gate errors ([`Error::AccountMismatch`],
//! [`Error::KeyPairNotFound`], [`Error::SubnetNotFound`]) mean the manifest
//! asks for something impossible; the rest mean live inventory could not be
//! read.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reconciling a manifest against live inventory.
#[derive(Debug, Error)]
pub enum Error {
    /// Entry declares an account other than the one running the pipeline
    #[error(
        "ops_account of server '{name}' is not the account running the pipeline (ops_account: {declared}, running account: {executing})"
    )]
    AccountMismatch {
        /// Server name
        name: String,
        /// Account declared by the entry
        declared: String,
        /// Account the pipeline runs under
        executing: String,
    },

    /// Entry declares a key pair the region does not have
    #[error("Key pair '{key_pair}' in region '{region}' requested for server '{name}' not found")]
    KeyPairNotFound {
        /// Server name
        name: String,
        /// Declared key pair
        key_pair: String,
        /// Region searched
        region: String,
    },

    /// Entry needs creating but its subnet does not exist
    #[error(
        "Server '{name}' was requested in subnet {subnet} of region {region} but that subnet does not exist"
    )]
    SubnetNotFound {
        /// Server name
        name: String,
        /// Declared subnet
        subnet: String,
        /// Region searched
        region: String,
    },

    /// The `aws` executable could not be located
    #[error("aws CLI not found in PATH")]
    AwsNotFound,

    /// An inventory query failed
    #[error("inventory query '{query}' failed in region {region}: {message}")]
    Inventory {
        /// Query that failed (e.g. `describe-instances`)
        query: &'static str,
        /// Region queried
        region: String,
        /// Error output
        message: String,
    },

    /// Snapshot file could not be read
    #[error("could not read inventory snapshot {}: {source}", .path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error comes from a manifest gate rather than inventory access.
    pub fn is_gate(&self) -> bool {
        matches!(
            self,
            Error::AccountMismatch { .. } | Error::KeyPairNotFound { .. } | Error::SubnetNotFound { .. }
        )
    }
}

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_errors() {
        let err = Error::SubnetNotFound {
            name: "db1".to_string(),
            subnet: "subnet-abc".to_string(),
            region: "us-east-1".to_string(),
        };
        assert!(err.is_gate());
        assert!(err.to_string().contains("subnet-abc"));
        assert!(err.to_string().contains("us-east-1"));

        assert!(!Error::AwsNotFound.is_gate());
    }

    #[test]
    fn test_snapshot_error_keeps_io_source() {
        use std::error::Error as _;

        let err = Error::Snapshot {
            path: PathBuf::from("/tmp/inv.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(!err.is_gate());
        assert!(err.to_string().starts_with("could not read inventory snapshot /tmp/inv.json"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_account_mismatch_message() {
        let err = Error::AccountMismatch {
            name: "db1".to_string(),
            declared: "222".to_string(),
            executing: "111".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ops_account of server 'db1' is not the account running the pipeline (ops_account: 222, running account: 111)"
        );
    }
}
