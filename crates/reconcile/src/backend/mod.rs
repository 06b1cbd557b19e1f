//! Inventory backends.
//!
//! - [`aws_cli::AwsCliBackend`]: real inventory through the `aws` command
//! - [`snapshot::SnapshotBackend`]: a recorded JSON snapshot, for offline
//!   runs and tests

pub mod aws_cli;
pub mod snapshot;

pub use aws_cli::AwsCliBackend;
pub use snapshot::{RegionSnapshot, SnapshotBackend};
