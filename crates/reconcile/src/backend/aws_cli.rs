//! Live inventory backend using `aws ec2` commands.
//!
//! Credentials come from the CLI's own provider chain (environment, profile,
//! instance role). The CLI paginates `describe-*` calls itself, so one
//! command returns the whole region.

use crate::error::{Error, Result};
use crate::inventory::{InstanceState, Inventory, LiveInstance};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;

/// Backend that shells out to the `aws` CLI.
pub struct AwsCliBackend {
    /// Path to the aws executable
    aws_path: PathBuf,
    /// Named profile passed as `--profile`
    profile: Option<String>,
}

impl AwsCliBackend {
    /// Create a backend using `aws` from `PATH`.
    pub fn new() -> Result<Self> {
        let aws_path = which::which("aws").map_err(|_| Error::AwsNotFound)?;
        Ok(Self {
            aws_path,
            profile: None,
        })
    }

    /// Create a backend using an explicit executable path.
    pub fn with_path(aws_path: impl Into<PathBuf>) -> Self {
        Self {
            aws_path: aws_path.into(),
            profile: None,
        }
    }

    /// Use a named CLI profile.
    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    fn args<'a>(&'a self, query: &'a str, region: &'a str) -> Vec<&'a str> {
        let mut args = vec!["ec2", query, "--region", region, "--output", "json"];
        if let Some(profile) = &self.profile {
            args.push("--profile");
            args.push(profile);
        }
        args
    }

    /// Run an `aws ec2` query and return stdout.
    fn run_ec2(&self, query: &'static str, region: &str) -> Result<Vec<u8>> {
        log::debug!("Running aws ec2 {query} --region {region}");
        let output = Command::new(&self.aws_path)
            .args(self.args(query, region))
            .output()
            .map_err(|e| Error::Inventory {
                query,
                region: region.to_string(),
                message: format!("failed to execute {}: {e}", self.aws_path.display()),
            })?;

        if !output.status.success() {
            return Err(Error::Inventory {
                query,
                region: region.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

impl Inventory for AwsCliBackend {
    fn instances(&self, region: &str) -> Result<Vec<LiveInstance>> {
        parse_instances(&self.run_ec2("describe-instances", region)?)
    }

    fn subnets(&self, region: &str) -> Result<Vec<String>> {
        parse_subnets(&self.run_ec2("describe-subnets", region)?)
    }

    fn key_pairs(&self, region: &str) -> Result<Vec<String>> {
        parse_key_pairs(&self.run_ec2("describe-key-pairs", region)?)
    }
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstances {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<Ec2Instance>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2Instance {
    #[serde(default)]
    instance_id: Option<String>,
    state: Ec2State,
    #[serde(default)]
    tags: Vec<Ec2Tag>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2State {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2Tag {
    key: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSubnets {
    #[serde(default)]
    subnets: Vec<Ec2Subnet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2Subnet {
    subnet_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeKeyPairs {
    #[serde(default)]
    key_pairs: Vec<Ec2KeyPair>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2KeyPair {
    key_name: String,
}

/// Parse `describe-instances` output, flattening every reservation.
pub fn parse_instances(json: &[u8]) -> Result<Vec<LiveInstance>> {
    let response: DescribeInstances = serde_json::from_slice(json)?;
    Ok(response
        .reservations
        .into_iter()
        .flat_map(|r| r.instances)
        .map(|i| LiveInstance {
            instance_id: i.instance_id,
            state: InstanceState::from_name(&i.state.name),
            tags: i.tags.into_iter().map(|t| (t.key, t.value)).collect(),
        })
        .collect())
}

/// Parse `describe-subnets` output into subnet ids.
pub fn parse_subnets(json: &[u8]) -> Result<Vec<String>> {
    let response: DescribeSubnets = serde_json::from_slice(json)?;
    Ok(response.subnets.into_iter().map(|s| s.subnet_id).collect())
}

/// Parse `describe-key-pairs` output into key names.
pub fn parse_key_pairs(json: &[u8]) -> Result<Vec<String>> {
    let response: DescribeKeyPairs = serde_json::from_slice(json)?;
    Ok(response.key_pairs.into_iter().map(|k| k.key_name).collect())
}
