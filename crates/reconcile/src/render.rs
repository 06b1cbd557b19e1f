//! Render an [`ActionList`] as the executor's build script (`buildspec.yml`).
//!
//! Each create intent becomes one `aws opsworks-cm create-server` command and
//! each delete intent one `aws opsworks-cm delete-server` command, in action
//! list order.

use crate::action::{ActionEntry, ActionList};
use fleetspec::ServerSpec;

const HEADER: &str = "version: 0.2

phases:
  build:
    commands:
      - echo Build started on `date`
      - echo running aws cli command ...
";

const FOOTER: &str = "
  post_build:
    commands:
      - echo Build completed on `date`
";

/// Render the full build script for an action list.
pub fn render_buildspec(actions: &ActionList) -> String {
    let mut script = String::from(HEADER);
    for entry in &actions.entries {
        script.push_str("      - ");
        script.push_str(&render_command(entry));
        script.push('\n');
    }
    script.push_str(FOOTER);
    script
}

/// Render the single command line for one action.
///
/// Every value taken from the manifest or from live tags is shell-quoted.
pub fn render_command(entry: &ActionEntry) -> String {
    match entry {
        ActionEntry::Delete(intent) => format!(
            "aws opsworks-cm delete-server --server-name {}",
            shell_quote(&intent.name)
        ),
        ActionEntry::Create(spec) => create_server_command(spec),
    }
}

/// Quote a value as a single POSIX shell word.
///
/// The value is wrapped in single quotes. An embedded `'` closes the quote,
/// adds an escaped quote and reopens it.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn create_server_command(spec: &ServerSpec) -> String {
    let instance_profile = format!(
        "arn:aws:iam::{}:instance-profile/aws-opsworks-cm-ec2-role",
        spec.account
    );
    let service_role = format!(
        "arn:aws:iam::{}:role/aws-opsworks-cm-service-role",
        spec.account
    );

    let mut cmd = format!(
        "aws opsworks-cm create-server --region {} --server-name {} \
         --instance-profile-arn {} --service-role-arn {} --subnet-ids {} --engine {}",
        shell_quote(&spec.region),
        shell_quote(&spec.name),
        shell_quote(&instance_profile),
        shell_quote(&service_role),
        shell_quote(&spec.subnet),
        spec.engine,
    );

    cmd.push_str(&format!(" --engine-model {}", shell_quote(&spec.engine_model)));
    cmd.push_str(&format!(" --engine-version {}", shell_quote(&spec.engine_version)));

    if let Some(key_pair) = &spec.key_pair_name {
        cmd.push_str(&format!(" --key-pair {}", shell_quote(key_pair)));
    }

    cmd.push_str(&format!(" --instance-type {}", shell_quote(&spec.instance_type)));

    if let Some(window) = &spec.maintenance_window {
        cmd.push_str(&format!(
            " --preferred-maintenance-window {}",
            shell_quote(window)
        ));
    }

    if spec.use_automated_backup {
        cmd.push_str(" --no-disable-automated-backup");
        if let Some(retention) = spec.backup_retention {
            cmd.push_str(&format!(" --backup-retention-count '{retention}'"));
        }
        if let Some(window) = &spec.backup_window {
            cmd.push_str(&format!(" --preferred-backup-window {}", shell_quote(window)));
        }
    } else {
        cmd.push_str(" --disable-automated-backup");
    }

    cmd
}
