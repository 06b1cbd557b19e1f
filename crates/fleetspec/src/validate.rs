//! Manifest validation.
//!
//! Rules run in a fixed priority order and stop at the first violation, so
//! the same bad manifest always reports the same error:
//!
//! 1. `ops_delete_if_absent_entry` is a literal boolean
//! 2. names are present, valid server names and unique
//! 3. engine, account, region and subnet are present
//! 4. account, subnet and key pair are strings
//! 5. engine is Chef or Puppet
//! 6. engine model/version match the engine
//! 7. region is supported
//! 8. instance type belongs to the engine
//! 9. maintenance/backup windows are `[DDD:]HH:MM`
//! 10. `ops_use_automated_backup` is a literal boolean
//! 11. `ops_backup_retention` is an integer in 1..=30
//! 12. no entry uses the reserved `ops_delete` key
//!
//! Optional fields are only checked when present. Absence is always legal.
//! A field holding the wrong JSON type fails the rule that owns the field.

use crate::error::{ValidationError, WindowKind};
use crate::types::{
    DELETE_MARKER_FIELD, Engine, Manifest, ManifestEntry, RawEntry, RawManifest, literal_bool,
};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Regions where managed configuration servers can be created.
pub const SUPPORTED_REGIONS: [&str; 9] = [
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ap-northeast-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "eu-central-1",
    "eu-west-1",
];

/// Instance types and the engine each one is offered for.
pub const INSTANCE_TYPES: [(&str, Engine); 6] = [
    ("m4.large", Engine::Chef),
    ("r4.xlarge", Engine::Chef),
    ("r4.2xlarge", Engine::Chef),
    ("c4.large", Engine::Puppet),
    ("c4.xlarge", Engine::Puppet),
    ("c4.2xlarge", Engine::Puppet),
];

/// Largest accepted `ops_backup_retention`.
pub const MAX_BACKUP_RETENTION: u64 = 30;

static WINDOW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((Mon|Tue|Wed|Thu|Fri|Sat|Sun):)?([0-1][0-9]|2[0-3]):[0-5][0-9]$")
        .unwrap_or_else(|e| unreachable!("window pattern is a valid regex: {e}"))
});

static SERVER_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,39}$")
        .unwrap_or_else(|e| unreachable!("server name pattern is a valid regex: {e}"))
});

/// Check whether a region is in [`SUPPORTED_REGIONS`].
pub fn is_supported_region(region: &str) -> bool {
    SUPPORTED_REGIONS.contains(&region)
}

/// Look up the engine an instance type is offered for.
pub fn instance_type_engine(instance_type: &str) -> Option<Engine> {
    INSTANCE_TYPES
        .iter()
        .find(|(name, _)| *name == instance_type)
        .map(|(_, engine)| *engine)
}

/// Check a maintenance or backup window against `[DDD:]HH:MM`.
pub fn is_valid_window(window: &str) -> bool {
    WINDOW_PATTERN.is_match(window)
}

/// Check a server name against `[A-Za-z][A-Za-z0-9-]{0,39}`.
pub fn is_valid_server_name(name: &str) -> bool {
    SERVER_NAME_PATTERN.is_match(name)
}

/// Validate a raw manifest and produce its typed form.
pub fn validate(raw: &RawManifest) -> Result<Manifest, ValidationError> {
    let delete_if_absent = match &raw.ops_delete_if_absent_entry {
        None => {
            log::debug!("ops_delete_if_absent_entry not present, assuming false");
            false
        }
        Some(value) => literal_bool(value).ok_or_else(|| ValidationError::InvalidDeleteFlag {
            value: value.to_string(),
        })?,
    };

    let mut seen: HashSet<&str> = HashSet::new();
    let mut entries = Vec::with_capacity(raw.ops_env.len());

    for (index, raw_entry) in raw.ops_env.iter().enumerate() {
        let name = entry_name(index, raw_entry.name.as_ref())?;

        log::debug!("Checking manifest entry '{name}'");

        if !seen.insert(name) {
            return Err(ValidationError::DuplicateName {
                name: name.to_string(),
            });
        }

        entries.push(validate_entry(name, raw_entry)?);
    }

    Ok(Manifest {
        entries,
        delete_if_absent,
    })
}

fn entry_name(index: usize, value: Option<&Value>) -> Result<&str, ValidationError> {
    match value {
        None => Err(ValidationError::MissingName { index }),
        Some(Value::String(name)) if name.is_empty() => Err(ValidationError::MissingName { index }),
        Some(Value::String(name)) if is_valid_server_name(name) => Ok(name.as_str()),
        Some(value) => Err(ValidationError::InvalidName {
            value: value.to_string(),
        }),
    }
}

fn validate_entry(name: &str, raw: &RawEntry) -> Result<ManifestEntry, ValidationError> {
    let engine = required(name, "ops_engine", raw.ops_engine.as_ref())?;
    let account = required(name, "ops_account", raw.ops_account.as_ref())?;
    let region = required(name, "ops_region", raw.ops_region.as_ref())?;
    let subnet = required(name, "ops_subnet", raw.ops_subnet.as_ref())?;

    let account = string_field(name, "ops_account", account)?;
    let subnet = string_field(name, "ops_subnet", subnet)?;
    let key_pair_name = raw
        .ops_key_pair_name
        .as_ref()
        .map(|v| string_field(name, "ops_key_pair_name", v))
        .transpose()?;

    let engine = engine
        .as_str()
        .and_then(Engine::from_wire)
        .ok_or_else(|| ValidationError::UnsupportedEngine {
            name: name.to_string(),
            engine: shown(engine),
        })?;

    let engine_model = match &raw.ops_engine_model {
        Some(model) if model.as_str() != Some(engine.engine_model()) => {
            return Err(ValidationError::EngineModelMismatch {
                name: name.to_string(),
                engine: engine.to_string(),
                model: shown(model),
                expected: engine.engine_model(),
            });
        }
        Some(_) => Some(engine.engine_model().to_string()),
        None => None,
    };

    let engine_version = match &raw.ops_engine_version {
        Some(version) if version.as_str() != Some(engine.engine_version()) => {
            return Err(ValidationError::EngineVersionMismatch {
                name: name.to_string(),
                engine: engine.to_string(),
                version: shown(version),
                expected: engine.engine_version(),
            });
        }
        Some(_) => Some(engine.engine_version().to_string()),
        None => None,
    };

    let region = region
        .as_str()
        .filter(|r| is_supported_region(r))
        .ok_or_else(|| ValidationError::UnsupportedRegion {
            name: name.to_string(),
            region: shown(region),
        })?;

    let instance_type = match &raw.ops_instance_type {
        None => None,
        Some(value) => Some(check_instance_type(name, engine, value)?),
    };

    let maintenance_window =
        check_window(name, WindowKind::Maintenance, raw.ops_maintenance_window.as_ref())?;
    let backup_window = check_window(name, WindowKind::Backup, raw.ops_backup_window.as_ref())?;

    let use_automated_backup = match &raw.ops_use_automated_backup {
        None => None,
        Some(value) => Some(literal_bool(value).ok_or_else(|| {
            ValidationError::InvalidBackupFlag {
                name: name.to_string(),
                value: value.to_string(),
            }
        })?),
    };

    let backup_retention = match &raw.ops_backup_retention {
        None => None,
        Some(value) => Some(backup_retention(name, value)?),
    };

    if raw.extra.contains_key(DELETE_MARKER_FIELD) {
        return Err(ValidationError::ReservedField {
            name: name.to_string(),
            field: DELETE_MARKER_FIELD,
        });
    }

    Ok(ManifestEntry {
        name: name.to_string(),
        engine,
        account: account.to_string(),
        region: region.to_string(),
        subnet: subnet.to_string(),
        engine_model,
        engine_version,
        key_pair_name: key_pair_name.map(str::to_string),
        instance_type,
        maintenance_window,
        use_automated_backup,
        backup_retention,
        backup_window,
        extra: raw.extra.clone(),
    })
}

/// A string value as written, anything else JSON-encoded.
fn shown(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_string)
}

fn required<'a>(
    name: &str,
    field: &'static str,
    value: Option<&'a Value>,
) -> Result<&'a Value, ValidationError> {
    match value {
        Some(Value::String(s)) if s.is_empty() => Err(ValidationError::MissingField {
            name: name.to_string(),
            field,
        }),
        Some(value) => Ok(value),
        None => Err(ValidationError::MissingField {
            name: name.to_string(),
            field,
        }),
    }
}

fn string_field<'a>(
    name: &str,
    field: &'static str,
    value: &'a Value,
) -> Result<&'a str, ValidationError> {
    value.as_str().ok_or_else(|| ValidationError::NotAString {
        name: name.to_string(),
        field,
        value: value.to_string(),
    })
}

fn check_instance_type(
    name: &str,
    engine: Engine,
    value: &Value,
) -> Result<String, ValidationError> {
    let Some(instance_type) = value.as_str() else {
        return Err(ValidationError::UnsupportedInstanceType {
            name: name.to_string(),
            instance_type: value.to_string(),
        });
    };

    match instance_type_engine(instance_type) {
        None => Err(ValidationError::UnsupportedInstanceType {
            name: name.to_string(),
            instance_type: instance_type.to_string(),
        }),
        Some(supported) if supported != engine => {
            Err(ValidationError::InstanceTypeEngineMismatch {
                name: name.to_string(),
                instance_type: instance_type.to_string(),
                engine: engine.to_string(),
                supported: supported.to_string(),
            })
        }
        Some(_) => Ok(instance_type.to_string()),
    }
}

fn check_window(
    name: &str,
    kind: WindowKind,
    window: Option<&Value>,
) -> Result<Option<String>, ValidationError> {
    match window {
        None => Ok(None),
        Some(Value::String(value)) if is_valid_window(value) => Ok(Some(value.clone())),
        Some(value) => Err(ValidationError::InvalidWindow {
            name: name.to_string(),
            kind,
            value: shown(value),
        }),
    }
}

fn backup_retention(name: &str, value: &Value) -> Result<u8, ValidationError> {
    value
        .as_u64()
        .filter(|n| (1..=MAX_BACKUP_RETENTION).contains(n))
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| ValidationError::InvalidBackupRetention {
            name: name.to_string(),
            value: value.to_string(),
        })
}
