//! Store configuration and built-in default value-sets.
//!
//! # Responsibility
//! - Load `StoreConfig` from TOML.
//! - Provide the immutable default value-sets handed to value-set
//!   collections at construction.
//!
//! # Invariants
//! - Defaults are plain values owned by each collection; nothing here is
//!   process-wide mutable state.

use crate::logging::default_log_level;
use crate::model::entry::{LocationRelationship, ValueSet, LOCATION_RELATIONSHIP_TYPE};
use crate::model::partition::{PartitionKey, ValidationError};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Fiscal year used when a caller does not name one.
pub const DEFAULT_PARTITION: &str = "FY_25";

/// Errors while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(ValidationError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(err) => write!(f, "invalid config value: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(err) => Some(err),
        }
    }
}

/// Runtime configuration for a store deployment.
///
/// ```toml
/// db_path = "/var/lib/fystore/fystore.sqlite3"
/// log_dir = "/var/log/fystore"
/// default_partition = "FY_26"
///
/// [dropdown_defaults]
/// groups = ["AGEL", "ACL"]
///
/// [[location_defaults]]
/// location = "Khavda"
/// locationCode = "Khavda"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_partition_name")]
    pub default_partition: String,
    #[serde(default)]
    pub dropdown_defaults: Option<ValueSet>,
    #[serde(default)]
    pub location_defaults: Option<Vec<LocationRelationship>>,
}

impl StoreConfig {
    /// Config with built-in defaults for everything but the database path.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            log_level: None,
            log_dir: None,
            default_partition: default_partition_name(),
            dropdown_defaults: None,
            location_defaults: None,
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(ConfigError::Parse)?;
        config.default_partition()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn default_partition(&self) -> Result<PartitionKey, ConfigError> {
        PartitionKey::new(&self.default_partition).map_err(ConfigError::Invalid)
    }

    /// Configured log level, falling back to the build-mode default.
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    /// Default set returned for partitions without dropdown options.
    pub fn dropdown_defaults(&self) -> ValueSet {
        self.dropdown_defaults
            .clone()
            .unwrap_or_else(builtin_dropdown_defaults)
    }

    /// Default set returned for partitions without location relationships.
    pub fn location_defaults(&self) -> ValueSet {
        match &self.location_defaults {
            Some(relationships) => location_value_set(relationships),
            None => builtin_location_defaults(),
        }
    }
}

fn default_partition_name() -> String {
    DEFAULT_PARTITION.to_string()
}

/// Dropdown categories a fresh partition starts with.
pub fn builtin_dropdown_defaults() -> ValueSet {
    ValueSet::from_strings(&[
        ("groups", &["AGEL", "ACL"]),
        ("ppaMerchants", &["PPA", "Merchant"]),
        ("types", &["Solar", "Wind", "Hybrid"]),
        ("locationCodes", &["Khavda", "RJ"]),
        ("locations", &["Khavda", "Baap", "Essel"]),
        ("connectivities", &["CTU"]),
    ])
}

/// Location relationships a fresh partition starts with.
pub fn builtin_location_defaults() -> ValueSet {
    location_value_set(&[
        LocationRelationship::new("Khavda", "Khavda"),
        LocationRelationship::new("Baap", "RJ"),
        LocationRelationship::new("Essel", "RJ"),
    ])
}

/// Wraps relationships as the single `locationRelationship` group.
pub fn location_value_set(relationships: &[LocationRelationship]) -> ValueSet {
    ValueSet::from_groups([(
        LOCATION_RELATIONSHIP_TYPE,
        relationships
            .iter()
            .map(LocationRelationship::to_value)
            .collect::<Vec<_>>(),
    )])
}
