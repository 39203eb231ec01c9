//! Partition key and input validation.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failures for caller-supplied identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Partition keys must contain at least one non-whitespace character.
    EmptyPartitionKey,
    /// Entry-type tags must contain at least one non-whitespace character.
    EmptyEntryType,
    /// Versions are positive integers.
    NonPositiveVersion(i64),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPartitionKey => write!(f, "partition key cannot be empty"),
            Self::EmptyEntryType => write!(f, "entry type cannot be empty"),
            Self::NonPositiveVersion(version) => {
                write!(f, "version must be positive, got {version}")
            }
        }
    }
}

impl Error for ValidationError {}

/// Opaque identifier of one fiscal period, e.g. `FY_25`.
///
/// No relationship exists between records of different partitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Builds a key from caller input, trimming surrounding whitespace.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPartitionKey);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PartitionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartitionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for PartitionKey {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Rejects versions that can never have been assigned.
pub fn ensure_positive_version(version: i64) -> Result<i64, ValidationError> {
    if version <= 0 {
        return Err(ValidationError::NonPositiveVersion(version));
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::{ensure_positive_version, PartitionKey, ValidationError};

    #[test]
    fn partition_key_trims_and_rejects_blank_input() {
        assert_eq!(PartitionKey::new(" FY_25 ").unwrap().as_str(), "FY_25");
        assert_eq!(
            PartitionKey::new("   ").unwrap_err(),
            ValidationError::EmptyPartitionKey
        );
    }

    #[test]
    fn zero_and_negative_versions_are_rejected() {
        assert!(ensure_positive_version(1).is_ok());
        assert_eq!(
            ensure_positive_version(0).unwrap_err(),
            ValidationError::NonPositiveVersion(0)
        );
    }
}
