//! Repository error type and its caller-facing classification.

use crate::db::DbError;
use crate::model::partition::ValidationError;
use crate::model::record::Version;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for partition store operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// No eligible record with `version` exists in `partition`.
    NotFound { partition: String, version: Version },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// A write would leave the partition with more than one active record.
    InvariantViolation(String),
    Serialization(serde_json::Error),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

/// Caller-facing classification of a `RepoError`.
///
/// `Display` is stable and never includes storage details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Restore or purge target does not exist or is not eligible.
    NotFound,
    /// Malformed input rejected before touching storage.
    ValidationFailed,
    /// The transaction could not commit and was rolled back.
    StorageFailure,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("not_found"),
            Self::ValidationFailed => f.write_str("validation_failed"),
            Self::StorageFailure => f.write_str("storage_failure"),
        }
    }
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::ValidationFailed,
            Self::Db(_)
            | Self::InvalidData(_)
            | Self::InvariantViolation(_)
            | Self::Serialization(_)
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => ErrorKind::StorageFailure,
        }
    }

    pub(crate) fn not_found(partition: &impl AsRef<str>, version: Version) -> Self {
        Self::NotFound {
            partition: partition.as_ref().to_string(),
            version,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { partition, version } => {
                write!(f, "version {version} not found in partition {partition}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::InvariantViolation(message) => write!(f, "store invariant violated: {message}"),
            Self::Serialization(err) => write!(f, "payload serialization failed: {err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "partition store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "partition store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::NotFound { .. }
            | Self::InvalidData(_)
            | Self::InvariantViolation(_)
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
