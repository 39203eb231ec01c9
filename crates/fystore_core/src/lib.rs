//! Versioned, soft-deleting storage for fiscal-year partitioned datasets.
//!
//! Every collection is partitioned by a fiscal-year key. Single-document
//! collections keep a numbered history per partition that can be listed,
//! restored and purged; value-set collections are replaced whole on save.

pub mod config;
pub mod db;
pub mod import;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{
    builtin_dropdown_defaults, builtin_location_defaults, ConfigError, StoreConfig,
    DEFAULT_PARTITION,
};
pub use import::bulk::{import_many, import_partition, ImportOutcome};
pub use import::normalizer::{normalize_row, normalize_rows};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entry::{Entry, LocationRelationship, ValueSet, LOCATION_RELATIONSHIP_TYPE};
pub use model::partition::{PartitionKey, ValidationError};
pub use model::record::{RecordId, Version, VersionedRecord};
pub use model::table_row::TableRow;
pub use repo::entry_store::{EntryStore, EntryTable, SqliteEntryStore, GENERATION_VERSION};
pub use repo::version_store::{RecordTable, SqliteVersionStore, VersionStore};
pub use repo::{ErrorKind, RepoError, RepoResult};
pub use service::entry_collection::{LocationRelationships, MultiEntryCollection};
pub use service::record_collection::SingleRecordCollection;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
