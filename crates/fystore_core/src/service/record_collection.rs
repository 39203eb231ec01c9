//! Single-document collection service.
//!
//! # Responsibility
//! - Provide get/save/backup/restore/purge entry points for collections
//!   that hold one logical document per partition.
//! - Delegate version bookkeeping to a `VersionStore`.
//!
//! # Invariants
//! - `save` is the only operation that creates a new generation, and it
//!   always keeps the previous one as a backup.
//! - An empty partition is a normal state: `get` returns `None`.

use crate::model::partition::PartitionKey;
use crate::model::record::{Version, VersionedRecord};
use crate::model::table_row::TableRow;
use crate::repo::version_store::VersionStore;
use crate::repo::RepoResult;

/// Use-case service over one single-document collection.
pub struct SingleRecordCollection<S: VersionStore> {
    store: S,
}

impl<S: VersionStore> SingleRecordCollection<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Payload of the active record, or `None` when nothing is active.
    pub fn get(&self, partition: &PartitionKey) -> RepoResult<Option<String>> {
        Ok(self
            .store
            .active_record(partition)?
            .map(|record| record.payload))
    }

    /// Stores `payload` as a new active generation and returns its version.
    pub fn save(&mut self, partition: &PartitionKey, payload: &str) -> RepoResult<Version> {
        Ok(self.store.insert_active(partition, payload)?.version)
    }

    /// Every record of the partition, newest version first.
    pub fn list_backups(&self, partition: &PartitionKey) -> RepoResult<Vec<VersionedRecord>> {
        self.store.list_records(partition)
    }

    /// Copies the payload of `version` onto the active record.
    ///
    /// The active record keeps its row and takes the next version, and its
    /// previous state stays listed as an archived record. With no active
    /// record a new one is inserted at version 1. The restored record
    /// itself is left untouched; when a version number appears twice the
    /// archived copy is the one restored.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when the partition has no record `version`.
    pub fn restore(
        &mut self,
        partition: &PartitionKey,
        version: Version,
    ) -> RepoResult<VersionedRecord> {
        self.store.restore(partition, version)
    }

    /// Deactivates every record of the partition; all become purgeable.
    ///
    /// Returns how many records the partition holds.
    pub fn delete_all(&mut self, partition: &PartitionKey) -> RepoResult<usize> {
        self.store.deactivate_all(partition)
    }

    /// Permanently removes an archived version.
    ///
    /// Returns `false` for the active version and for unknown versions,
    /// including when an archived record shares the active version.
    pub fn purge_backup(
        &mut self,
        partition: &PartitionKey,
        version: Version,
    ) -> RepoResult<bool> {
        self.store.purge(partition, version)
    }

    /// Highest version ever assigned in the partition.
    pub fn current_version(&self, partition: &PartitionKey) -> RepoResult<Version> {
        self.store.current_version(partition)
    }

    /// Active document decoded as table rows; empty when nothing is active.
    pub fn get_rows(&self, partition: &PartitionKey) -> RepoResult<Vec<TableRow>> {
        match self.get(partition)? {
            Some(payload) => Ok(serde_json::from_str(&payload)?),
            None => Ok(Vec::new()),
        }
    }

    /// Saves `rows` as the JSON document of a new generation.
    pub fn save_rows(
        &mut self,
        partition: &PartitionKey,
        rows: &[TableRow],
    ) -> RepoResult<Version> {
        let payload = serde_json::to_string(rows)?;
        self.save(partition, &payload)
    }
}
