//! Value-set collection services.
//!
//! # Responsibility
//! - Read the current value-set of a partition, falling back to injected
//!   defaults for partitions that have none.
//! - Replace a partition's value-set as one unit.
//!
//! # Invariants
//! - `get` never returns an empty set for a partition with no active
//!   entries; it returns the collection's defaults instead.
//! - Entry types missing from a saved set have no active entries afterwards.

use crate::config::location_value_set;
use crate::model::entry::{Entry, LocationRelationship, ValueSet, LOCATION_RELATIONSHIP_TYPE};
use crate::model::partition::PartitionKey;
use crate::repo::entry_store::EntryStore;
use crate::repo::RepoResult;
use log::warn;

/// Use-case service over one value-set collection.
pub struct MultiEntryCollection<S: EntryStore> {
    store: S,
    defaults: ValueSet,
}

impl<S: EntryStore> MultiEntryCollection<S> {
    /// Creates a collection that answers empty partitions with `defaults`.
    pub fn new(store: S, defaults: ValueSet) -> Self {
        Self { store, defaults }
    }

    pub fn defaults(&self) -> &ValueSet {
        &self.defaults
    }

    /// Active value-set of the partition grouped by entry type.
    pub fn get(&self, partition: &PartitionKey) -> RepoResult<ValueSet> {
        let entries = self.store.active_entries(partition)?;
        if entries.is_empty() {
            return Ok(self.defaults.clone());
        }

        let mut set = ValueSet::new();
        for entry in entries {
            set.push(&entry.entry_type, entry.value);
        }
        Ok(set)
    }

    /// Replaces the partition's whole value-set with `set`.
    ///
    /// Returns the number of entries stored.
    pub fn save(&mut self, partition: &PartitionKey, set: &ValueSet) -> RepoResult<usize> {
        self.store.replace_entries(partition, set)
    }

    /// Active entries with their storage metadata, in insertion order.
    pub fn list_entries(&self, partition: &PartitionKey) -> RepoResult<Vec<Entry>> {
        self.store.active_entries(partition)
    }
}

/// Location to location-code mapping stored as a value-set collection.
pub struct LocationRelationships<S: EntryStore> {
    inner: MultiEntryCollection<S>,
}

impl<S: EntryStore> LocationRelationships<S> {
    pub fn new(store: S, defaults: ValueSet) -> Self {
        Self {
            inner: MultiEntryCollection::new(store, defaults),
        }
    }

    /// Current relationships of the partition, or the defaults.
    pub fn get(&self, partition: &PartitionKey) -> RepoResult<Vec<LocationRelationship>> {
        let set = self.inner.get(partition)?;
        let values = set.get(LOCATION_RELATIONSHIP_TYPE).unwrap_or_default();
        let mut relationships = Vec::with_capacity(values.len());
        for value in values {
            match LocationRelationship::from_value(value) {
                Some(relationship) => relationships.push(relationship),
                None => warn!(
                    "event=location_relationships_get module=collection status=skipped partition={} reason=unexpected_value_shape",
                    partition
                ),
            }
        }
        Ok(relationships)
    }

    /// Replaces all relationships of the partition.
    pub fn save(
        &mut self,
        partition: &PartitionKey,
        relationships: &[LocationRelationship],
    ) -> RepoResult<usize> {
        self.inner.save(partition, &location_value_set(relationships))
    }
}
