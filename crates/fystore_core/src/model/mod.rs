//! Domain model for fiscal-year partitioned datasets.
//!
//! # Responsibility
//! - Define the records and entries persisted by the partition store.
//! - Define the canonical tabular row produced by bulk import.
//!
//! # Invariants
//! - Every record and entry is scoped by exactly one `PartitionKey`.
//! - Deletion is a soft-delete (`active = false`); hard delete is purge-only.

pub mod entry;
pub mod partition;
pub mod record;
pub mod table_row;
