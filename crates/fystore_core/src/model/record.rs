//! Versioned record model for single-document collections.
//!
//! # Invariants
//! - At most one record per partition has `active = true`.
//! - Versions issued by `save` within one partition strictly increase and
//!   are never handed out twice.

use serde::Serialize;

/// Per-partition generation number, starting at 1.
pub type Version = i64;

/// Store-assigned row identity, unique across all partitions.
pub type RecordId = i64;

/// One stored generation of a single-document collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedRecord {
    pub id: RecordId,
    pub partition_key: String,
    /// Opaque serialized document. The store never inspects it.
    pub payload: String,
    pub version: Version,
    /// `false` once archived by a later save or by `delete_all`.
    pub active: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl VersionedRecord {
    /// Whether this record may be purged.
    pub fn is_backup(&self) -> bool {
        !self.active
    }
}
