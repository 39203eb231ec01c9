//! Batch import into the table collection.
//!
//! Imports go through `SingleRecordCollection::save`, so every imported
//! batch becomes a new version and the previous document stays a backup.

use crate::import::normalizer::normalize_rows;
use crate::model::partition::PartitionKey;
use crate::model::record::Version;
use crate::repo::version_store::VersionStore;
use crate::repo::RepoResult;
use crate::service::record_collection::SingleRecordCollection;
use log::info;
use serde::Serialize;
use serde_json::Value;

/// Result of importing one partition's batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub partition_key: String,
    /// Rows stored; 0 when the batch was empty and skipped.
    pub count: usize,
    /// Version created by the import, `None` when skipped.
    pub version: Option<Version>,
}

/// Normalizes `raw_rows` and saves them as a new generation of `partition`.
///
/// An empty batch leaves the partition untouched.
pub fn import_partition<S: VersionStore>(
    collection: &mut SingleRecordCollection<S>,
    partition: &PartitionKey,
    raw_rows: &[Value],
) -> RepoResult<ImportOutcome> {
    if raw_rows.is_empty() {
        info!(
            "event=import_partition module=import status=skipped partition={} reason=empty_batch",
            partition
        );
        return Ok(ImportOutcome {
            partition_key: partition.to_string(),
            count: 0,
            version: None,
        });
    }

    let rows = normalize_rows(raw_rows);
    let version = collection.save_rows(partition, &rows)?;
    info!(
        "event=import_partition module=import status=ok partition={} rows={} version={}",
        partition,
        rows.len(),
        version
    );
    Ok(ImportOutcome {
        partition_key: partition.to_string(),
        count: rows.len(),
        version: Some(version),
    })
}

/// Imports several partitions in order, one transaction per partition.
///
/// Stops at the first failure; partitions imported before it stay saved.
pub fn import_many<S: VersionStore>(
    collection: &mut SingleRecordCollection<S>,
    batches: &[(PartitionKey, Vec<Value>)],
) -> RepoResult<Vec<ImportOutcome>> {
    batches
        .iter()
        .map(|(partition, raw_rows)| import_partition(collection, partition, raw_rows))
        .collect()
}
