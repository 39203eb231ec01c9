//! Versioned, soft-deleting partition store.
//!
//! # Responsibility
//! - Assign per-partition version numbers to single-document records.
//! - Archive, restore, deactivate and purge records inside one immediate
//!   SQLite transaction per operation.
//!
//! # Invariants
//! - At most one record per partition is active. The schema backs this
//!   with a partial unique index; writes also re-check it before commit.
//! - Every partition keeps a high-water mark in `partition_versions`.
//!   `insert_active` and `restore` number from it, so a purged version is
//!   never handed out again.
//! - Only inactive records can be purged, and never while the active
//!   record carries the same version.
//! - `restore` rewrites the active row in place (same id, next version)
//!   and keeps its previous state as an archived record.

use crate::model::partition::{ensure_positive_version, PartitionKey};
use crate::model::record::{RecordId, Version, VersionedRecord};
use crate::repo::{
    bool_to_int, ensure_table_ready, parse_is_deleted, RepoError, RepoResult, NOW_MS_SQL,
};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const HIGH_WATER_TABLE: &str = "partition_versions";
const HIGH_WATER_COLUMNS: &[&str] = &["record_table", "fiscal_year", "max_version"];

const RECORD_COLUMNS: &[&str] = &[
    "id",
    "fiscal_year",
    "data",
    "version",
    "is_deleted",
    "created_at",
    "updated_at",
];

/// Table holding the records of one single-document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTable(&'static str);

impl RecordTable {
    /// The fiscal-year tabular dataset.
    pub const TABLE_DATA: Self = Self("table_data");

    pub fn name(self) -> &'static str {
        self.0
    }
}

/// Storage contract for the version/soft-delete/restore protocol.
///
/// Write methods take `&mut self` because each one owns a transaction.
pub trait VersionStore {
    /// Highest version ever assigned in the partition, or 0 when empty.
    ///
    /// Purging records does not lower it.
    fn current_version(&self, partition: &PartitionKey) -> RepoResult<Version>;
    /// The active record, if any.
    fn active_record(&self, partition: &PartitionKey) -> RepoResult<Option<VersionedRecord>>;
    /// All records of the partition, newest version first.
    fn list_records(&self, partition: &PartitionKey) -> RepoResult<Vec<VersionedRecord>>;
    /// Deactivates the active record. Returns whether one was active.
    fn archive_active(&mut self, partition: &PartitionKey) -> RepoResult<bool>;
    /// Archives the active record and inserts `payload` as the next version.
    fn insert_active(
        &mut self,
        partition: &PartitionKey,
        payload: &str,
    ) -> RepoResult<VersionedRecord>;
    /// Copies the payload of `version` onto the active record.
    ///
    /// The active record keeps its id and takes the next version; its
    /// previous payload and version are kept as a new archived record.
    /// With no active record, a new one is inserted at version 1.
    fn restore(&mut self, partition: &PartitionKey, version: Version)
        -> RepoResult<VersionedRecord>;
    /// Deactivates every record of the partition. Returns the record count.
    fn deactivate_all(&mut self, partition: &PartitionKey) -> RepoResult<usize>;
    /// Hard-deletes the inactive record(s) with `version`.
    ///
    /// Returns `false` without deleting when the active record has
    /// `version` or nothing matches.
    fn purge(&mut self, partition: &PartitionKey, version: Version) -> RepoResult<bool>;
}

/// SQLite-backed version store.
pub struct SqliteVersionStore<'conn> {
    conn: &'conn mut Connection,
    table: RecordTable,
}

impl<'conn> SqliteVersionStore<'conn> {
    /// Constructs a store from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection, table: RecordTable) -> RepoResult<Self> {
        ensure_table_ready(conn, table.name(), RECORD_COLUMNS)?;
        ensure_table_ready(conn, HIGH_WATER_TABLE, HIGH_WATER_COLUMNS)?;
        Ok(Self { conn, table })
    }

    /// Store over `table_data`.
    pub fn table_data(conn: &'conn mut Connection) -> RepoResult<Self> {
        Self::try_new(conn, RecordTable::TABLE_DATA)
    }

    fn write<T>(
        &mut self,
        event: &'static str,
        partition: &PartitionKey,
        op: impl FnOnce(&Transaction<'_>, RecordTable) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let result = run_write(self.conn, self.table, partition, op);
        if let Err(err) = &result {
            error!(
                "event={event} module=store status=error table={} partition={} error_kind={}",
                self.table.name(),
                partition,
                err.kind()
            );
        }
        result
    }
}

impl VersionStore for SqliteVersionStore<'_> {
    fn current_version(&self, partition: &PartitionKey) -> RepoResult<Version> {
        high_water_mark(self.conn, self.table, partition)
    }

    fn active_record(&self, partition: &PartitionKey) -> RepoResult<Option<VersionedRecord>> {
        load_active(self.conn, self.table, partition)
    }

    fn list_records(&self, partition: &PartitionKey) -> RepoResult<Vec<VersionedRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{}
             WHERE fiscal_year = ?1
             ORDER BY version DESC, id DESC;",
            select_sql(self.table)
        ))?;
        let mut rows = stmt.query([partition.as_str()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row, self.table)?);
        }
        Ok(records)
    }

    fn archive_active(&mut self, partition: &PartitionKey) -> RepoResult<bool> {
        let archived = self.write("record_archive", partition, |tx, table| {
            archive_active_in_tx(tx, table, partition)
        })?;
        info!(
            "event=record_archive module=store status=ok table={} partition={} archived={}",
            self.table.name(),
            partition,
            archived
        );
        Ok(archived)
    }

    fn insert_active(
        &mut self,
        partition: &PartitionKey,
        payload: &str,
    ) -> RepoResult<VersionedRecord> {
        let record = self.write("record_save", partition, |tx, table| {
            let next_version = bump_high_water_mark(tx, table, partition)?;
            archive_active_in_tx(tx, table, partition)?;
            tx.execute(
                &format!(
                    "INSERT INTO {} (fiscal_year, data, version, is_deleted)
                     VALUES (?1, ?2, ?3, ?4);",
                    table.name()
                ),
                params![partition.as_str(), payload, next_version, bool_to_int(false)],
            )?;
            load_by_id(tx, table, tx.last_insert_rowid())
        })?;
        info!(
            "event=record_save module=store status=ok table={} partition={} version={}",
            self.table.name(),
            partition,
            record.version
        );
        Ok(record)
    }

    fn restore(
        &mut self,
        partition: &PartitionKey,
        version: Version,
    ) -> RepoResult<VersionedRecord> {
        let version = ensure_positive_version(version)?;
        let record = self.write("record_restore", partition, |tx, table| {
            let payload: Option<String> = tx
                .query_row(
                    &format!(
                        "SELECT data FROM {}
                         WHERE fiscal_year = ?1 AND version = ?2
                         ORDER BY is_deleted DESC, id DESC
                         LIMIT 1;",
                        table.name()
                    ),
                    params![partition.as_str(), version],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(payload) = payload else {
                return Err(RepoError::not_found(partition, version));
            };

            match load_active(tx, table, partition)? {
                Some(active) => {
                    snapshot_as_backup(tx, table, &active)?;
                    let next_version = bump_high_water_mark(tx, table, partition)?;
                    tx.execute(
                        &format!(
                            "UPDATE {}
                             SET data = ?1, version = ?2, updated_at = {NOW_MS_SQL}
                             WHERE id = ?3;",
                            table.name()
                        ),
                        params![payload, next_version, active.id],
                    )?;
                }
                None => {
                    tx.execute(
                        &format!(
                            "INSERT INTO {} (fiscal_year, data, version, is_deleted)
                             VALUES (?1, ?2, 1, 0);",
                            table.name()
                        ),
                        params![partition.as_str(), payload],
                    )?;
                }
            }

            load_active(tx, table, partition)?.ok_or_else(|| {
                RepoError::InvariantViolation(format!(
                    "no active record after restore in partition {partition}"
                ))
            })
        })?;
        info!(
            "event=record_restore module=store status=ok table={} partition={} restored_from={} version={}",
            self.table.name(),
            partition,
            version,
            record.version
        );
        Ok(record)
    }

    fn deactivate_all(&mut self, partition: &PartitionKey) -> RepoResult<usize> {
        let touched = self.write("record_delete_all", partition, |tx, table| {
            let touched = tx.execute(
                &format!(
                    "UPDATE {}
                     SET is_deleted = 1, updated_at = {NOW_MS_SQL}
                     WHERE fiscal_year = ?1;",
                    table.name()
                ),
                [partition.as_str()],
            )?;
            Ok(touched)
        })?;
        info!(
            "event=record_delete_all module=store status=ok table={} partition={} records={}",
            self.table.name(),
            partition,
            touched
        );
        Ok(touched)
    }

    fn purge(&mut self, partition: &PartitionKey, version: Version) -> RepoResult<bool> {
        let version = ensure_positive_version(version)?;
        let removed = self.write("record_purge", partition, |tx, table| {
            let active_version = load_active(tx, table, partition)?.map(|active| active.version);
            if active_version == Some(version) {
                return Ok(0);
            }
            let removed = tx.execute(
                &format!(
                    "DELETE FROM {}
                     WHERE fiscal_year = ?1 AND version = ?2 AND is_deleted = 1;",
                    table.name()
                ),
                params![partition.as_str(), version],
            )?;
            Ok(removed)
        })?;
        info!(
            "event=record_purge module=store status=ok table={} partition={} version={} removed={}",
            self.table.name(),
            partition,
            version,
            removed
        );
        Ok(removed > 0)
    }
}

fn run_write<T>(
    conn: &mut Connection,
    table: RecordTable,
    partition: &PartitionKey,
    op: impl FnOnce(&Transaction<'_>, RecordTable) -> RepoResult<T>,
) -> RepoResult<T> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = op(&tx, table)?;
    ensure_single_active(&tx, table, partition)?;
    tx.commit()?;
    Ok(value)
}

fn select_sql(table: RecordTable) -> String {
    format!(
        "SELECT id, fiscal_year, data, version, is_deleted, created_at, updated_at
         FROM {}",
        table.name()
    )
}

fn high_water_mark(
    conn: &Connection,
    table: RecordTable,
    partition: &PartitionKey,
) -> RepoResult<Version> {
    let version: Option<Version> = conn
        .query_row(
            "SELECT max_version FROM partition_versions
             WHERE record_table = ?1 AND fiscal_year = ?2;",
            params![table.name(), partition.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version.unwrap_or(0))
}

/// Raises the partition's high-water mark by one and returns the new value.
fn bump_high_water_mark(
    tx: &Transaction<'_>,
    table: RecordTable,
    partition: &PartitionKey,
) -> RepoResult<Version> {
    let next_version = high_water_mark(tx, table, partition)? + 1;
    tx.execute(
        "INSERT INTO partition_versions (record_table, fiscal_year, max_version)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (record_table, fiscal_year) DO UPDATE SET max_version = excluded.max_version;",
        params![table.name(), partition.as_str(), next_version],
    )?;
    Ok(next_version)
}

fn archive_active_in_tx(
    tx: &Transaction<'_>,
    table: RecordTable,
    partition: &PartitionKey,
) -> RepoResult<bool> {
    let changed = tx.execute(
        &format!(
            "UPDATE {}
             SET is_deleted = 1, updated_at = {NOW_MS_SQL}
             WHERE fiscal_year = ?1 AND is_deleted = 0;",
            table.name()
        ),
        [partition.as_str()],
    )?;
    match changed {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvariantViolation(format!(
            "{other} active records in partition {partition}"
        ))),
    }
}

/// Keeps the pre-restore state of `active` as an archived record with
/// its original version and creation time.
fn snapshot_as_backup(
    tx: &Transaction<'_>,
    table: RecordTable,
    active: &VersionedRecord,
) -> RepoResult<()> {
    tx.execute(
        &format!(
            "INSERT INTO {} (fiscal_year, data, version, is_deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, {NOW_MS_SQL});",
            table.name()
        ),
        params![
            active.partition_key,
            active.payload,
            active.version,
            active.created_at
        ],
    )?;
    Ok(())
}

fn ensure_single_active(
    conn: &Connection,
    table: RecordTable,
    partition: &PartitionKey,
) -> RepoResult<()> {
    let active: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE fiscal_year = ?1 AND is_deleted = 0;",
            table.name()
        ),
        [partition.as_str()],
        |row| row.get(0),
    )?;
    if active > 1 {
        return Err(RepoError::InvariantViolation(format!(
            "{active} active records in partition {partition}"
        )));
    }
    Ok(())
}

fn load_active(
    conn: &Connection,
    table: RecordTable,
    partition: &PartitionKey,
) -> RepoResult<Option<VersionedRecord>> {
    let mut stmt = conn.prepare(&format!(
        "{}
         WHERE fiscal_year = ?1 AND is_deleted = 0
         ORDER BY version DESC, id DESC;",
        select_sql(table)
    ))?;
    let mut rows = stmt.query([partition.as_str()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let record = parse_record_row(row, table)?;
    if rows.next()?.is_some() {
        return Err(RepoError::InvariantViolation(format!(
            "more than one active record in partition {partition}"
        )));
    }
    Ok(Some(record))
}

fn load_by_id(conn: &Connection, table: RecordTable, id: RecordId) -> RepoResult<VersionedRecord> {
    let mut stmt = conn.prepare(&format!("{} WHERE id = ?1;", select_sql(table)))?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => parse_record_row(row, table),
        None => Err(RepoError::InvalidData(format!(
            "record {id} vanished from {} inside its own transaction",
            table.name()
        ))),
    }
}

fn parse_record_row(row: &Row<'_>, table: RecordTable) -> RepoResult<VersionedRecord> {
    let version: Version = row.get("version")?;
    if version <= 0 {
        return Err(RepoError::InvalidData(format!(
            "invalid version `{version}` in {}.version",
            table.name()
        )));
    }
    let is_deleted = parse_is_deleted(row.get("is_deleted")?, table.name())?;

    Ok(VersionedRecord {
        id: row.get("id")?,
        partition_key: row.get("fiscal_year")?,
        payload: row.get("data")?,
        version,
        active: !is_deleted,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
