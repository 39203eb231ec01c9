//! Value-set entry store.
//!
//! # Responsibility
//! - Persist typed value-set generations for one partition.
//! - Replace a partition's whole generation in one immediate transaction.
//!
//! # Invariants
//! - A save archives every active entry of the partition before inserting
//!   the new generation; readers never see a mix of two generations.
//! - Every entry of a generation is stamped with `GENERATION_VERSION`.
//! - Archived entries keep their version; archival does not renumber.

use crate::model::entry::{Entry, ValueSet};
use crate::model::partition::{PartitionKey, ValidationError};
use crate::model::record::Version;
use crate::repo::{ensure_table_ready, parse_is_deleted, RepoError, RepoResult, NOW_MS_SQL};
use log::{error, info};
use rusqlite::{params, Connection, Row, TransactionBehavior};

/// Version stamped on every entry of a saved generation.
pub const GENERATION_VERSION: Version = 1;

const ENTRY_COLUMNS: &[&str] = &[
    "id",
    "fiscal_year",
    "entry_type",
    "entry_value",
    "version",
    "is_deleted",
    "created_at",
    "updated_at",
];

/// Table holding the entries of one value-set collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTable(&'static str);

impl EntryTable {
    /// Dropdown option categories.
    pub const DROPDOWN_OPTIONS: Self = Self("dropdown_options");
    /// Location to location-code pairs.
    pub const LOCATION_RELATIONSHIPS: Self = Self("location_relationships");

    pub fn name(self) -> &'static str {
        self.0
    }
}

/// Storage contract for replace-whole value-set collections.
pub trait EntryStore {
    /// Active entries of the partition in insertion order.
    fn active_entries(&self, partition: &PartitionKey) -> RepoResult<Vec<Entry>>;
    /// Archives the active generation and inserts `set` as the new one.
    /// Returns the number of entries inserted.
    fn replace_entries(&mut self, partition: &PartitionKey, set: &ValueSet) -> RepoResult<usize>;
}

/// SQLite-backed entry store.
pub struct SqliteEntryStore<'conn> {
    conn: &'conn mut Connection,
    table: EntryTable,
}

impl<'conn> SqliteEntryStore<'conn> {
    /// Constructs a store from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection, table: EntryTable) -> RepoResult<Self> {
        ensure_table_ready(conn, table.name(), ENTRY_COLUMNS)?;
        Ok(Self { conn, table })
    }

    pub fn dropdown_options(conn: &'conn mut Connection) -> RepoResult<Self> {
        Self::try_new(conn, EntryTable::DROPDOWN_OPTIONS)
    }

    pub fn location_relationships(conn: &'conn mut Connection) -> RepoResult<Self> {
        Self::try_new(conn, EntryTable::LOCATION_RELATIONSHIPS)
    }

    fn replace_in_tx(
        &mut self,
        partition: &PartitionKey,
        rows: &[(&str, String)],
    ) -> RepoResult<(usize, usize)> {
        let table = self.table.name();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let archived = tx.execute(
            &format!(
                "UPDATE {table}
                 SET is_deleted = 1, updated_at = {NOW_MS_SQL}
                 WHERE fiscal_year = ?1 AND is_deleted = 0;"
            ),
            [partition.as_str()],
        )?;

        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {table} (fiscal_year, entry_type, entry_value, version, is_deleted)
                 VALUES (?1, ?2, ?3, ?4, 0);"
            ))?;
            for (entry_type, value) in rows {
                insert.execute(params![
                    partition.as_str(),
                    entry_type,
                    value,
                    GENERATION_VERSION
                ])?;
            }
        }

        tx.commit()?;
        Ok((archived, rows.len()))
    }
}

impl EntryStore for SqliteEntryStore<'_> {
    fn active_entries(&self, partition: &PartitionKey) -> RepoResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, fiscal_year, entry_type, entry_value, version, is_deleted, created_at, updated_at
             FROM {}
             WHERE fiscal_year = ?1 AND is_deleted = 0
             ORDER BY id ASC;",
            self.table.name()
        ))?;
        let mut rows = stmt.query([partition.as_str()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row, self.table)?);
        }
        Ok(entries)
    }

    fn replace_entries(&mut self, partition: &PartitionKey, set: &ValueSet) -> RepoResult<usize> {
        let mut rows = Vec::with_capacity(set.value_count());
        for (entry_type, values) in set.iter() {
            if entry_type.trim().is_empty() {
                return Err(ValidationError::EmptyEntryType.into());
            }
            for value in values {
                rows.push((entry_type, serde_json::to_string(value)?));
            }
        }

        match self.replace_in_tx(partition, &rows) {
            Ok((archived, inserted)) => {
                info!(
                    "event=entries_save module=store status=ok table={} partition={} archived={} inserted={}",
                    self.table.name(),
                    partition,
                    archived,
                    inserted
                );
                Ok(inserted)
            }
            Err(err) => {
                error!(
                    "event=entries_save module=store status=error table={} partition={} error_kind={}",
                    self.table.name(),
                    partition,
                    err.kind()
                );
                Err(err)
            }
        }
    }
}

fn parse_entry_row(row: &Row<'_>, table: EntryTable) -> RepoResult<Entry> {
    let raw_value: String = row.get("entry_value")?;
    let value = serde_json::from_str(&raw_value).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid JSON in {}.entry_value: {err}",
            table.name()
        ))
    })?;
    let is_deleted = parse_is_deleted(row.get("is_deleted")?, table.name())?;

    Ok(Entry {
        id: row.get("id")?,
        partition_key: row.get("fiscal_year")?,
        entry_type: row.get("entry_type")?,
        value,
        version: row.get("version")?,
        active: !is_deleted,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
