use fystore_core::db::open_db_in_memory;
use fystore_core::{
    ErrorKind, PartitionKey, RepoError, SingleRecordCollection, SqliteVersionStore, TableRow,
    VersionStore, VersionedRecord,
};
use rusqlite::Connection;

fn fy(key: &str) -> PartitionKey {
    PartitionKey::new(key).unwrap()
}

fn collection(conn: &mut Connection) -> SingleRecordCollection<SqliteVersionStore<'_>> {
    SingleRecordCollection::new(SqliteVersionStore::table_data(conn).unwrap())
}

fn summary(records: &[VersionedRecord]) -> Vec<(i64, &str, bool)> {
    records
        .iter()
        .map(|record| (record.version, record.payload.as_str(), record.active))
        .collect()
}

#[test]
fn get_on_empty_partition_returns_none() {
    let mut conn = open_db_in_memory().unwrap();
    let tables = collection(&mut conn);

    assert_eq!(tables.get(&fy("FY_25")).unwrap(), None);
    assert_eq!(tables.current_version(&fy("FY_25")).unwrap(), 0);
    assert!(tables.list_backups(&fy("FY_25")).unwrap().is_empty());
    assert!(tables.get_rows(&fy("FY_25")).unwrap().is_empty());
}

#[test]
fn save_restore_purge_walkthrough() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");

    assert_eq!(tables.save(&key, "payload1").unwrap(), 1);
    assert_eq!(tables.save(&key, "payload2").unwrap(), 2);
    assert_eq!(
        summary(&tables.list_backups(&key).unwrap()),
        [(2, "payload2", true), (1, "payload1", false)]
    );

    let restored = tables.restore(&key, 1).unwrap();
    assert_eq!(restored.version, 3);
    assert_eq!(restored.payload, "payload1");
    assert_eq!(tables.get(&key).unwrap().as_deref(), Some("payload1"));
    assert_eq!(
        summary(&tables.list_backups(&key).unwrap()),
        [
            (3, "payload1", true),
            (2, "payload2", false),
            (1, "payload1", false)
        ]
    );

    assert!(tables.purge_backup(&key, 1).unwrap());
    assert_eq!(
        summary(&tables.list_backups(&key).unwrap()),
        [(3, "payload1", true), (2, "payload2", false)]
    );
    assert!(!tables.purge_backup(&key, 3).unwrap());
    assert_eq!(tables.get(&key).unwrap().as_deref(), Some("payload1"));
}

#[test]
fn every_save_leaves_exactly_one_active_record_at_current_version() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_26");

    for round in 1..=6 {
        let version = tables.save(&key, &format!("generation {round}")).unwrap();
        let records = tables.list_backups(&key).unwrap();
        let active: Vec<_> = records.iter().filter(|record| record.active).collect();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].version, version);
        assert_eq!(version, tables.current_version(&key).unwrap());
    }
}

#[test]
fn save_numbers_from_highest_version_across_restore_and_delete_all() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");

    let mut assigned = Vec::new();
    assigned.push(tables.save(&key, "a").unwrap());
    assigned.push(tables.save(&key, "b").unwrap());
    tables.restore(&key, 1).unwrap();
    let before = tables.current_version(&key).unwrap();
    assigned.push(tables.save(&key, "c").unwrap());
    assert_eq!(assigned[2], before + 1);

    tables.delete_all(&key).unwrap();
    let before = tables.current_version(&key).unwrap();
    assigned.push(tables.save(&key, "d").unwrap());
    assert_eq!(assigned[3], before + 1);

    assert!(assigned.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(assigned, [1, 2, 4, 5]);
}

#[test]
fn purge_keeps_future_versions_unique() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");

    tables.save(&key, "a").unwrap();
    tables.save(&key, "b").unwrap();
    tables.save(&key, "c").unwrap();
    assert!(tables.purge_backup(&key, 2).unwrap());

    assert_eq!(tables.save(&key, "d").unwrap(), 4);
}

#[test]
fn purging_the_highest_version_never_frees_its_number() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");

    tables.save(&key, "a").unwrap();
    tables.save(&key, "b").unwrap();
    tables.delete_all(&key).unwrap();
    assert!(tables.purge_backup(&key, 2).unwrap());
    assert_eq!(tables.current_version(&key).unwrap(), 2);

    assert_eq!(tables.save(&key, "c").unwrap(), 3);
    assert_eq!(
        summary(&tables.list_backups(&key).unwrap()),
        [(3, "c", true), (1, "a", false)]
    );
}

#[test]
fn purge_refuses_active_version_even_with_archived_twin() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");

    tables.save(&key, "a").unwrap();
    tables.delete_all(&key).unwrap();
    let restored = tables.restore(&key, 1).unwrap();
    assert_eq!(restored.version, 1);
    assert_eq!(
        summary(&tables.list_backups(&key).unwrap()),
        [(1, "a", true), (1, "a", false)]
    );

    assert!(!tables.purge_backup(&key, 1).unwrap());
    let records = tables.list_backups(&key).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records.iter().filter(|record| record.active).count(), 1);
    assert_eq!(tables.get(&key).unwrap().as_deref(), Some("a"));
}

#[test]
fn restore_below_partition_maximum_takes_next_unused_version() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");

    tables.save(&key, "a").unwrap();
    tables.save(&key, "b").unwrap();
    tables.delete_all(&key).unwrap();
    tables.restore(&key, 2).unwrap();
    assert_eq!(
        summary(&tables.list_backups(&key).unwrap()),
        [(2, "b", false), (1, "b", true), (1, "a", false)]
    );
    assert_eq!(tables.current_version(&key).unwrap(), 2);

    let restored = tables.restore(&key, 1).unwrap();
    assert_eq!(restored.version, 3);
    assert_eq!(restored.payload, "a");
    assert_eq!(
        summary(&tables.list_backups(&key).unwrap()),
        [
            (3, "a", true),
            (2, "b", false),
            (1, "b", false),
            (1, "a", false)
        ]
    );

    assert_eq!(tables.save(&key, "d").unwrap(), 4);
    let records = tables.list_backups(&key).unwrap();
    assert_eq!(records.iter().filter(|record| record.active).count(), 1);
    assert_eq!(records[0].version, tables.current_version(&key).unwrap());
}

#[test]
fn restore_leaves_restored_record_untouched() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");

    tables.save(&key, "first").unwrap();
    tables.save(&key, "second").unwrap();
    let original = tables
        .list_backups(&key)
        .unwrap()
        .into_iter()
        .find(|record| record.version == 1)
        .unwrap();

    let active_before = tables.list_backups(&key).unwrap()[0].clone();
    let restored = tables.restore(&key, 1).unwrap();
    assert_eq!(restored.id, active_before.id);

    let after = tables
        .list_backups(&key)
        .unwrap()
        .into_iter()
        .find(|record| record.id == original.id)
        .unwrap();
    assert_eq!(after, original);
}

#[test]
fn restore_without_active_record_inserts_version_one() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_24");

    tables.save(&key, "first").unwrap();
    tables.save(&key, "second").unwrap();
    tables.delete_all(&key).unwrap();
    assert_eq!(tables.get(&key).unwrap(), None);

    let restored = tables.restore(&key, 2).unwrap();
    assert_eq!(restored.version, 1);
    assert!(restored.active);
    assert_eq!(tables.get(&key).unwrap().as_deref(), Some("second"));

    let records = tables.list_backups(&key).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records.iter().filter(|record| record.active).count(), 1);
}

#[test]
fn restore_of_unknown_version_is_not_found_and_changes_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");
    tables.save(&key, "only").unwrap();
    let before = tables.list_backups(&key).unwrap();

    let err = tables.restore(&key, 9).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { version: 9, .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let other_partition = tables.restore(&fy("FY_99"), 1).unwrap_err();
    assert_eq!(other_partition.kind(), ErrorKind::NotFound);

    assert_eq!(tables.list_backups(&key).unwrap(), before);
}

#[test]
fn non_positive_versions_are_validation_failures() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");

    assert_eq!(
        tables.restore(&key, 0).unwrap_err().kind(),
        ErrorKind::ValidationFailed
    );
    assert_eq!(
        tables.purge_backup(&key, -1).unwrap_err().kind(),
        ErrorKind::ValidationFailed
    );
}

#[test]
fn delete_all_deactivates_every_record_and_makes_them_purgeable() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");

    tables.save(&key, "a").unwrap();
    tables.save(&key, "b").unwrap();
    tables.save(&key, "c").unwrap();

    assert_eq!(tables.delete_all(&key).unwrap(), 3);
    assert_eq!(tables.get(&key).unwrap(), None);
    let records = tables.list_backups(&key).unwrap();
    assert!(records.iter().all(|record| !record.active));
    assert_eq!(
        records.iter().map(|record| record.version).collect::<Vec<_>>(),
        [3, 2, 1]
    );

    assert!(tables.purge_backup(&key, 3).unwrap());
    assert!(tables.purge_backup(&key, 2).unwrap());
    assert!(tables.purge_backup(&key, 1).unwrap());
    assert!(tables.list_backups(&key).unwrap().is_empty());
    assert_eq!(tables.delete_all(&key).unwrap(), 0);
}

#[test]
fn purge_rejects_active_and_unknown_versions() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");

    assert!(!tables.purge_backup(&key, 1).unwrap());
    tables.save(&key, "a").unwrap();
    assert!(!tables.purge_backup(&key, 1).unwrap());
    assert!(!tables.purge_backup(&key, 2).unwrap());
    assert_eq!(tables.list_backups(&key).unwrap().len(), 1);
}

#[test]
fn partitions_are_independent() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);

    assert_eq!(tables.save(&fy("FY_24"), "x").unwrap(), 1);
    assert_eq!(tables.save(&fy("FY_25"), "y").unwrap(), 1);
    assert_eq!(tables.save(&fy("FY_24"), "z").unwrap(), 2);
    tables.delete_all(&fy("FY_25")).unwrap();

    assert_eq!(tables.get(&fy("FY_24")).unwrap().as_deref(), Some("z"));
    assert_eq!(tables.get(&fy("FY_25")).unwrap(), None);

    let ids: Vec<_> = tables
        .list_backups(&fy("FY_24"))
        .unwrap()
        .into_iter()
        .chain(tables.list_backups(&fy("FY_25")).unwrap())
        .map(|record| record.id)
        .collect();
    let mut unique = ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn archive_active_only_touches_the_active_record() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteVersionStore::table_data(&mut conn).unwrap();
    let key = fy("FY_25");

    assert!(!store.archive_active(&key).unwrap());
    store.insert_active(&key, "a").unwrap();
    let second = store.insert_active(&key, "b").unwrap();
    assert!(store.archive_active(&key).unwrap());
    assert!(!store.archive_active(&key).unwrap());

    assert_eq!(store.active_record(&key).unwrap(), None);
    assert_eq!(store.current_version(&key).unwrap(), second.version);
}

#[test]
fn rows_roundtrip_through_payload() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");
    let rows = vec![TableRow {
        id: 1,
        sno: 1,
        capacity: Some(300.0),
        group: "AGEL".to_string(),
        ppa_merchant: "PPA".to_string(),
        kind: "Solar".to_string(),
        solar: Some(300.0),
        wind: None,
        spv: "ARE41L".to_string(),
        location_code: "Khavda".to_string(),
        location: "Khavda".to_string(),
        pss: "KPS1".to_string(),
        connectivity: "CTU".to_string(),
    }];

    assert_eq!(tables.save_rows(&key, &rows).unwrap(), 1);
    assert_eq!(tables.get_rows(&key).unwrap(), rows);

    let payload = tables.get(&key).unwrap().unwrap();
    assert!(payload.contains(r#""ppaMerchant":"PPA""#));
    assert!(payload.contains(r#""wind":null"#));
}

#[test]
fn undecodable_payload_is_a_storage_failure_for_typed_reads() {
    let mut conn = open_db_in_memory().unwrap();
    let mut tables = collection(&mut conn);
    let key = fy("FY_25");
    tables.save(&key, "not json").unwrap();

    let err = tables.get_rows(&key).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
}
