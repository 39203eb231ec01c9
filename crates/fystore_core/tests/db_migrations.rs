use fystore_core::db::migrations::latest_version;
use fystore_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "table_data");
    assert_table_exists(&conn, "dropdown_options");
    assert_table_exists(&conn, "location_relationships");
    assert_table_exists(&conn, "partition_versions");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fystore.sqlite3");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO table_data (fiscal_year, data, version) VALUES ('FY_25', '[]', 1);",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM table_data;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_second_active_record_in_partition() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO table_data (fiscal_year, data, version) VALUES ('FY_25', 'a', 1);",
        [],
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO table_data (fiscal_year, data, version) VALUES ('FY_25', 'b', 2);",
        [],
    );
    assert!(duplicate.is_err());

    conn.execute(
        "INSERT INTO table_data (fiscal_year, data, version) VALUES ('FY_26', 'c', 1);",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO table_data (fiscal_year, data, version, is_deleted) VALUES ('FY_25', 'd', 3, 1);",
        [],
    )
    .unwrap();
}

#[test]
fn schema_rejects_non_positive_versions_and_blank_partitions() {
    let conn = open_db_in_memory().unwrap();

    assert!(conn
        .execute(
            "INSERT INTO table_data (fiscal_year, data, version) VALUES ('FY_25', 'a', 0);",
            [],
        )
        .is_err());
    assert!(conn
        .execute(
            "INSERT INTO dropdown_options (fiscal_year, entry_type, entry_value) VALUES ('', 'groups', '\"x\"');",
            [],
        )
        .is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
