use goaltrack_core::db::migrations::latest_version;
use goaltrack_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "goal_history_table");
}

#[test]
fn opening_same_database_twice_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("goaltrack.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO goal_history_table (timestamp) VALUES (?1);",
            [1_700_000_000_000_i64],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM goal_history_table;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn new_rows_default_to_not_evaluated() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO goal_history_table (timestamp) VALUES (42);",
        [],
    )
    .unwrap();

    let achieved: i32 = conn
        .query_row(
            "SELECT num_goals_achieved FROM goal_history_table;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(achieved, -1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

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
