mod common;

use common::{ids, TestModel, MIGRATIONS};
use rowkeep_core::db::migrations::latest_version;
use rowkeep_core::{
    open_db, open_db_in_memory, BasicCriteria, CoreConfig, DbConfig, DbError, HasCriteria,
    PageRequest, Repository, SqliteRepository,
};
use rusqlite::Connection;

#[test]
fn reopening_a_file_database_keeps_data_and_skips_applied_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rowkeep.db");

    let conn = open_db(&path, &DbConfig::default(), MIGRATIONS).unwrap();
    SqliteRepository::<TestModel>::new(&conn)
        .delete_by_key(2.into())
        .unwrap();
    drop(conn);

    let conn = open_db(&path, &DbConfig::default(), MIGRATIONS).unwrap();
    assert_eq!(schema_version(&conn), latest_version(MIGRATIONS));
    let mut repo = SqliteRepository::<TestModel>::new(&conn);
    assert_eq!(ids(&repo.get_all().unwrap()), vec![1, 3]);
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, &DbConfig::default(), MIGRATIONS).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_keys_follow_config() {
    let conn = open_db_in_memory(&DbConfig::default(), MIGRATIONS).unwrap();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);
    repo.delete_by_key(1.into()).unwrap();
    assert_eq!(related_rows(&conn), 0);

    let config = DbConfig {
        foreign_keys: false,
        ..DbConfig::default()
    };
    let conn = open_db_in_memory(&config, MIGRATIONS).unwrap();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);
    repo.delete_by_key(1.into()).unwrap();
    assert_eq!(related_rows(&conn), 1);
}

#[test]
fn repository_defaults_come_from_json_config() {
    let config: CoreConfig = serde_json::from_str(
        r#"{"repository": {"remember_criteria": true, "page_name": "offset"}}"#,
    )
    .unwrap();
    let conn = open_db_in_memory(&config.db, MIGRATIONS).unwrap();
    let mut repo = SqliteRepository::<TestModel>::with_config(&conn, &config.repository);

    repo.order_by_desc("id");
    assert_eq!(ids(&repo.get_all().unwrap()), vec![3, 2, 1]);
    assert_eq!(repo.criteria().len(), 1);

    let page = repo
        .paginate_all(&PageRequest::new(2).page_name(""))
        .unwrap();
    assert_eq!(page.page_name, "offset");
    assert_eq!(ids(&page.items), vec![3, 2]);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn related_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM related_models", [], |row| row.get(0))
        .unwrap()
}
