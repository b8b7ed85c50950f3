mod common;

use common::{ids, seeded_connection, text, RelatedModel, TestModel};
use rowkeep_core::{
    BasicCriteria, HasCriteria, Record, RepoError, Repository, SqliteRepository, UpdateOutcome,
    UpsertOutcome, Value,
};

#[test]
fn create_returns_stored_row_with_new_id() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let created = repo
        .create(Record::from([("attribute1", "value6"), ("attribute2", "value7")]))
        .unwrap();

    assert_eq!(created.get("id"), Some(&Value::Integer(4)));
    assert_eq!(text(&created, "attribute1"), "value6");
    assert_eq!(repo.count(None).unwrap(), 4);
}

#[test]
fn create_with_empty_payload_inserts_default_row() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let created = repo.create(Record::new()).unwrap();
    assert_eq!(created.get("id"), Some(&Value::Integer(4)));
    assert_eq!(created.get("attribute1"), Some(&Value::Null));
}

#[test]
fn create_drops_columns_outside_fillable() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<RelatedModel>::new(&conn);

    let created = repo
        .create(
            Record::new()
                .with("id", 99)
                .with("attribute3", "fresh")
                .with("test_model_id", 2),
        )
        .unwrap();

    assert_eq!(created.get("id"), Some(&Value::Integer(2)));
    assert_eq!(text(&created, "attribute3"), "fresh");
}

#[test]
fn update_shapes_outcome_by_match_count() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let none = repo
        .update("nothing".into(), &Record::from([("attribute1", "x")]), "attribute2")
        .unwrap();
    assert!(none.is_none());

    let one = repo
        .update(2.into(), &Record::from([("attribute1", "changed")]), "id")
        .unwrap();
    match one {
        UpdateOutcome::One(row) => assert_eq!(text(&row, "attribute1"), "changed"),
        other => panic!("expected one row, got {other:?}"),
    }

    let many = repo
        .update("same".into(), &Record::from([("attribute1", "bulk")]), "attribute2")
        .unwrap();
    match many {
        UpdateOutcome::Many(rows) => {
            assert_eq!(ids(&rows), vec![1, 3]);
            assert!(rows.iter().all(|row| text(row, "attribute1") == "bulk"));
        }
        other => panic!("expected many rows, got {other:?}"),
    }
}

#[test]
fn update_that_rewrites_the_key_still_returns_the_row() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let outcome = repo
        .update(2.into(), &Record::from([("id", 10)]), "id")
        .unwrap();
    match outcome {
        UpdateOutcome::One(row) => {
            assert_eq!(row.get("id"), Some(&Value::Integer(10)));
            assert_eq!(text(&row, "attribute1"), "value3");
        }
        other => panic!("expected one row, got {other:?}"),
    }
    assert_eq!(ids(&repo.get_all().unwrap()), vec![1, 3, 10]);
}

#[test]
fn update_that_rewrites_the_match_column_returns_every_row() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let outcome = repo
        .update("same".into(), &Record::from([("attribute2", "moved")]), "attribute2")
        .unwrap();
    let rows = outcome.into_records();
    assert_eq!(ids(&rows), vec![1, 3]);
    assert!(rows.iter().all(|row| text(row, "attribute2") == "moved"));
    assert!(repo.get_by("attribute2", "same".into()).unwrap().is_empty());
}

#[test]
fn update_or_create_can_rewrite_the_key() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let outcome = repo
        .update_or_create()
        .matching(Record::from([("attribute1", "value3")]))
        .set(Record::from([("id", 20)]))
        .unwrap();

    assert_eq!(ids(&outcome.into_records()), vec![20]);
    assert!(repo.get(2.into()).unwrap().is_none());
}

#[test]
fn update_by_key_uses_model_key() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let outcome = repo
        .update_by_key(3.into(), &Record::from([("attribute2", "other")]))
        .unwrap();
    assert_eq!(outcome.len(), 1);
    assert_eq!(ids(&repo.get_by("attribute2", "same".into()).unwrap()), vec![1]);
}

#[test]
fn delete_returns_affected_row_count() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    assert_eq!(repo.delete(1.into(), "id").unwrap(), 1);
    assert_eq!(repo.delete("same".into(), "attribute2").unwrap(), 1);
    assert_eq!(repo.delete_by_key(42.into()).unwrap(), 0);
    assert_eq!(ids(&repo.get_all().unwrap()), vec![2]);
}

#[test]
fn writes_leave_pending_criteria_untouched() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    repo.order_by_desc("id");
    repo.delete(2.into(), "id").unwrap();
    repo.create(Record::from([("attribute1", "late")])).unwrap();
    assert_eq!(repo.criteria().len(), 1);

    assert_eq!(ids(&repo.get_all().unwrap()), vec![4, 3, 1]);
    assert!(repo.criteria().is_empty());
}

#[test]
fn update_or_create_updates_existing_match() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let outcome = repo
        .update_or_create()
        .matching(Record::from([("attribute1", "value1")]))
        .set(Record::from([("attribute2", "updated")]))
        .unwrap();

    match outcome {
        UpsertOutcome::Single(row) => {
            assert_eq!(row.get("id"), Some(&Value::Integer(1)));
            assert_eq!(text(&row, "attribute2"), "updated");
        }
        other => panic!("expected a single row, got {other:?}"),
    }
    assert_eq!(repo.count(None).unwrap(), 3);
}

#[test]
fn update_or_create_inserts_conditions_merged_with_payload() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let outcome = repo
        .update_or_create()
        .matching(Record::from([("attribute1", "new"), ("attribute2", "pending")]))
        .set(Record::from([("attribute2", "created")]))
        .unwrap();

    let rows = outcome.into_records();
    assert_eq!(ids(&rows), vec![4]);
    assert_eq!(text(&rows[0], "attribute1"), "new");
    assert_eq!(text(&rows[0], "attribute2"), "created");
}

#[test]
fn update_or_create_runs_one_upsert_per_condition_set_in_order() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let outcome = repo
        .update_or_create()
        .matching(Record::from([("attribute1", "value5")]))
        .or_matching(Record::from([("attribute1", "value9")]))
        .set(Record::from([("attribute2", "touched")]))
        .unwrap();

    let rows = outcome.into_records();
    assert_eq!(rows.len(), 2);
    assert_eq!(ids(&rows), vec![3, 4]);
    assert!(rows.iter().all(|row| text(row, "attribute2") == "touched"));
    assert_eq!(repo.count(None).unwrap(), 4);
}

#[test]
fn update_or_create_without_conditions_fails_before_writing() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let err = repo
        .update_or_create()
        .set(Record::from([("attribute1", "ignored")]))
        .unwrap_err();

    assert!(matches!(err, RepoError::MissingMatchCondition));
    assert_eq!(repo.count(None).unwrap(), 3);
}
