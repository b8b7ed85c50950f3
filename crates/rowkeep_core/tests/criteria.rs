mod common;

use common::{ids, seeded_connection, text, RelatedModel, TestModel};
use rowkeep_core::{
    BasicCriteria, Criterion, CriterionArg, HasCriteria, Operator, RepoError, Repository,
    SortDirection, SqliteRepository, Value,
};

#[test]
fn only_selects_requested_columns() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let rows = repo.only(["id", "attribute1"]).get_all().unwrap();
    assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec!["id", "attribute1"]);
}

#[test]
fn exclude_keeps_remaining_columns_in_table_order() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let rows = repo.exclude(["id", "attribute2"]).get_all().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec!["attribute1"]);
}

#[test]
fn selections_that_leave_no_columns_are_rejected() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let err = repo
        .exclude(["id", "attribute1", "attribute2"])
        .get_all()
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidCriterionArgs { criterion, .. } if criterion == "exclude"));

    repo.clear_criteria();
    let err = repo.only(Vec::<String>::new()).get_all().unwrap_err();
    assert!(matches!(err, RepoError::InvalidCriterionArgs { criterion, .. } if criterion == "only"));
}

#[test]
fn limit_and_order_by_chain() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    assert_eq!(ids(&repo.order_by("attribute2").get_all().unwrap()), vec![1, 3, 2]);
    assert_eq!(ids(&repo.order_by_desc("id").limit(2).get_all().unwrap()), vec![3, 2]);
}

#[test]
fn criteria_are_applied_in_insertion_order_and_drained() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    repo.limit(1).order_by_desc("id");
    assert_eq!(
        repo.criteria(),
        &[
            Criterion::Limit(1),
            Criterion::OrderBy("id".to_string(), SortDirection::Desc),
        ]
    );

    assert_eq!(ids(&repo.get_all().unwrap()), vec![3]);
    assert!(repo.criteria().is_empty());
    assert_eq!(ids(&repo.get_all().unwrap()), vec![1, 2, 3]);
}

#[test]
fn remembered_criteria_apply_to_every_query() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    repo.remember_criteria(true);
    repo.order_by_desc("id");
    assert_eq!(ids(&repo.get_all().unwrap()), vec![3, 2, 1]);
    assert_eq!(ids(&repo.get_by("attribute2", "same".into()).unwrap()), vec![3, 1]);

    repo.clear_criteria();
    assert_eq!(ids(&repo.get_all().unwrap()), vec![1, 2, 3]);
}

#[test]
fn failing_criterion_keeps_the_list_intact() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);
    repo.set_related(Vec::<String>::new());

    repo.limit(1).with_related();
    let err = repo.get_all().unwrap_err();
    assert!(matches!(err, RepoError::MissingRelations));
    assert_eq!(repo.criteria().len(), 2);
}

#[test]
fn invalid_order_column_is_rejected_before_execution() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let err = repo.order_by("not a column").get_all().unwrap_err();
    assert!(matches!(err, RepoError::InvalidIdentifier(_)));
}

#[test]
fn with_eager_loads_named_relations() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let rows = repo.with(["related_model"]).get_all().unwrap();
    let related = rows[0]
        .relation("related_model")
        .and_then(|related| related.as_one())
        .unwrap();
    assert_eq!(text(related, "attribute3"), "related");
    assert!(rows[1].relation("related_model").unwrap().as_one().is_none());
}

#[test]
fn with_related_loads_every_declared_relation() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let first = repo.with_related().get(1.into()).unwrap().unwrap();
    assert_eq!(first.relations().len(), 2);
    assert_eq!(first.relation("related_models").unwrap().records().len(), 1);
}

#[test]
fn with_related_honors_overridden_related_list() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);
    repo.set_related(["related_models"]);

    let first = repo.with_related().get_first().unwrap().unwrap();
    assert_eq!(
        first.relations().keys().collect::<Vec<_>>(),
        vec!["related_models"]
    );

    repo.set_related(Vec::<String>::new());
    let err = repo.with_related().get_all().unwrap_err();
    assert!(matches!(err, RepoError::MissingRelations));
}

#[test]
fn belongs_to_resolves_parent_row() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<RelatedModel>::new(&conn);

    let related = repo.with(["test_model"]).get_first().unwrap().unwrap();
    let parent = related.relation("test_model").unwrap().as_one().unwrap();
    assert_eq!(parent.get("id"), Some(&Value::Integer(1)));
}

#[test]
fn unknown_relation_is_an_error() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let err = repo.with(["nope"]).get_all().unwrap_err();
    assert!(matches!(err, RepoError::UnknownRelation(name) if name == "nope"));
}

#[test]
fn call_dispatches_builtins_by_name() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    repo.call("order_by", vec!["attribute1".into(), "DESC".into()])
        .unwrap();
    repo.call("limit", vec![2.into()]).unwrap();
    assert_eq!(ids(&repo.get_all().unwrap()), vec![3, 2]);

    let err = repo.call("limit", vec!["x".into()]).unwrap_err();
    assert!(matches!(err, RepoError::InvalidCriterionArgs { .. }));
}

#[test]
fn call_with_unknown_name_never_silently_succeeds() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);

    let err = repo.call("active", Vec::new()).unwrap_err();
    assert!(matches!(err, RepoError::NoSuchCriterion(name) if name == "active"));
    assert!(repo.criteria().is_empty());
}

#[test]
fn custom_criteria_resolve_through_both_tiers() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);
    repo.register_criterion("same_group", |query, _args| {
        Ok(query.where_eq("attribute2", "same"))
    })
    .unwrap();
    repo.register_criteria("not_id", |query, args| match args {
        [CriterionArg::Integer(id)] => Ok(query.where_op("id", Operator::NotEq, *id)),
        _ => Err(RepoError::InvalidCriterionArgs {
            criterion: "not_id".to_string(),
            message: "expects one integer".to_string(),
        }),
    })
    .unwrap();

    repo.call("same_group", Vec::new()).unwrap();
    repo.call("not_id", vec![1.into()]).unwrap();
    assert_eq!(ids(&repo.get_all().unwrap()), vec![3]);

    let duplicate = repo
        .register_criteria("same_group", |query, _args| Ok(query))
        .unwrap_err();
    assert!(matches!(duplicate, RepoError::DuplicateCriterion(_)));
}

#[test]
fn dyn_repository_supports_fluent_criteria() {
    let conn = seeded_connection();
    let mut concrete = SqliteRepository::<TestModel>::new(&conn);
    let repo: &mut dyn Repository = &mut concrete;

    let rows = repo.order_by_desc("attribute1").limit(1).get_all().unwrap();
    assert_eq!(text(&rows[0], "attribute1"), "value5");
    assert_eq!(repo.key_name(), "id");
}

#[test]
fn criteria_serialize_for_inspection() {
    let conn = seeded_connection();
    let mut repo = SqliteRepository::<TestModel>::new(&conn);
    repo.only(["id"]).with_related();

    let json = serde_json::to_value(repo.criteria()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"kind": "only", "args": ["id"]},
            {"kind": "with_related"}
        ])
    );
}
