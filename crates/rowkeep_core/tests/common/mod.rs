#![allow(dead_code)]

use rowkeep_core::{open_db_in_memory, DbConfig, Migration, Model, Record, Relation, Value};
use rusqlite::Connection;

pub struct TestModel;

impl Model for TestModel {
    fn table() -> &'static str {
        "test_models"
    }

    fn relations() -> &'static [Relation] {
        const RELATIONS: &[Relation] = &[
            Relation::has_one("related_model", "related_models", "test_model_id"),
            Relation::has_many("related_models", "related_models", "test_model_id"),
        ];
        RELATIONS
    }
}

pub struct RelatedModel;

impl Model for RelatedModel {
    fn table() -> &'static str {
        "related_models"
    }

    fn fillable() -> &'static [&'static str] {
        &["attribute3", "test_model_id"]
    }

    fn relations() -> &'static [Relation] {
        const RELATIONS: &[Relation] =
            &[Relation::belongs_to("test_model", "test_models", "test_model_id")];
        RELATIONS
    }
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: "
CREATE TABLE test_models (
    id INTEGER PRIMARY KEY,
    attribute1 TEXT,
    attribute2 TEXT
);
CREATE TABLE related_models (
    id INTEGER PRIMARY KEY,
    attribute3 TEXT,
    test_model_id INTEGER REFERENCES test_models(id) ON DELETE CASCADE
);
",
    },
    Migration {
        version: 2,
        sql: "
INSERT INTO test_models (id, attribute1, attribute2) VALUES
    (1, 'value1', 'same'),
    (2, 'value3', 'value4'),
    (3, 'value5', 'same');
INSERT INTO related_models (attribute3, test_model_id) VALUES ('related', 1);
",
    },
];

pub fn seeded_connection() -> Connection {
    open_db_in_memory(&DbConfig::default(), MIGRATIONS).unwrap()
}

pub fn ids(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .map(|record| record.get("id").and_then(Value::as_i64).unwrap())
        .collect()
}

pub fn text<'a>(record: &'a Record, column: &str) -> &'a str {
    record.get(column).and_then(Value::as_str).unwrap()
}
