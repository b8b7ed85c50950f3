//! Repository layer over SQLite for rowkeep.
//! Deferred query criteria, CRUD repositories and a small binding container.

pub mod config;
pub mod criteria;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::{CoreConfig, DbConfig, RepositoryConfig};
pub use criteria::{
    BasicCriteria, CriteriaList, CriteriaRegistry, Criterion, CriterionArg, HasCriteria,
};
pub use db::{open_db, open_db_in_memory, DbError, DbResult, Migration, SchemaSource};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status};
pub use model::{Model, Record, Related, Relation, RelationKind, Value};
pub use query::{Operator, Page, PageRequest, Query, SortDirection};
pub use repo::{
    ListKey, ListMap, RepoError, RepoResult, Repository, SqliteRepository, UpdateOrCreate,
    UpdateOutcome, UpsertOutcome,
};
pub use service::{ContainerError, RepositoryBinding, RepositoryContainer, RepositoryProvider};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
