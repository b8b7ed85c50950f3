//! Repository contracts and the SQLite implementation.
//!
//! # Responsibility
//! - Define the object-safe `Repository` contract over dynamic `Record`s.
//! - Apply pending criteria to every read before delegating to SQLite.
//! - Return write results directly to the caller.
//!
//! # Invariants
//! - Reads drain criteria (unless remembered); writes never consume them.
//! - Storage errors propagate unchanged inside `RepoError::Db`.

pub mod sqlite_repo;
pub mod update_or_create;

pub use sqlite_repo::SqliteRepository;
pub use update_or_create::{UpdateOrCreate, UpsertOutcome};

use crate::criteria::HasCriteria;
use crate::db::DbError;
use crate::model::{Record, Value};
use crate::query::{Page, PageRequest};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository-layer error.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Dynamic call to a name with no registered criterion.
    NoSuchCriterion(String),
    /// Registering a criterion under a name that is already taken.
    DuplicateCriterion(String),
    InvalidCriterionArgs {
        criterion: String,
        message: String,
    },
    /// `with_related` on a repository without a related list.
    MissingRelations,
    UnknownRelation(String),
    InvalidIdentifier(String),
    /// A result could not be converted to the requested shape.
    Conversion(String),
    /// `UpdateOrCreate::set` without any match condition.
    MissingMatchCondition,
    InvalidPagination(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NoSuchCriterion(name) => write!(f, "the criteria method `{name}` does not exist"),
            Self::DuplicateCriterion(name) => write!(f, "criterion already registered: {name}"),
            Self::InvalidCriterionArgs { criterion, message } => {
                write!(f, "invalid arguments for criterion `{criterion}`: {message}")
            }
            Self::MissingRelations => write!(
                f,
                "no relationships defined for this repository; declare them on the model or set a related list"
            ),
            Self::UnknownRelation(name) => write!(f, "unknown relation: {name}"),
            Self::InvalidIdentifier(name) => write!(f, "invalid identifier: `{name}`"),
            Self::Conversion(message) => write!(f, "conversion failed: {message}"),
            Self::MissingMatchCondition => {
                write!(f, "no match condition specified; add at least one condition set")
            }
            Self::InvalidPagination(message) => write!(f, "invalid pagination: {message}"),
            Self::InvalidData(message) => write!(f, "invalid data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Key of a `get_list` map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListKey {
    Integer(i64),
    Text(String),
}

impl TryFrom<Value> for ListKey {
    type Error = RepoError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Integer(value) => Ok(Self::Integer(value)),
            Value::Text(value) => Ok(Self::Text(value)),
            other => Err(RepoError::Conversion(format!(
                "could not use a {} value as a list key",
                other.type_name()
            ))),
        }
    }
}

impl From<i64> for ListKey {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for ListKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Key/value listing returned by `get_list`.
pub type ListMap = BTreeMap<ListKey, Value>;

/// Result of `update`, shaped by how many rows matched.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// No row matched.
    None,
    /// Exactly one row matched; the re-read row.
    One(Record),
    /// Several rows matched; re-read rows in key order.
    Many(Vec<Record>),
}

impl UpdateOutcome {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Number of updated rows.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::One(_) => 1,
            Self::Many(records) => records.len(),
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::None => Vec::new(),
            Self::One(record) => vec![record],
            Self::Many(records) => records,
        }
    }
}

/// Repository contract over one model's table.
///
/// Reads consume pending criteria; writes start from a fresh query.
pub trait Repository: HasCriteria {
    /// Primary key column of the bound model.
    fn key_name(&self) -> &str;

    fn get_all(&mut self) -> RepoResult<Vec<Record>>;
    fn get_first(&mut self) -> RepoResult<Option<Record>>;
    fn paginate_all(&mut self, request: &PageRequest) -> RepoResult<Page<Record>>;

    /// Row whose key column equals `id`.
    fn get(&mut self, id: Value) -> RepoResult<Option<Record>>;
    fn get_by(&mut self, column: &str, value: Value) -> RepoResult<Vec<Record>>;
    fn paginate_by(
        &mut self,
        column: &str,
        value: Value,
        request: &PageRequest,
    ) -> RepoResult<Page<Record>>;

    /// Maps `key_column` to `value_column` across the selected rows.
    ///
    /// # Errors
    /// - `Conversion` when a key is `NULL`, real or blob.
    fn get_list(&mut self, value_column: &str, key_column: &str) -> RepoResult<ListMap>;

    fn exists(&mut self) -> RepoResult<bool>;

    /// `COUNT(column)`; `None` counts the key column.
    fn count(&mut self, column: Option<&str>) -> RepoResult<u64>;

    /// Inserts `data` and returns the stored row.
    fn create(&mut self, data: Record) -> RepoResult<Record>;

    /// Applies `data` to every row where `column = value`.
    fn update(&mut self, value: Value, data: &Record, column: &str) -> RepoResult<UpdateOutcome>;

    /// Deletes every row where `column = value`; returns the count.
    fn delete(&mut self, value: Value, column: &str) -> RepoResult<usize>;

    /// Updates the first row matching all `conditions` with `payload`, or
    /// inserts `conditions` merged with `payload`.
    fn upsert(&mut self, conditions: &Record, payload: &Record) -> RepoResult<Record>;

    fn update_or_create(&mut self) -> UpdateOrCreate<'_>;

    fn update_by_key(&mut self, value: Value, data: &Record) -> RepoResult<UpdateOutcome> {
        let key = self.key_name().to_string();
        self.update(value, data, &key)
    }

    fn delete_by_key(&mut self, value: Value) -> RepoResult<usize> {
        let key = self.key_name().to_string();
        self.delete(value, &key)
    }
}
