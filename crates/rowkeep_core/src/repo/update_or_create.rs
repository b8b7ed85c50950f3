//! Batch update-or-create helper.
//!
//! # Responsibility
//! - Collect match-condition sets, then run one upsert per set.
//!
//! # Invariants
//! - `set` consumes the helper; it cannot run twice.
//! - Upserts run in the order the condition sets were added.
//! - `set` without any condition set fails before touching storage.

use crate::model::Record;
use crate::repo::{RepoError, RepoResult, Repository};
use log::debug;

/// Result of `UpdateOrCreate::set`.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// One condition set was given.
    Single(Record),
    /// Several condition sets were given; rows in condition order.
    Many(Vec<Record>),
}

impl UpsertOutcome {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::Single(record) => vec![record],
            Self::Many(records) => records,
        }
    }
}

/// Accumulates condition sets for one shared payload.
///
/// ```ignore
/// let outcome = repo
///     .update_or_create()
///     .matching(Record::from([("email", "a@example.com")]))
///     .or_matching(Record::from([("email", "b@example.com")]))
///     .set(Record::from([("active", 1)]))?;
/// ```
pub struct UpdateOrCreate<'r> {
    repository: &'r mut dyn Repository,
    conditions: Vec<Record>,
}

impl<'r> UpdateOrCreate<'r> {
    pub fn new(repository: &'r mut dyn Repository) -> Self {
        Self {
            repository,
            conditions: Vec::new(),
        }
    }

    /// Adds one condition set; all of its columns must match.
    pub fn matching(mut self, conditions: Record) -> Self {
        self.conditions.push(conditions);
        self
    }

    /// Alias for `matching`.
    pub fn or_matching(self, conditions: Record) -> Self {
        self.matching(conditions)
    }

    pub fn conditions(&self) -> &[Record] {
        &self.conditions
    }

    /// Runs one upsert per condition set with `payload`.
    ///
    /// # Errors
    /// - `MissingMatchCondition` when no condition set was added.
    /// - Storage errors from the first failing upsert; earlier upserts stay
    ///   applied.
    pub fn set(self, payload: Record) -> RepoResult<UpsertOutcome> {
        let Self {
            repository,
            mut conditions,
        } = self;

        if conditions.is_empty() {
            return Err(RepoError::MissingMatchCondition);
        }

        debug!(
            "event=update_or_create module=repo status=start condition_sets={}",
            conditions.len()
        );

        if conditions.len() == 1 {
            let only = conditions.remove(0);
            return repository.upsert(&only, &payload).map(UpsertOutcome::Single);
        }

        let records = conditions
            .iter()
            .map(|condition| repository.upsert(condition, &payload))
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(UpsertOutcome::Many(records))
    }
}
