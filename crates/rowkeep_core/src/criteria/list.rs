use crate::criteria::criterion::{CriteriaContext, Criterion};
use crate::query::Query;
use crate::repo::RepoResult;
use serde::Serialize;

/// Ordered queue of deferred criteria.
///
/// Insertion order is application order. Entries are not deduplicated.
/// `apply` drains the list unless remembering is enabled; a failing entry
/// leaves the list untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CriteriaList {
    items: Vec<Criterion>,
    remember: bool,
}

impl CriteriaList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, criterion: Criterion) {
        self.items.push(criterion);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn set_remember(&mut self, remember: bool) {
        self.remember = remember;
    }

    pub fn is_remembering(&self) -> bool {
        self.remember
    }

    pub fn as_slice(&self) -> &[Criterion] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Folds every criterion left-to-right over `query`.
    pub fn apply(&mut self, query: Query, ctx: &CriteriaContext<'_>) -> RepoResult<Query> {
        let query = self
            .items
            .iter()
            .try_fold(query, |query, criterion| criterion.apply(query, ctx))?;

        if !self.remember {
            self.items.clear();
        }

        Ok(query)
    }
}
