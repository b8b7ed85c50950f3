//! Deferred query criteria and their name-based dispatch.
//!
//! # Responsibility
//! - Define `Criterion` values and the ordered `CriteriaList`.
//! - Resolve dynamic method names through `CriteriaRegistry`.
//! - Expose the criteria contract (`HasCriteria`) and typed fluent helpers
//!   (`BasicCriteria`) shared by every repository.
//!
//! # Invariants
//! - Criteria are data until applied; adding one never touches the database.
//! - Applying drains the list unless remembering is enabled.

pub mod criterion;
pub mod list;
pub mod registry;

pub use criterion::{CriteriaContext, Criterion, CriterionArg};
pub use list::CriteriaList;
pub use registry::{CriteriaRegistry, CriterionHandler};

use crate::query::{Query, SortDirection};
use crate::repo::RepoResult;
use log::warn;

/// Criteria contract implemented by repositories.
///
/// Object safe, so `dyn Repository` callers can still add criteria through
/// `call`.
pub trait HasCriteria {
    fn criteria_list(&self) -> &CriteriaList;
    fn criteria_list_mut(&mut self) -> &mut CriteriaList;
    fn criteria_registry(&self) -> &CriteriaRegistry;

    /// Folds the pending criteria over `query`.
    fn apply_criteria(&mut self, query: Query) -> RepoResult<Query>;

    fn criteria(&self) -> &[Criterion] {
        self.criteria_list().as_slice()
    }

    fn add_criterion(&mut self, criterion: Criterion) {
        self.criteria_list_mut().push(criterion);
    }

    fn add_criteria(&mut self, criterion: Criterion) {
        self.add_criterion(criterion);
    }

    fn clear_criteria(&mut self) {
        self.criteria_list_mut().clear();
    }

    /// Keeps criteria across queries when `true`.
    fn remember_criteria(&mut self, remember: bool) {
        self.criteria_list_mut().set_remember(remember);
    }

    /// Resolves `method` through the registry and queues the result.
    ///
    /// # Errors
    /// - `NoSuchCriterion` when no handler is registered under `method`.
    /// - `InvalidCriterionArgs` for malformed built-in arguments.
    fn call(&mut self, method: &str, args: Vec<CriterionArg>) -> RepoResult<()> {
        let criterion = match self.criteria_registry().resolve(method, args) {
            Ok(criterion) => criterion,
            Err(err) => {
                warn!(
                    "event=criteria_dispatch module=criteria status=error method={} error={}",
                    method, err
                );
                return Err(err);
            }
        };
        self.add_criterion(criterion);
        Ok(())
    }
}

/// Typed fluent helpers over `HasCriteria`.
///
/// ```ignore
/// let rows = repo.order_by("attribute2").limit(2).get_all()?;
/// ```
pub trait BasicCriteria: HasCriteria {
    fn only<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_criterion(Criterion::Only(collect_names(columns)));
        self
    }

    fn exclude<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_criterion(Criterion::Exclude(collect_names(columns)));
        self
    }

    fn limit(&mut self, limit: u64) -> &mut Self {
        self.add_criterion(Criterion::Limit(limit));
        self
    }

    fn order_by(&mut self, column: &str) -> &mut Self {
        self.add_criterion(Criterion::OrderBy(column.to_string(), SortDirection::Asc));
        self
    }

    fn order_by_desc(&mut self, column: &str) -> &mut Self {
        self.add_criterion(Criterion::OrderBy(column.to_string(), SortDirection::Desc));
        self
    }

    fn with<I, S>(&mut self, relations: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_criterion(Criterion::With(collect_names(relations)));
        self
    }

    fn with_related(&mut self) -> &mut Self {
        self.add_criterion(Criterion::WithRelated);
        self
    }
}

impl<T: HasCriteria + ?Sized> BasicCriteria for T {}

fn collect_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}
