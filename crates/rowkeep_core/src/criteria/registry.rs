//! Name-keyed criterion dispatcher.
//!
//! # Responsibility
//! - Map a method name plus argument list onto a `Criterion`.
//! - Hold repository-defined handlers for `Criterion::Custom` entries.
//!
//! # Invariants
//! - Lookup order is the criterion tier, then the criteria tier.
//! - A name lives in at most one tier.
//! - Unknown names fail with `NoSuchCriterion`; they never no-op.

use crate::criteria::criterion::{Criterion, CriterionArg};
use crate::query::{Query, SortDirection};
use crate::repo::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

static CRITERION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid criterion name regex"));

/// Handler signature for repository-defined criteria.
pub type CriterionHandler =
    Arc<dyn Fn(Query, &[CriterionArg]) -> RepoResult<Query> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Only,
    Exclude,
    Limit,
    OrderBy,
    With,
    WithRelated,
}

const BUILTINS: &[(&str, Builtin)] = &[
    ("only", Builtin::Only),
    ("exclude", Builtin::Exclude),
    ("limit", Builtin::Limit),
    ("order_by", Builtin::OrderBy),
    ("with", Builtin::With),
    ("with_related", Builtin::WithRelated),
];

#[derive(Clone)]
enum Handler {
    Builtin(Builtin),
    Custom(CriterionHandler),
}

/// Two-tier registry of criterion implementations.
#[derive(Clone)]
pub struct CriteriaRegistry {
    criterion: BTreeMap<String, Handler>,
    criteria: BTreeMap<String, Handler>,
}

impl Default for CriteriaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for CriteriaRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriteriaRegistry")
            .field("criterion", &self.criterion.keys().collect::<Vec<_>>())
            .field("criteria", &self.criteria.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CriteriaRegistry {
    /// Registry with the built-in criteria in the criterion tier.
    pub fn new() -> Self {
        let criterion = BUILTINS
            .iter()
            .map(|(name, builtin)| (name.to_string(), Handler::Builtin(*builtin)))
            .collect();
        Self {
            criterion,
            criteria: BTreeMap::new(),
        }
    }

    /// Registers a handler in the criterion tier.
    pub fn register_criterion<F>(&mut self, name: &str, handler: F) -> RepoResult<()>
    where
        F: Fn(Query, &[CriterionArg]) -> RepoResult<Query> + Send + Sync + 'static,
    {
        let name = self.check_name(name)?;
        self.criterion.insert(name, Handler::Custom(Arc::new(handler)));
        Ok(())
    }

    /// Registers a handler in the criteria tier, consulted after the
    /// criterion tier.
    pub fn register_criteria<F>(&mut self, name: &str, handler: F) -> RepoResult<()>
    where
        F: Fn(Query, &[CriterionArg]) -> RepoResult<Query> + Send + Sync + 'static,
    {
        let name = self.check_name(name)?;
        self.criteria.insert(name, Handler::Custom(Arc::new(handler)));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Sorted names across both tiers.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .criterion
            .keys()
            .chain(self.criteria.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    /// Resolves a method call into a deferred `Criterion`.
    ///
    /// # Errors
    /// - `NoSuchCriterion` when neither tier knows `name`.
    /// - `InvalidCriterionArgs` when a built-in receives malformed arguments.
    pub fn resolve(&self, name: &str, args: Vec<CriterionArg>) -> RepoResult<Criterion> {
        match self.lookup(name) {
            Some(Handler::Builtin(builtin)) => build_builtin(*builtin, name, args),
            Some(Handler::Custom(_)) => Ok(Criterion::Custom {
                name: name.to_string(),
                args,
            }),
            None => Err(RepoError::NoSuchCriterion(name.to_string())),
        }
    }

    /// Returns the custom handler registered under `name`.
    pub fn handler(&self, name: &str) -> Option<&CriterionHandler> {
        match self.lookup(name)? {
            Handler::Custom(handler) => Some(handler),
            Handler::Builtin(_) => None,
        }
    }

    fn lookup(&self, name: &str) -> Option<&Handler> {
        self.criterion.get(name).or_else(|| self.criteria.get(name))
    }

    fn check_name(&self, name: &str) -> RepoResult<String> {
        let name = name.trim();
        if !CRITERION_NAME_RE.is_match(name) {
            return Err(RepoError::InvalidIdentifier(name.to_string()));
        }
        if self.contains(name) {
            return Err(RepoError::DuplicateCriterion(name.to_string()));
        }
        Ok(name.to_string())
    }
}

fn build_builtin(builtin: Builtin, name: &str, args: Vec<CriterionArg>) -> RepoResult<Criterion> {
    match builtin {
        Builtin::Only => Ok(Criterion::Only(names_from_args(name, args)?)),
        Builtin::Exclude => Ok(Criterion::Exclude(names_from_args(name, args)?)),
        Builtin::With => Ok(Criterion::With(names_from_args(name, args)?)),
        Builtin::Limit => match args.as_slice() {
            [CriterionArg::Integer(limit)] => u64::try_from(*limit)
                .map(Criterion::Limit)
                .map_err(|_| invalid_args(name, format!("limit must be >= 0, got {limit}"))),
            _ => Err(invalid_args(name, "expects exactly one integer argument")),
        },
        Builtin::OrderBy => match args.as_slice() {
            [CriterionArg::Text(column)] => Ok(Criterion::OrderBy(column.clone(), SortDirection::Asc)),
            [CriterionArg::Text(column), CriterionArg::Text(direction)] => {
                let direction = SortDirection::parse(direction).ok_or_else(|| {
                    invalid_args(name, format!("unsupported direction `{direction}`; expected asc|desc"))
                })?;
                Ok(Criterion::OrderBy(column.clone(), direction))
            }
            _ => Err(invalid_args(name, "expects a column and an optional direction")),
        },
        Builtin::WithRelated => {
            if args.is_empty() {
                Ok(Criterion::WithRelated)
            } else {
                Err(invalid_args(name, "takes no arguments"))
            }
        }
    }
}

/// Flattens variadic text arguments and list arguments into one name list.
fn names_from_args(name: &str, args: Vec<CriterionArg>) -> RepoResult<Vec<String>> {
    let mut names = Vec::new();
    for arg in args {
        match arg {
            CriterionArg::Text(value) => names.push(value),
            CriterionArg::List(values) => names.extend(values),
            CriterionArg::Integer(value) => {
                return Err(invalid_args(name, format!("expected names, got integer {value}")));
            }
        }
    }
    if names.is_empty() {
        return Err(invalid_args(name, "expects at least one name"));
    }
    Ok(names)
}

fn invalid_args(name: &str, message: impl Into<String>) -> RepoError {
    RepoError::InvalidCriterionArgs {
        criterion: name.to_string(),
        message: message.into(),
    }
}
