//! Deferred query transforms.
//!
//! # Responsibility
//! - Capture one criterion call (kind plus arguments) as inspectable data.
//! - Evaluate the captured call against a `Query` when the list is applied.
//!
//! # Invariants
//! - Built-in variants carry already-validated arguments.
//! - `Custom` entries are evaluated by the handler registered under `name`.

use crate::criteria::registry::CriteriaRegistry;
use crate::db::SchemaSource;
use crate::query::{Query, SortDirection};
use crate::repo::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};

/// Call-site argument captured for a criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionArg {
    Integer(i64),
    Text(String),
    List(Vec<String>),
}

impl From<i64> for CriterionArg {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for CriterionArg {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for CriterionArg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CriterionArg {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for CriterionArg {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for CriterionArg {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

/// One deferred query transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "args", rename_all = "snake_case")]
pub enum Criterion {
    /// Select only these columns.
    Only(Vec<String>),
    /// Select every table column except these.
    Exclude(Vec<String>),
    Limit(u64),
    OrderBy(String, SortDirection),
    /// Eager-load these relations.
    With(Vec<String>),
    /// Eager-load the repository's related list.
    WithRelated,
    /// Repository-defined criterion resolved through the registry.
    Custom {
        name: String,
        args: Vec<CriterionArg>,
    },
}

/// Collaborators a criterion may need while being applied.
pub struct CriteriaContext<'a> {
    /// Relations used by `WithRelated`.
    pub related: &'a [String],
    pub registry: &'a CriteriaRegistry,
    /// Column listing used by `Exclude`.
    pub schema: &'a dyn SchemaSource,
}

impl Criterion {
    /// Dispatch name of this criterion.
    pub fn name(&self) -> &str {
        match self {
            Self::Only(_) => "only",
            Self::Exclude(_) => "exclude",
            Self::Limit(_) => "limit",
            Self::OrderBy(_, _) => "order_by",
            Self::With(_) => "with",
            Self::WithRelated => "with_related",
            Self::Custom { name, .. } => name.as_str(),
        }
    }

    pub fn apply(&self, query: Query, ctx: &CriteriaContext<'_>) -> RepoResult<Query> {
        match self {
            Self::Only(columns) => {
                if columns.is_empty() {
                    return Err(empty_selection("only"));
                }
                Ok(query.select(columns.iter().cloned()))
            }
            Self::Exclude(columns) => {
                let all_columns = ctx.schema.list_columns(query.table())?;
                if all_columns.is_empty() {
                    return Err(RepoError::InvalidData(format!(
                        "table `{}` has no columns to select from",
                        query.table()
                    )));
                }
                let remaining: Vec<String> = all_columns
                    .into_iter()
                    .filter(|column| !columns.contains(column))
                    .collect();
                if remaining.is_empty() {
                    return Err(empty_selection("exclude"));
                }
                Ok(query.select(remaining))
            }
            Self::Limit(limit) => Ok(query.limit(*limit)),
            Self::OrderBy(column, direction) => Ok(query.order_by(column.clone(), *direction)),
            Self::With(relations) => Ok(query.with(relations.iter().cloned())),
            Self::WithRelated => {
                if ctx.related.is_empty() {
                    return Err(RepoError::MissingRelations);
                }
                Ok(query.with(ctx.related.iter().cloned()))
            }
            Self::Custom { name, args } => {
                let handler = ctx
                    .registry
                    .handler(name)
                    .ok_or_else(|| RepoError::NoSuchCriterion(name.clone()))?;
                (**handler)(query, args.as_slice())
            }
        }
    }
}

fn empty_selection(criterion: &str) -> RepoError {
    RepoError::InvalidCriterionArgs {
        criterion: criterion.to_string(),
        message: "leaves no columns to select".to_string(),
    }
}
