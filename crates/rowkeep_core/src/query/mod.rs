//! Query primitive consumed by repositories and criteria.
//!
//! # Responsibility
//! - Accumulate select/where/order/eager/limit constraints as plain data.
//! - Render constraints to parameterized SQLite statements.
//!
//! # Invariants
//! - Values are always bound parameters, never spliced into SQL text.
//! - Identifiers are validated and double-quoted before rendering.
//! - Building a query has no side effects; only repositories execute SQL.

pub mod page;

use crate::model::Value;
use crate::repo::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use page::{Page, PageRequest};

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("valid identifier regex")
});

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parses `asc`/`desc`, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Comparison operator for one `WHERE` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl Operator {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
        }
    }
}

/// One `column <op> value` condition; conditions are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Operator,
    pub value: Value,
}

/// Fluent, side-effect free query description for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    columns: Option<Vec<String>>,
    conditions: Vec<Condition>,
    order: Vec<(String, SortDirection)>,
    eager: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Query {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: None,
            conditions: Vec::new(),
            order: Vec::new(),
            eager: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Replaces the selected column list.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn where_op(
        mut self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_op(column, Operator::Eq, value)
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    /// Adds relations to eager-load; names already present are kept once.
    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for relation in relations {
            let relation = relation.into();
            if !self.eager.contains(&relation) {
                self.eager.push(relation);
            }
        }
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Constrains the query to one 1-based page.
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        let page = page.max(1);
        self.offset((page - 1).saturating_mul(per_page)).limit(per_page)
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn orders(&self) -> &[(String, SortDirection)] {
        &self.order
    }

    pub fn eager_loads(&self) -> &[String] {
        &self.eager
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    /// Renders `SELECT <columns> FROM <table> ...` with bind values.
    pub fn to_select_sql(&self) -> RepoResult<(String, Vec<Value>)> {
        let columns = match self.columns.as_deref() {
            None => "*".to_string(),
            Some([]) => "*".to_string(),
            Some(columns) => columns
                .iter()
                .map(|column| quote_column(column))
                .collect::<RepoResult<Vec<_>>>()?
                .join(", "),
        };

        let mut sql = format!("SELECT {columns} FROM {}", quote_identifier(&self.table)?);
        let mut params = Vec::new();
        self.append_where(&mut sql, &mut params)?;
        self.append_order(&mut sql)?;
        self.append_limit_offset(&mut sql, &mut params);
        Ok((sql, params))
    }

    /// Renders `SELECT COUNT(<column>)`; ordering and limits are ignored.
    pub fn to_count_sql(&self, column: &str) -> RepoResult<(String, Vec<Value>)> {
        let target = quote_column(column)?;
        let mut sql = format!(
            "SELECT COUNT({target}) FROM {}",
            quote_identifier(&self.table)?
        );
        let mut params = Vec::new();
        self.append_where(&mut sql, &mut params)?;
        Ok((sql, params))
    }

    /// Renders `SELECT EXISTS(...)` over the current conditions.
    pub fn to_exists_sql(&self) -> RepoResult<(String, Vec<Value>)> {
        let mut inner = format!("SELECT 1 FROM {}", quote_identifier(&self.table)?);
        let mut params = Vec::new();
        self.append_where(&mut inner, &mut params)?;
        Ok((format!("SELECT EXISTS({inner})"), params))
    }

    /// Renders `DELETE FROM <table> WHERE ...`.
    pub fn to_delete_sql(&self) -> RepoResult<(String, Vec<Value>)> {
        let mut sql = format!("DELETE FROM {}", quote_identifier(&self.table)?);
        let mut params = Vec::new();
        self.append_where(&mut sql, &mut params)?;
        Ok((sql, params))
    }

    fn append_where(&self, sql: &mut String, params: &mut Vec<Value>) -> RepoResult<()> {
        for (index, condition) in self.conditions.iter().enumerate() {
            sql.push_str(if index == 0 { " WHERE " } else { " AND " });
            let column = quote_column(&condition.column)?;
            match (condition.op, condition.value.is_null()) {
                (Operator::Eq, true) => sql.push_str(&format!("{column} IS NULL")),
                (Operator::NotEq, true) => sql.push_str(&format!("{column} IS NOT NULL")),
                (op, _) => {
                    sql.push_str(&format!("{column} {} ?", op.as_sql()));
                    params.push(condition.value.clone());
                }
            }
        }
        Ok(())
    }

    fn append_order(&self, sql: &mut String) -> RepoResult<()> {
        if self.order.is_empty() {
            return Ok(());
        }
        let parts = self
            .order
            .iter()
            .map(|(column, direction)| {
                quote_column(column).map(|quoted| format!("{quoted} {}", direction.as_sql()))
            })
            .collect::<RepoResult<Vec<_>>>()?;
        sql.push_str(" ORDER BY ");
        sql.push_str(&parts.join(", "));
        Ok(())
    }

    fn append_limit_offset(&self, sql: &mut String, params: &mut Vec<Value>) {
        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ?");
                params.push(Value::Integer(to_sql_int(limit)));
                if let Some(offset) = offset.filter(|offset| *offset > 0) {
                    sql.push_str(" OFFSET ?");
                    params.push(Value::Integer(to_sql_int(offset)));
                }
            }
            (None, Some(offset)) if offset > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                params.push(Value::Integer(to_sql_int(offset)));
            }
            (None, _) => {}
        }
    }
}

/// Validates and double-quotes a table or column name (`a` or `t.a`).
pub(crate) fn quote_identifier(name: &str) -> RepoResult<String> {
    if !IDENTIFIER_RE.is_match(name) {
        return Err(RepoError::InvalidIdentifier(name.to_string()));
    }
    Ok(name
        .split('.')
        .map(|part| format!("\"{part}\""))
        .collect::<Vec<_>>()
        .join("."))
}

/// Like `quote_identifier`, but passes the `*` wildcard through.
pub(crate) fn quote_column(name: &str) -> RepoResult<String> {
    if name == "*" {
        return Ok("*".to_string());
    }
    quote_identifier(name)
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
