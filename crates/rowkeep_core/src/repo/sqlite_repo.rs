//! SQLite-backed repository.
//!
//! # Responsibility
//! - Implement `Repository` for any `Model` over a borrowed connection.
//! - Own the criteria list, the criteria registry and the related list.
//! - Eager-load declared relations after the parent rows are fetched.
//!
//! # Invariants
//! - Every read starts from `Query::new(M::table())` plus pending criteria.
//! - Writes filter payloads through `Model::fillable()` when it is non-empty.
//! - Rows returned from writes are re-read from storage.

use crate::config::RepositoryConfig;
use crate::criteria::{CriteriaContext, CriteriaList, CriteriaRegistry, CriterionArg, HasCriteria};
use crate::model::{Model, Record, Related, RelationKind, Value};
use crate::query::{quote_identifier, Page, PageRequest, Query, SortDirection};
use crate::repo::{
    ListKey, ListMap, RepoError, RepoResult, Repository, UpdateOrCreate, UpdateOutcome,
};
use log::debug;
use rusqlite::{params_from_iter, Connection};
use std::marker::PhantomData;

/// Repository for model `M` over a migrated SQLite connection.
pub struct SqliteRepository<'conn, M: Model> {
    conn: &'conn Connection,
    criteria: CriteriaList,
    registry: CriteriaRegistry,
    related: Vec<String>,
    page_name: String,
    _model: PhantomData<fn() -> M>,
}

impl<'conn, M: Model> SqliteRepository<'conn, M> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_config(conn, &RepositoryConfig::default())
    }

    pub fn with_config(conn: &'conn Connection, config: &RepositoryConfig) -> Self {
        let mut criteria = CriteriaList::new();
        criteria.set_remember(config.remember_criteria);
        Self {
            conn,
            criteria,
            registry: CriteriaRegistry::new(),
            related: M::relations()
                .iter()
                .map(|relation| relation.name.to_string())
                .collect(),
            page_name: config.page_name.clone(),
            _model: PhantomData,
        }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Relations eager-loaded by `with_related`.
    pub fn related(&self) -> &[String] {
        &self.related
    }

    /// Replaces the related list (defaults to every relation on the model).
    pub fn set_related<I, S>(&mut self, relations: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related = relations.into_iter().map(Into::into).collect();
        self
    }

    /// Registers a repository-specific criterion, reachable through `call`.
    pub fn register_criterion<F>(&mut self, name: &str, handler: F) -> RepoResult<()>
    where
        F: Fn(Query, &[CriterionArg]) -> RepoResult<Query> + Send + Sync + 'static,
    {
        self.registry.register_criterion(name, handler)
    }

    /// Registers a handler in the fallback tier, consulted after criterion
    /// handlers.
    pub fn register_criteria<F>(&mut self, name: &str, handler: F) -> RepoResult<()>
    where
        F: Fn(Query, &[CriterionArg]) -> RepoResult<Query> + Send + Sync + 'static,
    {
        self.registry.register_criteria(name, handler)
    }

    /// Fresh query on the model's table with pending criteria applied.
    fn select(&mut self) -> RepoResult<Query> {
        self.apply_criteria(Query::new(M::table()))
    }

    fn fetch(&self, query: &Query) -> RepoResult<Vec<Record>> {
        let (sql, params) = query.to_select_sql()?;
        let mut records = self.load_rows(&sql, &params)?;
        if !query.eager_loads().is_empty() {
            self.eager_load(&mut records, query.eager_loads())?;
        }
        debug!(
            "event=repo_read module=repo status=ok table={} rows={} eager={}",
            M::table(),
            records.len(),
            query.eager_loads().len()
        );
        Ok(records)
    }

    fn fetch_first(&self, query: Query) -> RepoResult<Option<Record>> {
        Ok(self.fetch(&query.limit(1))?.into_iter().next())
    }

    fn load_rows(&self, sql: &str, params: &[Value]) -> RepoResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (index, column) in columns.iter().enumerate() {
                record.set(column.as_str(), Value::from(row.get_ref(index)?));
            }
            records.push(record);
        }

        Ok(records)
    }

    fn count_query(&self, query: &Query, column: &str) -> RepoResult<u64> {
        let (sql, params) = query.to_count_sql(column)?;
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        count_to_u64(count)
    }

    fn paginate(&self, query: Query, request: &PageRequest) -> RepoResult<Page<Record>> {
        let per_page = request.per_page.unwrap_or_else(M::per_page);
        if per_page == 0 {
            return Err(RepoError::InvalidPagination(
                "per_page must be greater than zero".to_string(),
            ));
        }
        let current_page = request.current_page();
        if (current_page - 1).checked_mul(per_page).is_none() {
            return Err(RepoError::InvalidPagination(format!(
                "page {current_page} with per_page {per_page} is out of range"
            )));
        }
        let total = self.count_query(&query, "*")?;
        let items = self.fetch(&query.for_page(current_page, per_page))?;
        let page_name = if request.page_name.trim().is_empty() {
            self.page_name.as_str()
        } else {
            request.page_name.as_str()
        };
        Ok(Page::new(items, current_page, per_page, total, page_name))
    }

    fn eager_load(&self, records: &mut [Record], relations: &[String]) -> RepoResult<()> {
        for name in relations {
            let relation = M::relation(name).ok_or_else(|| RepoError::UnknownRelation(name.clone()))?;

            // Parent column holding the value the related rows are matched on.
            let (parent_column, related_column) = match relation.kind {
                RelationKind::HasOne | RelationKind::HasMany => {
                    (relation.local_key, relation.foreign_key)
                }
                RelationKind::BelongsTo => (relation.foreign_key, relation.local_key),
            };

            let mut keys: Vec<Value> = Vec::new();
            for record in records.iter() {
                if let Some(value) = record.get(parent_column).filter(|value| !value.is_null()) {
                    if !keys.contains(value) {
                        keys.push(value.clone());
                    }
                }
            }
            let related_rows = self.load_related(relation.related_table, related_column, &keys)?;

            for record in records.iter_mut() {
                let matched: Vec<Record> = match record.get(parent_column) {
                    Some(value) if !value.is_null() => related_rows
                        .iter()
                        .filter(|row| row.get(related_column) == Some(value))
                        .cloned()
                        .collect(),
                    _ => Vec::new(),
                };
                let related = match relation.kind {
                    RelationKind::HasMany => Related::Many(matched),
                    RelationKind::HasOne | RelationKind::BelongsTo => {
                        Related::One(matched.into_iter().next().map(Box::new))
                    }
                };
                record.set_relation(relation.name, related);
            }
        }
        Ok(())
    }

    fn load_related(&self, table: &str, column: &str, keys: &[Value]) -> RepoResult<Vec<Record>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "SELECT * FROM {} WHERE {} IN ({placeholders})",
            quote_identifier(table)?,
            quote_identifier(column)?
        );
        self.load_rows(&sql, keys)
    }

    fn find_by_key(&self, key_value: Value) -> RepoResult<Option<Record>> {
        let query = Query::new(M::table()).where_eq(M::key_name(), key_value);
        let (sql, params) = query.limit(1).to_select_sql()?;
        Ok(self.load_rows(&sql, &params)?.into_iter().next())
    }

    fn fillable_payload(&self, data: &Record) -> Record {
        let fillable = M::fillable();
        let mut payload = data.clone();
        if fillable.is_empty() {
            return payload;
        }
        payload.retain_columns(|column| fillable.iter().any(|allowed| *allowed == column));
        if payload.len() != data.len() {
            debug!(
                "event=mass_assignment module=repo status=filtered table={} dropped={}",
                M::table(),
                data.len() - payload.len()
            );
        }
        payload
    }

    fn insert(&self, data: &Record) -> RepoResult<Record> {
        let table = quote_identifier(M::table())?;
        if data.is_empty() {
            self.conn
                .execute(&format!("INSERT INTO {table} DEFAULT VALUES"), [])?;
        } else {
            let columns = data
                .columns()
                .map(quote_identifier)
                .collect::<RepoResult<Vec<_>>>()?;
            let placeholders = vec!["?"; columns.len()].join(", ");
            let sql = format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders})",
                columns.join(", ")
            );
            self.conn
                .execute(&sql, params_from_iter(data.iter().map(|(_, value)| value)))?;
        }

        let rowid = self.conn.last_insert_rowid();
        let record = self.find_by_rowid(rowid)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted row {rowid} not found in {}", M::table()))
        })?;
        debug!(
            "event=repo_create module=repo status=ok table={} rowid={}",
            M::table(),
            rowid
        );
        Ok(record)
    }

    fn find_by_rowid(&self, rowid: i64) -> RepoResult<Option<Record>> {
        let sql = format!("SELECT * FROM {} WHERE rowid = ?", quote_identifier(M::table())?);
        Ok(self.load_rows(&sql, &[Value::Integer(rowid)])?.into_iter().next())
    }

    /// Rowids of the rows matched by `query`, in query order.
    fn matching_rowids(&self, query: Query) -> RepoResult<Vec<i64>> {
        let (sql, params) = query.select(["rowid"]).to_select_sql()?;
        let mut stmt = self.conn.prepare(&sql)?;
        let rowids = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rowids)
    }

    fn update_row(&self, rowid: i64, payload: &Record) -> RepoResult<()> {
        if payload.is_empty() {
            return Ok(());
        }
        let assignments = payload
            .columns()
            .map(|column| quote_identifier(column).map(|quoted| format!("{quoted} = ?")))
            .collect::<RepoResult<Vec<_>>>()?;
        let sql = format!(
            "UPDATE {} SET {} WHERE rowid = ?",
            quote_identifier(M::table())?,
            assignments.join(", ")
        );
        let rowid = Value::Integer(rowid);
        let params = payload
            .iter()
            .map(|(_, value)| value)
            .chain(std::iter::once(&rowid));
        self.conn.execute(&sql, params_from_iter(params))?;
        Ok(())
    }

    /// Re-reads a row after `payload` was written to it.
    ///
    /// A payload that sets the key column may also move the rowid (integer
    /// primary keys alias it), so the new key wins over the old rowid.
    fn reload(&self, rowid: i64, payload: &Record) -> RepoResult<Record> {
        let record = match payload.get(M::key_name()) {
            Some(key_value) => self.find_by_key(key_value.clone())?,
            None => self.find_by_rowid(rowid)?,
        };
        record.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "updated row {rowid} not found in {}",
                M::table()
            ))
        })
    }
}

fn count_to_u64(count: i64) -> RepoResult<u64> {
    u64::try_from(count)
        .map_err(|_| RepoError::Conversion(format!("COUNT returned negative value {count}")))
}

impl<M: Model> HasCriteria for SqliteRepository<'_, M> {
    fn criteria_list(&self) -> &CriteriaList {
        &self.criteria
    }

    fn criteria_list_mut(&mut self) -> &mut CriteriaList {
        &mut self.criteria
    }

    fn criteria_registry(&self) -> &CriteriaRegistry {
        &self.registry
    }

    fn apply_criteria(&mut self, query: Query) -> RepoResult<Query> {
        let ctx = CriteriaContext {
            related: &self.related,
            registry: &self.registry,
            schema: self.conn,
        };
        self.criteria.apply(query, &ctx)
    }
}

impl<M: Model> Repository for SqliteRepository<'_, M> {
    fn key_name(&self) -> &str {
        M::key_name()
    }

    fn get_all(&mut self) -> RepoResult<Vec<Record>> {
        let query = self.select()?;
        self.fetch(&query)
    }

    fn get_first(&mut self) -> RepoResult<Option<Record>> {
        let query = self.select()?;
        self.fetch_first(query)
    }

    fn paginate_all(&mut self, request: &PageRequest) -> RepoResult<Page<Record>> {
        let query = self.select()?;
        self.paginate(query, request)
    }

    fn get(&mut self, id: Value) -> RepoResult<Option<Record>> {
        let query = self.select()?.where_eq(M::key_name(), id);
        self.fetch_first(query)
    }

    fn get_by(&mut self, column: &str, value: Value) -> RepoResult<Vec<Record>> {
        let query = self.select()?.where_eq(column, value);
        self.fetch(&query)
    }

    fn paginate_by(
        &mut self,
        column: &str,
        value: Value,
        request: &PageRequest,
    ) -> RepoResult<Page<Record>> {
        let query = self.select()?.where_eq(column, value);
        self.paginate(query, request)
    }

    fn get_list(&mut self, value_column: &str, key_column: &str) -> RepoResult<ListMap> {
        let query = self.select()?.select([value_column, key_column]);
        let (sql, params) = query.to_select_sql()?;
        let mut list = ListMap::new();
        for record in self.load_rows(&sql, &params)? {
            let key = record.get(key_column).cloned().unwrap_or(Value::Null);
            let value = record.get(value_column).cloned().unwrap_or(Value::Null);
            list.insert(ListKey::try_from(key)?, value);
        }
        Ok(list)
    }

    fn exists(&mut self) -> RepoResult<bool> {
        let (sql, params) = self.select()?.to_exists_sql()?;
        let exists: i64 = self
            .conn
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(exists != 0)
    }

    fn count(&mut self, column: Option<&str>) -> RepoResult<u64> {
        let column = match column.unwrap_or(M::key_name()) {
            "" => "*",
            column => column,
        };
        let query = self.select()?;
        self.count_query(&query, column)
    }

    fn create(&mut self, data: Record) -> RepoResult<Record> {
        let payload = self.fillable_payload(&data);
        self.insert(&payload)
    }

    fn update(&mut self, value: Value, data: &Record, column: &str) -> RepoResult<UpdateOutcome> {
        let key = M::key_name();
        let rowids = self.matching_rowids(
            Query::new(M::table())
                .where_eq(column, value)
                .order_by(key, SortDirection::Asc),
        )?;

        let payload = self.fillable_payload(data);
        let mut updated = Vec::with_capacity(rowids.len());
        for rowid in rowids {
            self.update_row(rowid, &payload)?;
            updated.push(self.reload(rowid, &payload)?);
        }

        debug!(
            "event=repo_update module=repo status=ok table={} column={} rows={}",
            M::table(),
            column,
            updated.len()
        );

        Ok(match updated.len() {
            0 => UpdateOutcome::None,
            1 => UpdateOutcome::One(updated.remove(0)),
            _ => UpdateOutcome::Many(updated),
        })
    }

    fn delete(&mut self, value: Value, column: &str) -> RepoResult<usize> {
        let (sql, params) = Query::new(M::table())
            .where_eq(column, value)
            .to_delete_sql()?;
        let deleted = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        debug!(
            "event=repo_delete module=repo status=ok table={} column={} rows={}",
            M::table(),
            column,
            deleted
        );
        Ok(deleted)
    }

    fn upsert(&mut self, conditions: &Record, payload: &Record) -> RepoResult<Record> {
        let query = conditions
            .iter()
            .fold(Query::new(M::table()), |query, (column, value)| {
                query.where_eq(column, value.clone())
            });
        let existing = self.matching_rowids(query.limit(1))?.into_iter().next();

        match existing {
            Some(rowid) => {
                let payload = self.fillable_payload(payload);
                self.update_row(rowid, &payload)?;
                self.reload(rowid, &payload)
            }
            None => {
                let mut attributes = conditions.clone();
                attributes.merge(payload);
                self.insert(&self.fillable_payload(&attributes))
            }
        }
    }

    fn update_or_create(&mut self) -> UpdateOrCreate<'_> {
        UpdateOrCreate::new(self)
    }
}
