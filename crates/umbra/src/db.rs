//! The database facade.
//!
//! A [`Db`] binds a verified schema to one connection. Every public
//! operation acquires the fair connection lock once and holds it for the
//! operation's full duration, so multi-statement commands never interleave
//! even though the engine provides no cross-statement isolation. Internal
//! composition happens on `*_locked` helpers taking the guarded state, which
//! makes re-entrant acquisition impossible by construction.

use crate::observer::{ChangeEvent, Observer, ObserverId, ObserverRegistry};
use crate::query::TableQuery;

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use umbra_core::driver::{Connection, Rows, SqlStatement};
use umbra_core::schema::{Schema, Table};
use umbra_core::stmt::{Condition, Query, Row, Value};
use umbra_core::{err, Result};
use umbra_sql::{decode_row, Compiler};

/// Configures and creates a [`Db`].
pub struct Builder {
    max_batch_size: usize,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            max_batch_size: 1024,
        }
    }
}

impl Builder {
    /// Maximum rows per engine transaction in bulk writes.
    pub fn max_batch_size(mut self, max_batch_size: usize) -> Self {
        assert!(max_batch_size > 0, "max_batch_size must be non-zero");
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn build(self, schema: Schema, connection: impl Connection) -> Db {
        Db {
            schema: Arc::new(schema),
            state: Arc::new(Mutex::new(State {
                connection: Box::new(connection),
                observers: ObserverRegistry::new(),
            })),
            max_batch_size: self.max_batch_size,
        }
    }
}

/// A handle to one umbra database. Cloning shares the connection and the
/// observer registry.
#[derive(Clone)]
pub struct Db {
    schema: Arc<Schema>,
    state: Arc<Mutex<State>>,
    max_batch_size: usize,
}

struct State {
    connection: Box<dyn Connection>,
    observers: ObserverRegistry,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn new(schema: Schema, connection: impl Connection) -> Db {
        Builder::default().build(schema, connection)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Creates the schema's main and shadow tables if they do not exist.
    pub async fn create_tables(&self) -> Result<()> {
        let statements = Compiler::new(&self.schema).create_tables()?;

        let mut state = self.state.lock().await;
        for statement in &statements {
            state.connection.execute(statement).await?;
        }
        info!(tables = self.schema.tables.len(), "created tables");
        Ok(())
    }

    /// Starts a fluent query against `table`.
    pub fn from_table(&self, table: impl Into<String>) -> TableQuery {
        TableQuery::new(self.clone(), table)
    }

    /// Executes a query descriptor, returning decoded rows.
    pub async fn select(&self, query: &Query) -> Result<Vec<Row>> {
        let table = self.schema.table(&query.table)?;
        let statement = Compiler::new(&self.schema).select(query)?;
        debug!(table = %table.name, "select");

        let mut state = self.state.lock().await;
        let rows = Self::query_locked(&mut state, &statement).await?;
        rows.into_iter().map(|row| decode_row(table, row)).collect()
    }

    /// Executes a query capped at one row.
    pub async fn select_one(&self, query: &Query) -> Result<Option<Row>> {
        let mut query = query.clone();
        query.limit = Some(1);
        Ok(self.select(&query).await?.into_iter().next())
    }

    pub async fn exists(&self, query: &Query) -> Result<bool> {
        Ok(self.select_one(query).await?.is_some())
    }

    /// Fetches rows by primary key, in no guaranteed order.
    pub async fn select_by_primary_keys(&self, table: &str, keys: &[Value]) -> Result<Vec<Row>> {
        let table = self.schema.table(table)?;
        let statement = Compiler::new(&self.schema).select_by_primary_keys(&table.name, keys)?;

        let mut state = self.state.lock().await;
        let rows = Self::query_locked(&mut state, &statement).await?;
        rows.into_iter().map(|row| decode_row(table, row)).collect()
    }

    /// Replaces each foreign-key value with the resolved target row.
    ///
    /// One batched lookup is issued per distinct foreign-key column. Rows
    /// whose key cannot be resolved, including null keys, are dropped.
    pub async fn resolve_foreign_keys(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        let table = self.schema.table(table)?;
        let foreign_keys: Vec<(&str, &Table)> = table
            .foreign_keys()
            .map(|(column, target)| Ok((column, self.schema.table(target)?)))
            .collect::<Result<_>>()?;
        if foreign_keys.is_empty() || rows.is_empty() {
            return Ok(rows);
        }
        debug!(table = %table.name, rows = rows.len(), "resolve foreign keys");

        let compiler = Compiler::new(&self.schema);
        let mut state = self.state.lock().await;

        // One key → row lookup per FK column. Keys are numbers or strings,
        // so a linear scan over the distinct set is fine.
        let mut lookups: Vec<Vec<(Value, Row)>> = Vec::with_capacity(foreign_keys.len());
        for (column, target) in &foreign_keys {
            let mut keys: Vec<Value> = Vec::new();
            for row in &rows {
                if let Some(value) = row.get(column) {
                    if !value.is_null() && !keys.contains(value) {
                        keys.push(value.clone());
                    }
                }
            }

            let statement = compiler.select_by_primary_keys(&target.name, &keys)?;
            let resolved = Self::query_locked(&mut state, &statement).await?;

            let mut lookup = Vec::with_capacity(resolved.len());
            for row in resolved {
                let row = decode_row(target, row)?;
                let key = row
                    .get(&target.primary_key)
                    .cloned()
                    .ok_or_else(|| err!("resolved row is missing its primary key"))?;
                lookup.push((key, row));
            }
            lookups.push(lookup);
        }

        let mut out = Vec::with_capacity(rows.len());
        'rows: for mut row in rows {
            for (index, (column, _)) in foreign_keys.iter().enumerate() {
                let key = match row.get(column) {
                    Some(value) if !value.is_null() => value.clone(),
                    _ => continue 'rows,
                };
                let Some((_, target_row)) = lookups[index].iter().find(|(k, _)| *k == key)
                else {
                    continue 'rows;
                };
                row.insert(*column, Value::Record(target_row.clone()));
            }
            out.push(row);
        }
        Ok(out)
    }

    pub async fn insert_row(&self, table: &str, row: Row) -> Result<()> {
        self.insert_rows(table, vec![row]).await
    }

    /// Inserts rows in batches, each batch inside one engine transaction.
    pub async fn insert_rows(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        debug!(table, rows = rows.len(), "insert");
        let compiler = Compiler::new(&self.schema);

        let mut state = self.state.lock().await;
        for chunk in rows.chunks(self.max_batch_size) {
            let statements = compiler.insert_rows(table, chunk)?;
            state.connection.execute_in_transaction(&statements).await?;
        }
        state.observers.notify(&ChangeEvent::Inserted {
            table: table.to_string(),
            rows,
        });
        Ok(())
    }

    pub async fn upsert_row(&self, table: &str, row: Row) -> Result<()> {
        self.upsert_rows(table, vec![row]).await
    }

    /// Upserts rows in batches. Observers receive the whole payload as an
    /// insert event.
    pub async fn upsert_rows(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        debug!(table, rows = rows.len(), "upsert");
        let compiler = Compiler::new(&self.schema);

        let mut state = self.state.lock().await;
        for chunk in rows.chunks(self.max_batch_size) {
            let statements = compiler.upsert_rows(table, chunk)?;
            state.connection.execute_in_transaction(&statements).await?;
        }
        state.observers.notify(&ChangeEvent::Inserted {
            table: table.to_string(),
            rows,
        });
        Ok(())
    }

    pub async fn update_row(&self, table: &str, row: Row) -> Result<()> {
        self.update_rows(table, vec![row]).await
    }

    /// Applies per-primary-key updates in batches.
    pub async fn update_rows(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        debug!(table, rows = rows.len(), "update");
        let compiler = Compiler::new(&self.schema);

        let mut state = self.state.lock().await;
        for chunk in rows.chunks(self.max_batch_size) {
            let statements = compiler.update_rows(table, chunk)?;
            if !statements.is_empty() {
                state.connection.execute_in_transaction(&statements).await?;
            }
        }
        state.observers.notify(&ChangeEvent::Updated {
            table: table.to_string(),
            rows,
        });
        Ok(())
    }

    pub async fn delete_row(&self, table: &str, key: Value) -> Result<()> {
        self.delete_rows(table, vec![key]).await
    }

    /// Deletes rows by primary key, shadows included.
    pub async fn delete_rows(&self, table: &str, keys: Vec<Value>) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        debug!(table, keys = keys.len(), "delete");
        let compiler = Compiler::new(&self.schema);

        let mut state = self.state.lock().await;
        for chunk in keys.chunks(self.max_batch_size) {
            let statements = compiler.delete_rows(table, chunk)?;
            state.connection.execute_in_transaction(&statements).await?;
        }
        state.observers.notify(&ChangeEvent::Deleted {
            table: table.to_string(),
            keys,
        });
        Ok(())
    }

    /// Deletes every row matching `filter`, returning the number deleted.
    ///
    /// Compiled as a select of matching primary keys followed by
    /// delete-by-key, under a single lock acquisition so no writer can slip
    /// between the two.
    pub async fn delete_where(&self, table: &str, filter: Condition) -> Result<u64> {
        let table = self.schema.table(table)?;
        let compiler = Compiler::new(&self.schema);

        let mut query = Query::new(&table.name);
        query.filter = Some(filter);
        let select = compiler.select(&query)?;

        let mut state = self.state.lock().await;
        let rows = Self::query_locked(&mut state, &select).await?;
        let keys: Vec<Value> = rows
            .iter()
            .map(|row| {
                row.get(&table.primary_key)
                    .cloned()
                    .ok_or_else(|| err!("selected row is missing its primary key"))
            })
            .collect::<Result<_>>()?;
        debug!(table = %table.name, keys = keys.len(), "delete matching");
        if keys.is_empty() {
            return Ok(0);
        }

        let count = keys.len() as u64;
        for chunk in keys.chunks(self.max_batch_size) {
            let statements = compiler.delete_rows(&table.name, chunk)?;
            state.connection.execute_in_transaction(&statements).await?;
        }
        state.observers.notify(&ChangeEvent::Deleted {
            table: table.name.clone(),
            keys,
        });
        Ok(count)
    }

    /// Removes shadow rows whose origin row is gone, returning the orphan
    /// count per shadow table.
    pub async fn garbage_collect(&self, table: &str) -> Result<IndexMap<String, u64>> {
        let plan = Compiler::new(&self.schema).garbage_collect(table)?;

        let mut state = self.state.lock().await;
        let mut reclaimed = IndexMap::new();
        let mut deletes = Vec::new();
        for sweep in &plan.sweeps {
            let rows = Self::query_locked(&mut state, &sweep.count).await?;
            let orphans = rows
                .first()
                .and_then(|row| row.get("orphans"))
                .and_then(Value::as_i64)
                .unwrap_or(0) as u64;
            reclaimed.insert(sweep.shadow_table.clone(), orphans);
            deletes.push(sweep.delete.clone());
        }
        if !deletes.is_empty() {
            state.connection.execute_in_transaction(&deletes).await?;
        }

        let total: u64 = reclaimed.values().sum();
        if total > 0 {
            warn!(
                table = %plan.table,
                orphans = total,
                "garbage collection reclaimed orphaned shadow rows"
            );
        }
        Ok(reclaimed)
    }

    /// Row counts for every physical table, shadows included.
    pub async fn db_stat(&self) -> Result<IndexMap<String, u64>> {
        let compiler = Compiler::new(&self.schema);
        let mut statements = Vec::new();
        for table in self.schema.tables.keys() {
            statements.extend(compiler.stat(table)?);
        }

        let mut state = self.state.lock().await;
        let mut counts = IndexMap::new();
        for (name, statement) in statements {
            let rows = Self::query_locked(&mut state, &statement).await?;
            let count = rows
                .first()
                .and_then(|row| row.get("rows"))
                .and_then(Value::as_i64)
                .unwrap_or(0) as u64;
            counts.insert(name, count);
        }
        Ok(counts)
    }

    /// Registers a change observer for `table`.
    pub async fn observe(
        &self,
        table: impl Into<String>,
        observer: impl FnMut(&ChangeEvent) + Send + 'static,
    ) -> ObserverId {
        let mut state = self.state.lock().await;
        state.observers.observe(table, Box::new(observer) as Observer)
    }

    /// Removes an observer; returns whether it was registered.
    pub async fn remove_observer(&self, id: ObserverId) -> bool {
        let mut state = self.state.lock().await;
        state.observers.remove(id)
    }

    /// Drops all observers and closes the connection.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.observers.clear();
        state.connection.close();
        info!("database closed");
    }

    async fn query_locked(state: &mut State, statement: &SqlStatement) -> Result<Vec<Row>> {
        let response = state.connection.execute(statement).await?;
        match response.rows {
            Rows::Values(rows) => Ok(rows),
            Rows::Count(_) => Err(err!("statement unexpectedly returned no result columns")),
        }
    }
}
