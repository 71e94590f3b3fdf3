use crate::value::{from_sql, Param};
use crate::SqliteConfig;

use std::sync::Once;

use rusqlite::Connection as RusqliteConnection;
use tracing::{info, trace};
use umbra_core::driver::{Connection, Response, SqlStatement};
use umbra_core::stmt::Row;
use umbra_core::{async_trait, Error, Result};

/// Registration is process-global; every connection opened afterwards sees
/// the `vec0` module.
static VEC_EXTENSION: Once = Once::new();

fn register_vec_extension() {
    VEC_EXTENSION.call_once(|| {
        // SAFETY: `sqlite3_vec_init` is the extension entry point exported
        // by the sqlite-vec crate, and `sqlite3_auto_extension` expects the
        // generic extension init signature. This is the crate's documented
        // registration pattern.
        unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        }
    });
}

/// A single SQLite connection with a prepared-statement cache.
///
/// Methods take `&mut self` and are not re-entrant; the facade serializes
/// logical operations above this type.
pub struct SqliteConnection {
    connection: RusqliteConnection,
}

impl SqliteConnection {
    pub(crate) fn connect(config: SqliteConfig) -> Result<Self> {
        register_vec_extension();

        let connection = match &config.path {
            None => RusqliteConnection::open_in_memory().map_err(Error::execution)?,
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                RusqliteConnection::open(path).map_err(Error::execution)?
            }
        };

        let mut pragmas = String::new();
        if config.path.is_some() && config.wal_mode {
            pragmas.push_str("PRAGMA journal_mode = WAL;\nPRAGMA synchronous = NORMAL;\n");
        }
        pragmas.push_str("PRAGMA foreign_keys = ON;\n");
        pragmas.push_str(&format!(
            "PRAGMA busy_timeout = {};\n",
            config.busy_timeout_ms
        ));
        pragmas.push_str(&format!("PRAGMA cache_size = {};\n", config.cache_size));
        connection.execute_batch(&pragmas).map_err(Error::execution)?;

        info!(
            path = ?config.path,
            wal = config.wal_mode,
            "opened sqlite database"
        );
        Ok(Self { connection })
    }

    fn execute_statement(
        connection: &RusqliteConnection,
        statement: &SqlStatement,
    ) -> Result<Response> {
        trace!(sql = %statement.sql, params = statement.params.len(), "execute");

        let mut prepared = connection
            .prepare_cached(&statement.sql)
            .map_err(Error::execution)?;

        let params = rusqlite::params_from_iter(statement.params.iter().map(Param));

        if prepared.column_count() == 0 {
            let count = prepared.execute(params).map_err(Error::execution)?;
            return Ok(Response::count(count as u64));
        }

        let names: Vec<String> = prepared
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = prepared.query(params).map_err(Error::execution)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(Error::execution)? {
            let mut decoded = Row::new();
            for (index, name) in names.iter().enumerate() {
                let value = row.get_ref(index).map_err(Error::execution)?;
                decoded.insert(name, from_sql(value).map_err(Error::execution)?);
            }
            out.push(decoded);
        }
        Ok(Response::values(out))
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn execute(&mut self, statement: &SqlStatement) -> Result<Response> {
        Self::execute_statement(&self.connection, statement)
    }

    async fn execute_in_transaction(&mut self, statements: &[SqlStatement]) -> Result<()> {
        let transaction = self
            .connection
            .unchecked_transaction()
            .map_err(Error::execution)?;

        for statement in statements {
            Self::execute_statement(&transaction, statement)?;
        }

        transaction.commit().map_err(Error::execution)
    }

    fn close(&mut self) {
        self.connection.flush_prepared_statement_cache();
        info!("closed sqlite database");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::driver::Rows;

    #[tokio::test]
    async fn vec0_module_is_registered() {
        let mut connection = SqliteConfig::in_memory().connect().unwrap();

        let response = connection
            .execute(&SqlStatement::new(
                "CREATE VIRTUAL TABLE \"t_vector\" USING vec0(\
                 \"originPK\" INTEGER PRIMARY KEY, \"v\" float[2])",
                vec![],
            ))
            .await
            .unwrap();
        assert!(response.rows.is_count());
    }

    #[tokio::test]
    async fn queries_decode_named_columns() {
        use umbra_core::stmt::Value;

        let mut connection = SqliteConfig::in_memory().connect().unwrap();
        connection
            .execute_in_transaction(&[
                SqlStatement::new("CREATE TABLE \"t\" (\"id\" INTEGER, \"name\" TEXT)", vec![]),
                SqlStatement::new(
                    "INSERT INTO \"t\" (\"id\", \"name\") VALUES (?1, ?2)",
                    vec![Value::I64(1), Value::String("a".into())],
                ),
            ])
            .await
            .unwrap();

        let response = connection
            .execute(&SqlStatement::new("SELECT \"id\", \"name\" FROM \"t\"", vec![]))
            .await
            .unwrap();

        let Rows::Values(rows) = response.rows else {
            panic!("expected values");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], Value::I64(1));
        assert_eq!(rows[0]["name"], Value::String("a".into()));
    }

    #[tokio::test]
    async fn file_backed_database_persists() {
        use umbra_core::stmt::Value;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.sqlite");

        {
            let mut connection = SqliteConfig::file(&path).connect().unwrap();
            connection
                .execute_in_transaction(&[
                    SqlStatement::new("CREATE TABLE \"t\" (\"id\" INTEGER)", vec![]),
                    SqlStatement::new(
                        "INSERT INTO \"t\" (\"id\") VALUES (?1)",
                        vec![Value::I64(7)],
                    ),
                ])
                .await
                .unwrap();
            connection.close();
        }

        let mut connection = SqliteConfig::file(&path).connect().unwrap();
        let response = connection
            .execute(&SqlStatement::new("SELECT \"id\" FROM \"t\"", vec![]))
            .await
            .unwrap();
        assert_eq!(response.rows.into_values().len(), 1);
    }

    #[tokio::test]
    async fn failed_transaction_rolls_back() {
        use umbra_core::stmt::Value;

        let mut connection = SqliteConfig::in_memory().connect().unwrap();
        connection
            .execute(&SqlStatement::new(
                "CREATE TABLE \"t\" (\"id\" INTEGER PRIMARY KEY)",
                vec![],
            ))
            .await
            .unwrap();

        let err = connection
            .execute_in_transaction(&[
                SqlStatement::new("INSERT INTO \"t\" (\"id\") VALUES (?1)", vec![Value::I64(1)]),
                SqlStatement::new("INSERT INTO \"nope\" (\"id\") VALUES (?1)", vec![Value::I64(1)]),
            ])
            .await
            .unwrap_err();
        assert!(err.is_execution());

        let response = connection
            .execute(&SqlStatement::new("SELECT \"id\" FROM \"t\"", vec![]))
            .await
            .unwrap();
        assert!(response.rows.into_values().is_empty());
    }
}
