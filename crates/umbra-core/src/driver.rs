mod response;
pub use response::{Response, Rows};

use crate::{async_trait, stmt, Result};

/// A single SQL statement with its bound parameters.
///
/// Parameters are positional: `?1` in the text binds the first element of
/// `params`. Identifiers and other structural fragments are interpolated at
/// compile time, so statements of the same shape keep identical text.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<stmt::Value>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, params: Vec<stmt::Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A connection to a SQL engine capable of executing umbra statements.
///
/// Callers are responsible for serializing access; methods take `&mut self`
/// and implementations need not be re-entrant.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Executes a single statement.
    ///
    /// Statements producing result columns resolve to [`Rows::Values`];
    /// everything else resolves to [`Rows::Count`] with the number of rows
    /// the statement touched.
    async fn execute(&mut self, statement: &SqlStatement) -> Result<Response>;

    /// Executes every statement inside one transaction, in order. Either all
    /// statements commit or none do.
    async fn execute_in_transaction(&mut self, statements: &[SqlStatement]) -> Result<()>;

    /// Releases resources held by the connection, including any cached
    /// prepared statements.
    fn close(&mut self) {}
}
