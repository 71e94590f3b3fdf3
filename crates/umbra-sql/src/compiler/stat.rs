//! Row-count statistics per physical table.

use super::Compiler;
use crate::serializer::{Formatter, Ident, ToSql};

use umbra_core::driver::SqlStatement;
use umbra_core::schema::name;
use umbra_core::Result;

impl Compiler<'_> {
    /// One `COUNT(*)` statement per physical table backing `table`: the main
    /// table plus whichever shadows exist.
    pub fn stat(&self, table: &str) -> Result<Vec<(String, SqlStatement)>> {
        let table = self.schema.table(table)?;

        let mut physical = vec![table.name.clone()];
        if table.has_full_text() {
            physical.push(name::fts_table(&table.name));
        }
        if table.has_vectors() {
            physical.push(name::vector_table(&table.name));
        }

        Ok(physical
            .into_iter()
            .map(|name| {
                let mut sql = String::new();
                let mut params = Vec::new();
                let mut f = Formatter::new(&mut sql, &mut params);
                fmt!(&mut f, "SELECT COUNT(*) AS \"rows\" FROM ", Ident(&name));
                drop(f);
                (name, SqlStatement::new(sql, params))
            })
            .collect())
    }
}
