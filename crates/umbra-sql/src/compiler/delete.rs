//! Write-path compilation: deletes by primary key.

use super::upsert::shadow_delete;
use super::Compiler;
use crate::serializer::{Formatter, Ident, ToSql};

use umbra_core::driver::SqlStatement;
use umbra_core::schema::name;
use umbra_core::stmt::Value;
use umbra_core::Result;

impl Compiler<'_> {
    /// Deletes rows by primary key from the main table and both shadows.
    /// An empty key set compiles to no statements at all.
    pub fn delete_rows(&self, table: &str, keys: &[Value]) -> Result<Vec<SqlStatement>> {
        let table = self.schema.table(table)?;
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let mut sql = String::new();
        let mut params = Vec::new();
        let mut f = Formatter::new(&mut sql, &mut params);

        fmt!(
            &mut f,
            "DELETE FROM ",
            Ident(&table.name),
            " WHERE ",
            Ident(&table.primary_key),
            " IN (",
        );
        let mut s = "";
        for key in keys {
            let p = f.param(key);
            fmt!(&mut f, s, p);
            s = ", ";
        }
        fmt!(&mut f, ')');
        drop(f);

        let mut statements = vec![SqlStatement::new(sql, params)];
        if table.has_full_text() {
            statements.push(shadow_delete(&name::fts_table(&table.name), keys));
        }
        if table.has_vectors() {
            statements.push(shadow_delete(&name::vector_table(&table.name), keys));
        }
        Ok(statements)
    }
}
