//! Write-path compilation: upserts.
//!
//! The main table uses native conflict resolution: insert, and on a
//! primary-key conflict update every column except those flagged
//! `no_replace_on_upsert`, which keep their stored value. When no column is
//! eligible the conflict degrades to `DO NOTHING`. The virtual shadow tables
//! have no conflict resolution, so their rows are refreshed with a
//! delete-by-origin-key followed by a fresh insert; a reader interleaving
//! between the two would observe a missing shadow row, which is why callers
//! serialize logical operations.

use super::Compiler;
use crate::serializer::{Formatter, Ident, ToSql};

use umbra_core::driver::SqlStatement;
use umbra_core::schema::name;
use umbra_core::stmt::{Row, Value};
use umbra_core::Result;

impl Compiler<'_> {
    pub fn upsert_rows(&self, table: &str, rows: &[Row]) -> Result<Vec<SqlStatement>> {
        let table = self.schema.table(table)?;
        if rows.is_empty() {
            return Ok(vec![]);
        }
        self.check_rows(table, rows)?;

        let (mut sql, params) = self.insert_statement(table, rows)?;
        {
            let mut no_params: Vec<Value> = Vec::new();
            let mut f = Formatter::new(&mut sql, &mut no_params);

            let replaced: Vec<&str> = Self::main_columns(table)
                .map(|(name, _)| name)
                .filter(|name| *name != table.primary_key)
                .filter(|name| !table.columns[*name].no_replace_on_upsert)
                .collect();

            fmt!(&mut f, " ON CONFLICT (", Ident(&table.primary_key), ") ");
            if replaced.is_empty() {
                fmt!(&mut f, "DO NOTHING");
            } else {
                fmt!(&mut f, "DO UPDATE SET ");
                let mut s = "";
                for column in replaced {
                    fmt!(
                        &mut f,
                        s,
                        Ident(column),
                        " = excluded.",
                        Ident(column),
                    );
                    s = ", ";
                }
            }
        }
        let mut statements = vec![SqlStatement::new(sql, params)];

        // Shadow rows are refreshed for every written key, including keys
        // whose new payload has no shadow values (their old shadow rows must
        // go away).
        let keys: Vec<Value> = rows
            .iter()
            .map(|row| self.primary_key_param(table, row))
            .collect::<Result<_>>()?;

        if table.has_full_text() {
            statements.push(shadow_delete(&name::fts_table(&table.name), &keys));
            if let Some(statement) = self.fts_insert(table, rows)? {
                statements.push(statement);
            }
        }
        if table.has_vectors() {
            statements.push(shadow_delete(&name::vector_table(&table.name), &keys));
            if let Some(statement) = self.vector_insert(table, rows)? {
                statements.push(statement);
            }
        }
        Ok(statements)
    }
}

/// `DELETE FROM "<shadow>" WHERE "originPK" IN (...)`.
pub(super) fn shadow_delete(shadow: &str, keys: &[Value]) -> SqlStatement {
    let mut sql = String::new();
    let mut params = Vec::new();
    let mut f = Formatter::new(&mut sql, &mut params);

    fmt!(
        &mut f,
        "DELETE FROM ",
        Ident(shadow),
        " WHERE ",
        Ident(name::ORIGIN_PK),
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
    SqlStatement::new(sql, params)
}
