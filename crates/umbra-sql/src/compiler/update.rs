//! Write-path compilation: targeted updates.
//!
//! Updates are compiled per primary key. Shadow statements are emitted only
//! when the payload actually touches a full-text or vector column, so a
//! payload of plain columns costs exactly one statement.

use super::{encode, Compiler};
use crate::serializer::{Formatter, Ident, ToSql};

use umbra_core::driver::SqlStatement;
use umbra_core::schema::{name, ColumnKind, Table};
use umbra_core::stmt::Row;
use umbra_core::Result;

impl Compiler<'_> {
    pub fn update_rows(&self, table: &str, rows: &[Row]) -> Result<Vec<SqlStatement>> {
        let table = self.schema.table(table)?;
        self.check_rows(table, rows)?;

        let mut statements = Vec::new();
        for row in rows {
            if let Some(statement) = self.main_update(table, row)? {
                statements.push(statement);
            }
            if let Some(statement) = self.fts_update(table, row)? {
                statements.push(statement);
            }
            if let Some(statement) = self.vector_update(table, row)? {
                statements.push(statement);
            }
        }
        Ok(statements)
    }

    fn main_update(&self, table: &Table, row: &Row) -> Result<Option<SqlStatement>> {
        let touched: Vec<(&str, &ColumnKind)> = Self::main_columns(table)
            .filter(|(name, _)| *name != table.primary_key && row.contains(name))
            .collect();
        if touched.is_empty() {
            return Ok(None);
        }

        let mut sql = String::new();
        let mut params = Vec::new();
        let mut f = Formatter::new(&mut sql, &mut params);

        fmt!(&mut f, "UPDATE ", Ident(&table.name), " SET ");
        let mut s = "";
        for (column, kind) in touched {
            let value = encode::main_value(&table.name, column, kind, row.get(column))?;
            let p = f.param(&value);
            match kind {
                ColumnKind::StringArray | ColumnKind::Json => {
                    fmt!(&mut f, s, Ident(column), " = json(", p, ')');
                }
                _ => fmt!(&mut f, s, Ident(column), " = ", p),
            }
            s = ", ";
        }

        let pk = self.primary_key_param(table, row)?;
        let p = f.param(&pk);
        fmt!(&mut f, " WHERE ", Ident(&table.primary_key), " = ", p);

        drop(f);
        Ok(Some(SqlStatement::new(sql, params)))
    }

    fn fts_update(&self, table: &Table, row: &Row) -> Result<Option<SqlStatement>> {
        let touched: Vec<&str> = table
            .full_text_columns()
            .filter(|column| row.contains(column))
            .collect();
        if touched.is_empty() {
            return Ok(None);
        }

        let fts = name::fts_table(&table.name);
        let mut sql = String::new();
        let mut params = Vec::new();
        let mut f = Formatter::new(&mut sql, &mut params);

        fmt!(&mut f, "UPDATE ", Ident(&fts), " SET ");
        let mut s = "";
        for column in touched {
            let value = encode::full_text_value(&table.name, column, row.get(column))?;
            let p = f.param(&value);
            fmt!(&mut f, s, Ident(column), " = ", p);
            s = ", ";
        }

        let pk = self.primary_key_param(table, row)?;
        let p = f.param(&pk);
        fmt!(&mut f, " WHERE ", Ident(name::ORIGIN_PK), " = ", p);

        drop(f);
        Ok(Some(SqlStatement::new(sql, params)))
    }

    fn vector_update(&self, table: &Table, row: &Row) -> Result<Option<SqlStatement>> {
        let touched: Vec<&str> = table
            .vector_columns()
            .filter(|column| row.contains(column))
            .collect();
        if touched.is_empty() {
            return Ok(None);
        }

        let vtab = name::vector_table(&table.name);
        let mut sql = String::new();
        let mut params = Vec::new();
        let mut f = Formatter::new(&mut sql, &mut params);

        fmt!(&mut f, "UPDATE ", Ident(&vtab), " SET ");
        let mut s = "";
        for column in touched {
            let ColumnKind::Vector { dimension, element } = &table.column(column)?.kind else {
                unreachable!("vector_columns() yields only vector columns");
            };
            let value =
                encode::vector_value(&table.name, column, *dimension, *element, &row[column])?;
            let p = f.param(&value);
            fmt!(&mut f, s, Ident(column), " = ", p);
            s = ", ";
        }

        let pk = self.primary_key_param(table, row)?;
        let p = f.param(&pk);
        fmt!(&mut f, " WHERE ", Ident(name::ORIGIN_PK), " = ", p);

        drop(f);
        Ok(Some(SqlStatement::new(sql, params)))
    }
}
