//! Write-path compilation: inserts.
//!
//! One logical insert fans out into up to three statements, executed in
//! order: the main-table insert, a full-text shadow insert for rows with at
//! least one non-null full-text value, and a vector shadow insert for rows
//! with every vector value present (the vector virtual table cannot store
//! null vectors). Nothing at the engine level ties the shadows to the main
//! table; every mutation path maintains them by hand.

use super::{encode, Compiler};
use crate::serializer::{Comma, Formatter, Ident, ToSql};

use umbra_core::driver::SqlStatement;
use umbra_core::schema::{name, ColumnKind, Table};
use umbra_core::stmt::{Row, Value};
use umbra_core::{Error, Result};

impl Compiler<'_> {
    pub fn insert_rows(&self, table: &str, rows: &[Row]) -> Result<Vec<SqlStatement>> {
        let table = self.schema.table(table)?;
        if rows.is_empty() {
            return Ok(vec![]);
        }
        self.check_rows(table, rows)?;

        let (sql, params) = self.insert_statement(table, rows)?;
        let mut statements = vec![SqlStatement::new(sql, params)];
        if let Some(statement) = self.fts_insert(table, rows)? {
            statements.push(statement);
        }
        if let Some(statement) = self.vector_insert(table, rows)? {
            statements.push(statement);
        }
        Ok(statements)
    }

    /// Rejects unknown fields and rows without a primary key before any
    /// statement is built.
    pub(super) fn check_rows(&self, table: &Table, rows: &[Row]) -> Result<()> {
        for row in rows {
            for field in row.columns() {
                table.column(field)?;
            }
            match row.get(&table.primary_key) {
                Some(value) if !value.is_null() => {}
                _ => {
                    return Err(Error::query_compile(format!(
                        "row for table `{}` is missing primary key `{}`",
                        table.name, table.primary_key
                    )))
                }
            }
        }
        Ok(())
    }

    /// `INSERT INTO "<table>" (...) VALUES (...), ...` over the main-table
    /// columns. Returned as parts so the upsert path can append its conflict
    /// clause.
    pub(super) fn insert_statement(
        &self,
        table: &Table,
        rows: &[Row],
    ) -> Result<(String, Vec<Value>)> {
        let columns: Vec<(&str, &ColumnKind)> = Self::main_columns(table).collect();

        let mut sql = String::new();
        let mut params = Vec::new();
        let mut f = Formatter::new(&mut sql, &mut params);

        fmt!(
            &mut f,
            "INSERT INTO ",
            Ident(&table.name),
            " (",
            Comma(columns.iter().map(|(name, _)| Ident(*name))),
            ") VALUES ",
        );

        let mut s = "";
        for row in rows {
            fmt!(&mut f, s, '(');
            let mut inner = "";
            for (column, kind) in &columns {
                let value = encode::main_value(&table.name, column, kind, row.get(column))?;
                let p = f.param(&value);
                match kind {
                    ColumnKind::StringArray | ColumnKind::Json => {
                        fmt!(&mut f, inner, "json(", p, ')');
                    }
                    _ => fmt!(&mut f, inner, p),
                }
                inner = ", ";
            }
            fmt!(&mut f, ')');
            s = ", ";
        }

        drop(f);
        Ok((sql, params))
    }

    /// Shadow insert for rows with at least one non-null full-text value.
    pub(super) fn fts_insert(&self, table: &Table, rows: &[Row]) -> Result<Option<SqlStatement>> {
        if !table.has_full_text() {
            return Ok(None);
        }
        let columns: Vec<&str> = table.full_text_columns().collect();
        let qualifying: Vec<&Row> = rows
            .iter()
            .filter(|row| {
                columns
                    .iter()
                    .any(|column| row.get(column).is_some_and(|value| !value.is_null()))
            })
            .collect();
        if qualifying.is_empty() {
            return Ok(None);
        }

        let fts = name::fts_table(&table.name);
        let mut sql = String::new();
        let mut params = Vec::new();
        let mut f = Formatter::new(&mut sql, &mut params);

        fmt!(
            &mut f,
            "INSERT INTO ",
            Ident(&fts),
            " (",
            Ident(name::ORIGIN_PK),
            ", ",
            Comma(columns.iter().map(|name| Ident(*name))),
            ") VALUES ",
        );

        let mut s = "";
        for row in qualifying {
            let pk = self.primary_key_param(table, row)?;
            fmt!(&mut f, s, '(');
            let p = f.param(&pk);
            fmt!(&mut f, p);
            for column in &columns {
                let value = encode::full_text_value(&table.name, column, row.get(column))?;
                let p = f.param(&value);
                fmt!(&mut f, ", ", p);
            }
            fmt!(&mut f, ')');
            s = ", ";
        }

        drop(f);
        Ok(Some(SqlStatement::new(sql, params)))
    }

    /// Shadow insert for rows carrying every vector value.
    pub(super) fn vector_insert(
        &self,
        table: &Table,
        rows: &[Row],
    ) -> Result<Option<SqlStatement>> {
        if !table.has_vectors() {
            return Ok(None);
        }
        let columns: Vec<&str> = table.vector_columns().collect();
        let qualifying: Vec<&Row> = rows
            .iter()
            .filter(|row| {
                columns
                    .iter()
                    .all(|column| row.get(column).is_some_and(|value| !value.is_null()))
            })
            .collect();
        if qualifying.is_empty() {
            return Ok(None);
        }

        let vtab = name::vector_table(&table.name);
        let mut sql = String::new();
        let mut params = Vec::new();
        let mut f = Formatter::new(&mut sql, &mut params);

        fmt!(
            &mut f,
            "INSERT INTO ",
            Ident(&vtab),
            " (",
            Ident(name::ORIGIN_PK),
            ", ",
            Comma(columns.iter().map(|name| Ident(*name))),
            ") VALUES ",
        );

        let mut s = "";
        for row in qualifying {
            let pk = self.primary_key_param(table, row)?;
            fmt!(&mut f, s, '(');
            let p = f.param(&pk);
            fmt!(&mut f, p);
            for column in &columns {
                let ColumnKind::Vector { dimension, element } = &table.column(column)?.kind
                else {
                    unreachable!("vector_columns() yields only vector columns");
                };
                let value = encode::vector_value(
                    &table.name,
                    column,
                    *dimension,
                    *element,
                    &row[*column],
                )?;
                let p = f.param(&value);
                fmt!(&mut f, ", ", p);
            }
            fmt!(&mut f, ')');
            s = ", ";
        }

        drop(f);
        Ok(Some(SqlStatement::new(sql, params)))
    }

    /// The row's primary key, encoded for binding.
    pub(super) fn primary_key_param(&self, table: &Table, row: &Row) -> Result<Value> {
        let kind = &table.primary_key_type()?.kind;
        encode::main_value(
            &table.name,
            &table.primary_key,
            kind,
            row.get(&table.primary_key),
        )
    }
}
