//! Schema DDL.
//!
//! Every table compiles to up to three `CREATE ... IF NOT EXISTS`
//! statements: the main table with named primary-key and foreign-key
//! constraints (cascading deletes apply to main-table relationships only),
//! an fts5 shadow with trigram tokenization and diacritics removed, and a
//! vec0 shadow typed per column dimension and element kind. Shadow tables
//! carry no constraints at all; reconciliation is garbage collection's job.

use super::Compiler;
use crate::serializer::{Formatter, Ident, ToSql};

use umbra_core::driver::SqlStatement;
use umbra_core::schema::{name, ColumnKind, Table, VectorElement};
use umbra_core::Result;

impl Compiler<'_> {
    pub fn create_tables(&self) -> Result<Vec<SqlStatement>> {
        let mut statements = Vec::new();
        for table in self.schema.tables.values() {
            statements.push(self.main_table_ddl(table)?);
            if table.has_full_text() {
                statements.push(self.fts_ddl(table));
            }
            if table.has_vectors() {
                statements.push(self.vector_ddl(table)?);
            }
        }
        Ok(statements)
    }

    fn main_table_ddl(&self, table: &Table) -> Result<SqlStatement> {
        let mut sql = String::new();
        let mut params = Vec::new();
        let mut f = Formatter::new(&mut sql, &mut params);

        fmt!(&mut f, "CREATE TABLE IF NOT EXISTS ", Ident(&table.name), " (");
        for (column, ty) in Self::main_columns(table) {
            let physical = self.physical_type(ty)?;
            fmt!(&mut f, "\n    ", Ident(column), ' ', physical, ',');
        }

        fmt!(
            &mut f,
            "\n    CONSTRAINT ",
            Ident(&name::pk_constraint(&table.name)),
            " PRIMARY KEY (",
            Ident(&table.primary_key),
            ')',
        );

        for (column, target) in table.foreign_keys() {
            let target_table = self.schema.table(target)?;
            fmt!(
                &mut f,
                ",\n    CONSTRAINT ",
                Ident(&name::fk_constraint(&table.name, column)),
                " FOREIGN KEY (",
                Ident(column),
                ") REFERENCES ",
                Ident(target),
                " (",
                Ident(&target_table.primary_key),
                ") ON DELETE CASCADE",
            );
        }

        fmt!(&mut f, "\n)");
        drop(f);
        Ok(SqlStatement::new(sql, params))
    }

    fn fts_ddl(&self, table: &Table) -> SqlStatement {
        let fts = name::fts_table(&table.name);
        let mut sql = String::new();
        let mut params = Vec::new();
        let mut f = Formatter::new(&mut sql, &mut params);

        fmt!(
            &mut f,
            "CREATE VIRTUAL TABLE IF NOT EXISTS ",
            Ident(&fts),
            " USING fts5(",
            Ident(name::ORIGIN_PK),
            " UNINDEXED",
        );
        for column in table.full_text_columns() {
            fmt!(&mut f, ", ", Ident(column));
        }
        fmt!(&mut f, ", tokenize=\"trigram remove_diacritics 1\")");

        drop(f);
        SqlStatement::new(sql, params)
    }

    fn vector_ddl(&self, table: &Table) -> Result<SqlStatement> {
        let vtab = name::vector_table(&table.name);
        let pk_physical = self.physical_type(self.schema.resolved_primary_key_kind(table)?)?;

        let mut sql = String::new();
        let mut params = Vec::new();
        let mut f = Formatter::new(&mut sql, &mut params);

        fmt!(
            &mut f,
            "CREATE VIRTUAL TABLE IF NOT EXISTS ",
            Ident(&vtab),
            " USING vec0(",
            Ident(name::ORIGIN_PK),
            ' ',
            pk_physical,
            " PRIMARY KEY",
        );
        for column in table.vector_columns() {
            let ColumnKind::Vector { dimension, element } = &table.column(column)?.kind else {
                unreachable!("vector_columns() yields only vector columns");
            };
            // int8 is the spelling vec0 accepts for signed byte elements
            let element = match element {
                VectorElement::F32 => "float",
                VectorElement::I8 => "int8",
            };
            fmt!(&mut f, ", ", Ident(column), ' ', element, '[', *dimension, ']');
        }
        fmt!(&mut f, ')');

        drop(f);
        Ok(SqlStatement::new(sql, params))
    }
}
