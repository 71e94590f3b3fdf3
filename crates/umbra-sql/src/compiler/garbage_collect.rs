//! Shadow-table reconciliation.
//!
//! Nothing cascades from a main table into its shadows at the engine level,
//! so deletes routed around umbra (and the upsert delete+insert refresh
//! pattern, interrupted at the wrong moment) can leave shadow rows whose
//! origin row is gone. Garbage collection finds and removes them; it is the
//! only reconciliation mechanism.

use super::Compiler;
use crate::serializer::{Formatter, Ident, ToSql};

use umbra_core::driver::SqlStatement;
use umbra_core::schema::{name, Table};
use umbra_core::Result;

/// The statements for one table's shadow sweep: a pre-count and a delete
/// per shadow table, each selecting origin keys with no main row.
pub struct GarbageCollectPlan {
    pub table: String,
    pub sweeps: Vec<ShadowSweep>,
}

pub struct ShadowSweep {
    pub shadow_table: String,
    pub count: SqlStatement,
    pub delete: SqlStatement,
}

impl Compiler<'_> {
    pub fn garbage_collect(&self, table: &str) -> Result<GarbageCollectPlan> {
        let table = self.schema.table(table)?;

        let mut sweeps = Vec::new();
        if table.has_full_text() {
            sweeps.push(sweep(table, name::fts_table(&table.name)));
        }
        if table.has_vectors() {
            sweeps.push(sweep(table, name::vector_table(&table.name)));
        }

        Ok(GarbageCollectPlan {
            table: table.name.clone(),
            sweeps,
        })
    }
}

fn sweep(table: &Table, shadow: String) -> ShadowSweep {
    let mut orphans = String::new();
    {
        let mut params: Vec<umbra_core::stmt::Value> = Vec::new();
        let mut f = Formatter::new(&mut orphans, &mut params);
        fmt!(
            &mut f,
            Ident(name::ORIGIN_PK),
            " NOT IN (SELECT ",
            Ident(&table.primary_key),
            " FROM ",
            Ident(&table.name),
            ')',
        );
    }

    let count = format!(
        "SELECT COUNT(*) AS \"orphans\" FROM {} WHERE {orphans}",
        quoted(&shadow)
    );
    let delete = format!("DELETE FROM {} WHERE {orphans}", quoted(&shadow));

    ShadowSweep {
        count: SqlStatement::new(count, vec![]),
        delete: SqlStatement::new(delete, vec![]),
        shadow_table: shadow,
    }
}

fn quoted(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
