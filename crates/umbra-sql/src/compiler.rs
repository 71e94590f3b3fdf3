//! Compiles query descriptors and mutation payloads into SQL statements.
//!
//! A [`Compiler`] is bound to a schema and stateless beyond it. Every method
//! returns statement text plus bound parameters; identifiers and other
//! structural fragments are interpolated so repeated compilations of the same
//! shape produce byte-identical SQL, keeping the adapter's prepared-statement
//! cache effective. The one exception is the vector `k` count, which the
//! vector engine cannot take as a bound parameter.

mod condition;
mod create_table;
mod delete;
mod encode;
mod garbage_collect;
mod insert;
mod select;
mod stat;
mod update;
mod upsert;

pub use garbage_collect::{GarbageCollectPlan, ShadowSweep};

use umbra_core::schema::{ColumnKind, Schema, Table};
use umbra_core::{Error, Result};

pub struct Compiler<'a> {
    schema: &'a Schema,
}

impl<'a> Compiler<'a> {
    pub fn new(schema: &'a Schema) -> Compiler<'a> {
        Compiler { schema }
    }

    /// The SQLite storage type for a main-table column.
    ///
    /// Foreign keys take the storage type of the referenced table's primary
    /// key, resolved transitively. Full-text and vector columns have no main
    /// table storage and are rejected.
    fn physical_type(&self, kind: &ColumnKind) -> Result<&'static str> {
        match kind {
            ColumnKind::Number | ColumnKind::Bool => Ok("INTEGER"),
            ColumnKind::String | ColumnKind::StringArray | ColumnKind::Json => Ok("TEXT"),
            ColumnKind::Bytes => Ok("BLOB"),
            ColumnKind::ForeignKey { target } => {
                let target = self.schema.table(target)?;
                self.physical_type(self.schema.resolved_primary_key_kind(target)?)
            }
            ColumnKind::FullText | ColumnKind::Vector { .. } => Err(Error::query_compile(
                "full-text and vector columns have no main-table storage type",
            )),
        }
    }

    /// Columns stored in the main table, in declaration order.
    fn main_columns<'t>(table: &'t Table) -> impl Iterator<Item = (&'t str, &'t ColumnKind)> {
        table
            .columns
            .iter()
            .filter(|(_, ty)| !ty.is_full_text() && !ty.is_vector())
            .map(|(name, ty)| (name.as_str(), &ty.kind))
    }
}
