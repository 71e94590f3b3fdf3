use super::{name, ColumnKind, Schema};
use crate::{Error, Result};

impl Schema {
    /// Checks structural invariants. Run once at build time so the compilers
    /// can assume every schema they see is sound.
    pub(super) fn verify(&self) -> Result<()> {
        for (table_name, table) in &self.tables {
            if table.columns.is_empty() {
                return Err(Error::invalid_schema(format!(
                    "table `{table_name}` has no columns"
                )));
            }

            if table.primary_key.is_empty() {
                return Err(Error::invalid_schema(format!(
                    "table `{table_name}` has no primary key"
                )));
            }

            let Some(pk) = table.get_column(&table.primary_key) else {
                return Err(Error::invalid_schema(format!(
                    "primary key `{}` is not a column of table `{table_name}`",
                    table.primary_key
                )));
            };

            if pk.is_full_text() || pk.is_vector() {
                return Err(Error::invalid_schema(format!(
                    "primary key `{table_name}`.`{}` cannot be a full-text or vector column",
                    table.primary_key
                )));
            }

            for (column_name, column) in &table.columns {
                if column_name.starts_with('$') {
                    return Err(Error::invalid_schema(format!(
                        "column `{table_name}`.`{column_name}` uses the reserved `$` prefix"
                    )));
                }

                match &column.kind {
                    ColumnKind::ForeignKey { target } => {
                        if !self.tables.contains_key(target) {
                            return Err(Error::invalid_schema(format!(
                                "foreign key `{table_name}`.`{column_name}` references \
                                 unknown table `{target}`"
                            )));
                        }
                    }
                    ColumnKind::Vector { dimension, .. } => {
                        if *dimension == 0 {
                            return Err(Error::invalid_schema(format!(
                                "vector column `{table_name}`.`{column_name}` must declare \
                                 a non-zero dimension"
                            )));
                        }
                    }
                    _ => {}
                }
            }

            // A user table must not occupy the name reserved for another
            // table's shadow.
            for other in self.tables.keys() {
                if *table_name == name::fts_table(other) || *table_name == name::vector_table(other)
                {
                    return Err(Error::invalid_schema(format!(
                        "table `{table_name}` collides with a shadow table derived \
                         for `{other}`"
                    )));
                }
            }

            // Primary keys may be foreign keys, but the chain they form must
            // bottom out at a concrete type.
            self.resolved_primary_key_kind(table)?;
        }

        Ok(())
    }
}
