pub mod name;

mod column;
pub use column::{ColumnKind, ColumnType, VectorElement};

mod table;
pub use table::{Table, TableBuilder};

mod verify;

use crate::Result;

use indexmap::IndexMap;

/// A database schema: an ordered collection of logical tables.
///
/// A schema is immutable once built. Building runs verification, so every
/// `Schema` handed to the compilers is structurally sound.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Schema {
    /// The schema's tables, in declaration order
    pub tables: IndexMap<String, Table>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder { tables: vec![] }
    }

    /// Returns the table with the given name, or a compile error.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| crate::Error::query_compile(format!("unknown table `{name}`")))
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// The physical type of `table`'s primary key, following foreign-key
    /// primary keys to the table they reference.
    pub fn resolved_primary_key_kind<'s>(&'s self, table: &'s Table) -> Result<&'s ColumnKind> {
        let mut current = table;
        let mut seen = vec![];
        loop {
            let pk = current.primary_key_type()?;
            match &pk.kind {
                ColumnKind::ForeignKey { target } => {
                    if seen.contains(&current.name.as_str()) {
                        return Err(crate::Error::invalid_schema(format!(
                            "foreign-key cycle through primary key of table `{}`",
                            table.name
                        )));
                    }
                    seen.push(current.name.as_str());
                    current = self.table(target)?;
                }
                kind => return Ok(kind),
            }
        }
    }
}

/// Fluent builder for [`Schema`] definitions.
#[derive(Debug)]
pub struct SchemaBuilder {
    tables: Vec<Table>,
}

impl SchemaBuilder {
    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Verifies and returns the schema.
    pub fn build(self) -> Result<Schema> {
        let mut tables = IndexMap::new();
        for table in self.tables {
            if tables.contains_key(&table.name) {
                return Err(crate::Error::invalid_schema(format!(
                    "duplicate table `{}`",
                    table.name
                )));
            }
            tables.insert(table.name.clone(), table);
        }

        let schema = Schema { tables };
        schema.verify()?;
        Ok(schema)
    }
}
