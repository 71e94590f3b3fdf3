use super::{ColumnKind, ColumnType};
use crate::Result;

use indexmap::IndexMap;

/// A logical table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Name of the table
    pub name: String,

    /// The table's columns, in declaration order
    pub columns: IndexMap<String, ColumnType>,

    /// Name of the primary-key column
    pub primary_key: String,
}

impl Table {
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            columns: IndexMap::new(),
            primary_key: None,
        }
    }

    /// Returns the named column, or a compile error.
    pub fn column(&self, name: &str) -> Result<&ColumnType> {
        self.columns.get(name).ok_or_else(|| {
            crate::Error::query_compile(format!(
                "unknown column `{}` on table `{}`",
                name, self.name
            ))
        })
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnType> {
        self.columns.get(name)
    }

    /// The type of the primary-key column.
    pub fn primary_key_type(&self) -> Result<&ColumnType> {
        self.column(&self.primary_key)
    }

    /// Names of the table's full-text columns, in declaration order.
    pub fn full_text_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|(_, ty)| ty.is_full_text())
            .map(|(name, _)| name.as_str())
    }

    /// Names of the table's vector columns, in declaration order.
    pub fn vector_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|(_, ty)| ty.is_vector())
            .map(|(name, _)| name.as_str())
    }

    /// Foreign-key columns as `(column, target table)` pairs.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().filter_map(|(name, ty)| {
            ty.foreign_key_target()
                .map(|target| (name.as_str(), target))
        })
    }

    pub fn has_full_text(&self) -> bool {
        self.full_text_columns().next().is_some()
    }

    pub fn has_vectors(&self) -> bool {
        self.vector_columns().next().is_some()
    }
}

/// Fluent builder for [`Table`] definitions.
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    columns: IndexMap<String, ColumnType>,
    primary_key: Option<String>,
}

impl TableBuilder {
    /// Adds a column. Redefining a name replaces the earlier definition.
    pub fn column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.insert(name.into(), ColumnType::new(kind));
        self
    }

    /// Marks the most recently added column as kept on upsert.
    ///
    /// # Panics
    ///
    /// Panics if no column has been added yet.
    pub fn no_replace_on_upsert(mut self) -> Self {
        let (_, ty) = self
            .columns
            .last_mut()
            .expect("no_replace_on_upsert() must follow a column definition");
        ty.no_replace_on_upsert = true;
        self
    }

    /// Designates the primary-key column.
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }

    /// Returns the table. Structural invariants are checked when the schema
    /// is built, not here.
    pub fn build(self) -> Table {
        Table {
            name: self.name,
            columns: self.columns,
            primary_key: self.primary_key.unwrap_or_default(),
        }
    }
}
