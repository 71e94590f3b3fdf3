/// The logical kind of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    /// Signed 64-bit integer
    Number,

    /// Boolean value
    Bool,

    /// UTF-8 string
    String,

    /// List of strings, stored as a JSON array
    StringArray,

    /// Raw bytes
    Bytes,

    /// Arbitrary JSON document
    Json,

    /// String indexed in the table's full-text shadow table
    FullText,

    /// Reference to the primary key of another table
    ForeignKey { target: String },

    /// Fixed-dimension embedding stored in the table's vector shadow table
    Vector {
        dimension: usize,
        element: VectorElement,
    },
}

/// Element type of a vector column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorElement {
    /// 32-bit float elements
    F32,

    /// Signed 8-bit integer elements
    I8,
}

impl ColumnKind {
    pub fn foreign_key(target: impl Into<String>) -> Self {
        Self::ForeignKey {
            target: target.into(),
        }
    }

    pub fn vector(dimension: usize, element: VectorElement) -> Self {
        Self::Vector { dimension, element }
    }

    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Number)
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }

    pub const fn is_string_array(&self) -> bool {
        matches!(self, Self::StringArray)
    }

    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }

    pub const fn is_full_text(&self) -> bool {
        matches!(self, Self::FullText)
    }

    pub const fn is_foreign_key(&self) -> bool {
        matches!(self, Self::ForeignKey { .. })
    }

    pub const fn is_vector(&self) -> bool {
        matches!(self, Self::Vector { .. })
    }
}

/// A column definition: its kind plus column-level flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    pub kind: ColumnKind,

    /// When `true`, upserts keep the stored value for this column instead of
    /// replacing it with the incoming one.
    pub no_replace_on_upsert: bool,
}

impl ColumnType {
    pub fn new(kind: ColumnKind) -> Self {
        Self {
            kind,
            no_replace_on_upsert: false,
        }
    }

    pub const fn is_full_text(&self) -> bool {
        self.kind.is_full_text()
    }

    pub const fn is_vector(&self) -> bool {
        self.kind.is_vector()
    }

    pub const fn is_foreign_key(&self) -> bool {
        self.kind.is_foreign_key()
    }

    /// Returns the foreign-key target table, if this column is a foreign key.
    pub fn foreign_key_target(&self) -> Option<&str> {
        match &self.kind {
            ColumnKind::ForeignKey { target } => Some(target),
            _ => None,
        }
    }
}

impl From<ColumnKind> for ColumnType {
    fn from(kind: ColumnKind) -> Self {
        Self::new(kind)
    }
}
