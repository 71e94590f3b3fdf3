use super::Condition;
use crate::schema::VectorElement;

use indexmap::IndexMap;

/// A compiled-ready description of a single-table read.
///
/// Descriptors are plain data: building one performs no validation and no
/// I/O. Validation happens when the descriptor is compiled against a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Table the query reads from
    pub table: String,

    /// Row filter, if any
    pub filter: Option<Condition>,

    /// Result ordering, if any
    pub order_by: Option<OrderBy>,

    /// Vector search to join against, if any
    pub vector: Option<VectorQuery>,

    /// Maximum number of rows to return
    pub limit: Option<u64>,
}

impl Query {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            order_by: None,
            vector: None,
            limit: None,
        }
    }
}

/// Result ordering for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to order by; may reference `$distance(<column>)`
    pub column: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// A k-nearest-neighbor search over one or more vector columns.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    /// Query vector per vector column, in declaration order
    pub vectors: IndexMap<String, QueryVector>,

    /// Number of nearest matches requested per column
    pub k: u32,
}

impl VectorQuery {
    pub fn new(k: u32) -> Self {
        Self {
            vectors: IndexMap::new(),
            k,
        }
    }

    pub fn vector(mut self, column: impl Into<String>, vector: impl Into<QueryVector>) -> Self {
        self.vectors.insert(column.into(), vector.into());
        self
    }
}

/// A query vector, typed to match the schema's element kind.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryVector {
    F32(Vec<f32>),
    I8(Vec<i8>),
}

impl QueryVector {
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::I8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element(&self) -> VectorElement {
        match self {
            Self::F32(_) => VectorElement::F32,
            Self::I8(_) => VectorElement::I8,
        }
    }
}

impl From<Vec<f32>> for QueryVector {
    fn from(src: Vec<f32>) -> Self {
        Self::F32(src)
    }
}

impl From<Vec<i8>> for QueryVector {
    fn from(src: Vec<i8>) -> Self {
        Self::I8(src)
    }
}

impl From<&[f32]> for QueryVector {
    fn from(src: &[f32]) -> Self {
        Self::F32(src.to_vec())
    }
}
