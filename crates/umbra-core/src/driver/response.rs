use crate::stmt::Row;

/// Result of executing one statement.
#[derive(Debug)]
pub struct Response {
    pub rows: Rows,
}

#[derive(Debug)]
pub enum Rows {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Operation result, as a list of rows
    Values(Vec<Row>),
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self {
            rows: Rows::Count(count),
        }
    }

    pub fn values(rows: Vec<Row>) -> Self {
        Self {
            rows: Rows::Values(rows),
        }
    }

    pub fn empty_values() -> Self {
        Self {
            rows: Rows::Values(vec![]),
        }
    }
}

impl Rows {
    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }

    pub fn is_values(&self) -> bool {
        matches!(self, Self::Values(_))
    }

    #[track_caller]
    pub fn into_count(self) -> u64 {
        match self {
            Rows::Count(count) => count,
            _ => panic!("expected a count response; rows={self:#?}"),
        }
    }

    #[track_caller]
    pub fn into_values(self) -> Vec<Row> {
        match self {
            Self::Values(values) => values,
            _ => panic!("expected a values response; rows={self:#?}"),
        }
    }
}
