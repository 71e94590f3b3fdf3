//! Fluent query construction.
//!
//! [`TableQuery`] accumulates a query descriptor and executes it through the
//! database handle it was created from. The typed column handles build
//! condition leaves with the operators their kind supports; the compiler
//! still validates every reference against the schema, so a handle of the
//! wrong kind fails at execution rather than silently matching nothing.

use crate::Db;

use umbra_core::schema::name;
use umbra_core::stmt::{
    Condition, Direction, Operator, OrderBy, Query, QueryVector, Row, Value,
};
use umbra_core::Result;

/// A query against one table, built fluently and executed with
/// [`all`](TableQuery::all), [`one`](TableQuery::one),
/// [`exists`](TableQuery::exists) or [`delete`](TableQuery::delete).
pub struct TableQuery {
    db: Db,
    query: Query,
}

impl TableQuery {
    pub(crate) fn new(db: Db, table: impl Into<String>) -> Self {
        Self {
            db,
            query: Query::new(table),
        }
    }

    /// Adds a filter; successive calls are combined under AND.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.query.filter = Some(match self.query.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.query.order_by = Some(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Requests the `k` nearest neighbors of `vector` on a vector column.
    /// Additional calls add further columns to the same search; the last
    /// call's `k` wins.
    pub fn nearest(
        mut self,
        column: impl Into<String>,
        vector: impl Into<QueryVector>,
        k: u32,
    ) -> Self {
        let mut search = self
            .query
            .vector
            .take()
            .unwrap_or_else(|| umbra_core::stmt::VectorQuery::new(k));
        search.k = k;
        self.query.vector = Some(search.vector(column, vector));
        self
    }

    /// The accumulated descriptor, for execution elsewhere.
    pub fn into_query(self) -> Query {
        self.query
    }

    pub async fn all(self) -> Result<Vec<Row>> {
        self.db.select(&self.query).await
    }

    pub async fn one(self) -> Result<Option<Row>> {
        self.db.select_one(&self.query).await
    }

    pub async fn exists(self) -> Result<bool> {
        self.db.exists(&self.query).await
    }

    /// Deletes every matching row, returning the number deleted.
    pub async fn delete(self) -> Result<u64> {
        let filter = self.query.filter.unwrap_or_else(|| Condition::all([]));
        self.db.delete_where(&self.query.table, filter).await
    }
}

/// Handle to a string column.
pub fn text(column: impl Into<String>) -> TextColumn {
    TextColumn(column.into())
}

/// Handle to a numeric column.
pub fn number(column: impl Into<String>) -> NumberColumn {
    NumberColumn(column.into())
}

/// Handle to a boolean column.
pub fn boolean(column: impl Into<String>) -> BoolColumn {
    BoolColumn(column.into())
}

/// Handle to a string-array column.
pub fn array(column: impl Into<String>) -> ArrayColumn {
    ArrayColumn(column.into())
}

/// Handle to a full-text column.
pub fn full_text(column: impl Into<String>) -> FullTextColumn {
    FullTextColumn(column.into())
}

/// Handle to the match distance of a vector column queried with
/// [`TableQuery::nearest`].
pub fn distance(column: &str) -> DistanceColumn {
    DistanceColumn(name::distance_ref(column))
}

pub struct TextColumn(String);

impl TextColumn {
    pub fn equals(&self, value: impl Into<String>) -> Condition {
        Condition::cmp(&self.0, Operator::Equals, value.into())
    }

    pub fn not_equals(&self, value: impl Into<String>) -> Condition {
        Condition::cmp(&self.0, Operator::NotEquals, value.into())
    }

    pub fn equals_any_of(&self, values: Vec<String>) -> Condition {
        Condition::cmp(&self.0, Operator::EqualsAnyOf, values)
    }

    pub fn not_equals_any_of(&self, values: Vec<String>) -> Condition {
        Condition::cmp(&self.0, Operator::NotEqualsAnyOf, values)
    }

    pub fn contains(&self, value: impl Into<String>) -> Condition {
        Condition::cmp(&self.0, Operator::Contains, value.into())
    }

    pub fn not_contains(&self, value: impl Into<String>) -> Condition {
        Condition::cmp(&self.0, Operator::NotContains, value.into())
    }

    pub fn flexibly_matches(&self, value: impl Into<String>) -> Condition {
        Condition::cmp(&self.0, Operator::FlexiblyMatches, value.into())
    }
}

pub struct NumberColumn(String);

impl NumberColumn {
    pub fn equals(&self, value: i64) -> Condition {
        Condition::cmp(&self.0, Operator::Equals, value)
    }

    pub fn not_equals(&self, value: i64) -> Condition {
        Condition::cmp(&self.0, Operator::NotEquals, value)
    }

    pub fn equals_any_of(&self, values: Vec<i64>) -> Condition {
        Condition::cmp(&self.0, Operator::EqualsAnyOf, values)
    }

    pub fn greater_than(&self, value: i64) -> Condition {
        Condition::cmp(&self.0, Operator::GreaterThan, value)
    }

    pub fn greater_than_or_equal(&self, value: i64) -> Condition {
        Condition::cmp(&self.0, Operator::GreaterThanOrEqual, value)
    }

    pub fn less_than(&self, value: i64) -> Condition {
        Condition::cmp(&self.0, Operator::LessThan, value)
    }

    pub fn less_than_or_equal(&self, value: i64) -> Condition {
        Condition::cmp(&self.0, Operator::LessThanOrEqual, value)
    }
}

pub struct BoolColumn(String);

impl BoolColumn {
    pub fn is(&self, value: bool) -> Condition {
        Condition::cmp(&self.0, Operator::Equals, value)
    }
}

pub struct ArrayColumn(String);

impl ArrayColumn {
    pub fn contains(&self, value: impl Into<String>) -> Condition {
        Condition::cmp(&self.0, Operator::ArrayContains, value.into())
    }

    pub fn does_not_contain(&self, value: impl Into<String>) -> Condition {
        Condition::cmp(&self.0, Operator::ArrayDoesNotContain, value.into())
    }

    pub fn contains_all_of(&self, values: Vec<String>) -> Condition {
        Condition::cmp(&self.0, Operator::ArrayContainsAllOf, values)
    }

    pub fn contains_any_of(&self, values: Vec<String>) -> Condition {
        Condition::cmp(&self.0, Operator::ArrayContainsAnyOf, values)
    }

    pub fn is_empty(&self) -> Condition {
        Condition::cmp(&self.0, Operator::ArrayIsEmpty, Value::Null)
    }

    pub fn not_empty(&self) -> Condition {
        Condition::cmp(&self.0, Operator::ArrayNotEmpty, Value::Null)
    }
}

pub struct FullTextColumn(String);

impl FullTextColumn {
    pub fn matches(&self, query: impl Into<String>) -> Condition {
        Condition::cmp(&self.0, Operator::Matches, query.into())
    }

    pub fn flexibly_matches(&self, query: impl Into<String>) -> Condition {
        Condition::cmp(&self.0, Operator::FlexiblyMatches, query.into())
    }
}

pub struct DistanceColumn(String);

impl DistanceColumn {
    pub fn less_than(&self, value: f64) -> Condition {
        Condition::cmp(&self.0, Operator::LessThan, value)
    }

    pub fn greater_than(&self, value: f64) -> Condition {
        Condition::cmp(&self.0, Operator::GreaterThan, value)
    }
}
