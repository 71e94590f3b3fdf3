use super::Value;

/// A filter over the rows of one table.
///
/// Conditions form a tree: leaves compare a single column against a value,
/// inner nodes combine their children with AND ([`Condition::All`]) or OR
/// ([`Condition::Any`]). An empty group is always true.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A single column comparison
    Where {
        column: String,
        op: Operator,
        value: Value,
    },

    /// Every child must hold
    All(Vec<Condition>),

    /// At least one child must hold
    Any(Vec<Condition>),
}

impl Condition {
    pub fn cmp(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self::Where {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::All(conditions.into_iter().collect())
    }

    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::Any(conditions.into_iter().collect())
    }

    /// Combines with `other` under AND, flattening nested `All` groups.
    pub fn and(self, other: Condition) -> Condition {
        match self {
            Condition::All(mut items) => {
                items.push(other);
                Condition::All(items)
            }
            first => Condition::All(vec![first, other]),
        }
    }

    /// Combines with `other` under OR, flattening nested `Any` groups.
    pub fn or(self, other: Condition) -> Condition {
        match self {
            Condition::Any(mut items) => {
                items.push(other);
                Condition::Any(items)
            }
            first => Condition::Any(vec![first, other]),
        }
    }
}

/// Comparison operators usable in condition leaves.
///
/// Which operators a leaf accepts depends on the kind of the referenced
/// column; the compiler rejects mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    EqualsAnyOf,
    NotEqualsAnyOf,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    NotContains,
    FlexiblyMatches,
    Matches,
    ArrayContains,
    ArrayDoesNotContain,
    ArrayContainsAllOf,
    ArrayContainsAnyOf,
    ArrayIsEmpty,
    ArrayNotEmpty,
}

impl Operator {
    /// The operator's public name, used in error messages.
    pub fn name(&self) -> &'static str {
        use Operator::*;

        match self {
            Equals => "equals",
            NotEquals => "notEquals",
            EqualsAnyOf => "equalsAnyOf",
            NotEqualsAnyOf => "notEqualsAnyOf",
            GreaterThan => "greaterThan",
            GreaterThanOrEqual => "greaterThanOrEqual",
            LessThan => "lessThan",
            LessThanOrEqual => "lessThanOrEqual",
            Contains => "contains",
            NotContains => "notContains",
            FlexiblyMatches => "flexiblyMatches",
            Matches => "matches",
            ArrayContains => "arrayContains",
            ArrayDoesNotContain => "arrayDoesNotContain",
            ArrayContainsAllOf => "arrayContainsAllOf",
            ArrayContainsAnyOf => "arrayContainsAnyOf",
            ArrayIsEmpty => "arrayIsEmpty",
            ArrayNotEmpty => "arrayNotEmpty",
        }
    }
}

/// A parsed condition column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    /// A column on the queried table
    Direct(String),

    /// A column on the table referenced by a foreign-key column, written
    /// `<fk column>.<remote column>`
    Foreign { column: String, remote: String },

    /// The match distance of a vector column, written `$distance(<column>)`
    Distance(String),
}

impl ColumnRef {
    pub fn parse(raw: &str) -> ColumnRef {
        if let Some(inner) = raw
            .strip_prefix("$distance(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return ColumnRef::Distance(inner.to_string());
        }
        match raw.split_once('.') {
            Some((column, remote)) => ColumnRef::Foreign {
                column: column.to_string(),
                remote: remote.to_string(),
            },
            None => ColumnRef::Direct(raw.to_string()),
        }
    }
}
