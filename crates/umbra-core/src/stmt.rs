mod condition;
pub use condition::{ColumnRef, Condition, Operator};

mod query;
pub use query::{Direction, OrderBy, Query, QueryVector, VectorQuery};

mod row;
pub use row::Row;

mod value;
pub use value::Value;
