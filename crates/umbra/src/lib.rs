//! Umbra is an embedded relational data-access layer with full-text and
//! vector search.
//!
//! A [`Db`] pairs a declared [`Schema`](schema::Schema) with a
//! [`Connection`]. Full-text and vector columns are backed by shadow tables
//! the layer keeps consistent with the main table on every write; queries
//! combine relational filters, full-text matching and nearest-neighbor
//! search in one descriptor.

mod db;
pub use db::{Builder, Db};

mod observer;
pub use observer::{ChangeEvent, Observer, ObserverId};

pub mod query;
pub use query::TableQuery;

pub use umbra_core::{row, schema, stmt, Connection, Error, Result};
