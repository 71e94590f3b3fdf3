use super::{Formatter, ToSql};

use umbra_core::stmt;

/// Sink for statement parameters.
///
/// Pushing a value yields the placeholder to serialize in its place.
pub trait Params {
    fn push(&mut self, param: &stmt::Value) -> Placeholder;
}

/// A positional SQLite placeholder, serialized as `?N`.
pub struct Placeholder(pub usize);

impl Params for Vec<stmt::Value> {
    fn push(&mut self, value: &stmt::Value) -> Placeholder {
        self.push(value.clone());
        Placeholder(self.len())
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        use std::fmt::Write;

        write!(&mut f.dst, "?{}", self.0).unwrap();
    }
}
