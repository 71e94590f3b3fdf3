#[macro_use]
mod fmt;
pub(crate) use fmt::ToSql;

mod delim;
pub(crate) use delim::Comma;

mod ident;
pub(crate) use ident::Ident;

mod params;
pub use params::{Params, Placeholder};

/// Destination of an in-progress SQL statement.
pub(crate) struct Formatter<'a, T> {
    /// Where to write the serialized SQL
    pub(crate) dst: &'a mut String,

    /// Where to store parameters
    pub(crate) params: &'a mut T,
}

impl<'a, T: Params> Formatter<'a, T> {
    pub(crate) fn new(dst: &'a mut String, params: &'a mut T) -> Self {
        Self { dst, params }
    }

    /// Binds `value`, returning the placeholder to serialize in its place.
    pub(crate) fn param(&mut self, value: &umbra_core::stmt::Value) -> Placeholder {
        self.params.push(value)
    }
}
