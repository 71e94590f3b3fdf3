use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};

use umbra_core::stmt::Value;

/// A statement parameter borrowed from a compiled statement.
pub(crate) struct Param<'a>(pub(crate) &'a Value);

impl rusqlite::types::ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self.0 {
            Value::Null => Ok(ToSqlOutput::Owned(SqlValue::Null)),
            Value::Bool(true) => Ok(ToSqlOutput::Owned(SqlValue::Integer(1))),
            Value::Bool(false) => Ok(ToSqlOutput::Owned(SqlValue::Integer(0))),
            Value::I64(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v))),
            Value::F64(v) => Ok(ToSqlOutput::Owned(SqlValue::Real(*v))),
            Value::String(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes()))),
            Value::Blob(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Blob(&v[..]))),
            // The compilers bind arrays and JSON documents as text; a
            // structured value reaching the adapter is a bug upstream.
            Value::List(_) | Value::Json(_) | Value::Record(_) => {
                Err(rusqlite::Error::ToSqlConversionFailure(
                    format!("cannot bind {} parameter", self.0.variant_name()).into(),
                ))
            }
        }
    }
}

/// Converts one SQLite column value into a statement value.
///
/// SQLite's storage classes are narrower than the logical column kinds;
/// decoding back to the declared kind happens above the adapter.
pub(crate) fn from_sql(value: ValueRef<'_>) -> rusqlite::Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::I64(v),
        ValueRef::Real(v) => Value::F64(v),
        ValueRef::Text(v) => Value::String(
            std::str::from_utf8(v)
                .map_err(rusqlite::Error::Utf8Error)?
                .to_string(),
        ),
        ValueRef::Blob(v) => Value::Blob(v.to_vec()),
    })
}
