//! Turns driver rows back into typed rows.
//!
//! The driver hands back SQLite's physical representation: booleans as
//! integers, arrays and JSON documents as text. Decoding walks the table's
//! columns in declaration order and rebuilds the typed value for each;
//! vector columns decode as their `$distance_<col>` field, never as the raw
//! vector.

use umbra_core::schema::{name, ColumnKind, Table};
use umbra_core::stmt::{Row, Value};
use umbra_core::{Error, Result};

pub fn decode_row(table: &Table, mut src: Row) -> Result<Row> {
    let mut out = Row::new();
    for (column, ty) in &table.columns {
        match &ty.kind {
            ColumnKind::Vector { .. } => {
                let field = name::distance_field(column);
                let value = match src.remove(&field).unwrap_or(Value::Null) {
                    Value::Null => Value::Null,
                    Value::F64(v) => Value::F64(v),
                    Value::I64(v) => Value::F64(v as f64),
                    other => return Err(Error::type_conversion(&other, "f64")),
                };
                out.insert(field, value);
            }
            ColumnKind::Bool => {
                let value = match src.remove(column).unwrap_or(Value::Null) {
                    Value::Null => Value::Null,
                    Value::I64(v) => Value::Bool(v != 0),
                    Value::Bool(v) => Value::Bool(v),
                    other => return Err(Error::type_conversion(&other, "bool")),
                };
                out.insert(column, value);
            }
            ColumnKind::StringArray => {
                let value = match src.remove(column).unwrap_or(Value::Null) {
                    Value::Null => Value::Null,
                    Value::String(text) => {
                        let items: Vec<String> = serde_json::from_str(&text)?;
                        Value::List(items.into_iter().map(Value::String).collect())
                    }
                    other => return Err(Error::type_conversion(&other, "StringArray")),
                };
                out.insert(column, value);
            }
            ColumnKind::Json => {
                let value = match src.remove(column).unwrap_or(Value::Null) {
                    Value::Null => Value::Null,
                    Value::String(text) => Value::Json(serde_json::from_str(&text)?),
                    other => return Err(Error::type_conversion(&other, "Json")),
                };
                out.insert(column, value);
            }
            _ => {
                out.insert(column, src.remove(column).unwrap_or(Value::Null));
            }
        }
    }
    Ok(out)
}
