//! Value encoding at the statement boundary.
//!
//! Array and JSON values are bound as JSON text and wrapped in `json(?)` in
//! the statement itself, so correctness never depends on driver-level JSON
//! binding. Vector values are bound as raw little-endian element buffers,
//! the layout the `vec0` virtual table stores.

use umbra_core::schema::{ColumnKind, VectorElement};
use umbra_core::stmt::{QueryVector, Value};
use umbra_core::{err, Error, Result};

use zerocopy::AsBytes;

/// Encodes a value for a main-table column. `None` and `Null` both bind NULL.
pub(crate) fn main_value(
    table: &str,
    column: &str,
    kind: &ColumnKind,
    value: Option<&Value>,
) -> Result<Value> {
    let Some(value) = value else {
        return Ok(Value::Null);
    };
    if value.is_null() {
        return Ok(Value::Null);
    }

    let encoded = match kind {
        ColumnKind::Number => match value {
            Value::I64(v) => Some(Value::I64(*v)),
            _ => None,
        },
        ColumnKind::Bool => value.as_bool().map(|v| Value::I64(v as i64)),
        ColumnKind::String => value.as_str().map(Value::from),
        ColumnKind::Bytes => value.as_blob().map(|v| Value::Blob(v.to_vec())),
        ColumnKind::StringArray => match value.as_list() {
            Some(items) => {
                let mut strings = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_str() {
                        Some(s) => strings.push(s),
                        None => {
                            return Err(Error::type_conversion(item, "String").context(err!(
                                "invalid element for array column `{table}`.`{column}`"
                            )))
                        }
                    }
                }
                Some(Value::String(serde_json::to_string(&strings)?))
            }
            None => None,
        },
        ColumnKind::Json => value
            .as_json()
            .map(|json| Ok::<_, Error>(Value::String(serde_json::to_string(json)?)))
            .transpose()?,
        // A foreign key holds the raw primary key of the target row, which
        // is a number or a string depending on the target table.
        ColumnKind::ForeignKey { .. } => match value {
            Value::I64(v) => Some(Value::I64(*v)),
            Value::String(v) => Some(Value::String(v.clone())),
            _ => None,
        },
        ColumnKind::FullText | ColumnKind::Vector { .. } => {
            return Err(Error::query_compile(format!(
                "column `{table}`.`{column}` is not stored in the main table"
            )))
        }
    };

    encoded.ok_or_else(|| {
        Error::type_conversion(value, kind_name(kind))
            .context(err!("invalid value for column `{table}`.`{column}`"))
    })
}

/// Encodes a full-text value for the shadow table, folding typographic
/// quotes to their ASCII equivalents so index lookups do not depend on which
/// quote style a writer used.
pub(crate) fn full_text_value(
    table: &str,
    column: &str,
    value: Option<&Value>,
) -> Result<Value> {
    match value {
        None | Some(Value::Null) => Ok(Value::Null),
        Some(Value::String(text)) => Ok(Value::String(fold_smart_quotes(text))),
        Some(other) => Err(Error::type_conversion(other, "String")
            .context(err!("invalid value for full-text column `{table}`.`{column}`"))),
    }
}

/// Encodes a vector value as the little-endian buffer the shadow table
/// stores, checking dimension and element kind against the declaration.
pub(crate) fn vector_value(
    table: &str,
    column: &str,
    dimension: usize,
    element: VectorElement,
    value: &Value,
) -> Result<Value> {
    let Some(items) = value.as_list() else {
        return Err(Error::type_conversion(value, "List")
            .context(err!("invalid value for vector column `{table}`.`{column}`")));
    };
    if items.len() != dimension {
        return Err(Error::query_compile(format!(
            "vector column `{table}`.`{column}` expects dimension {dimension}, got {}",
            items.len()
        )));
    }

    match element {
        VectorElement::F32 => {
            let mut buf = Vec::with_capacity(dimension);
            for item in items {
                let Some(v) = item.as_f64() else {
                    return Err(Error::type_conversion(item, "f32")
                        .context(err!("invalid element for `{table}`.`{column}`")));
                };
                buf.push(v as f32);
            }
            Ok(Value::Blob(buf.as_bytes().to_vec()))
        }
        VectorElement::I8 => {
            let mut buf = Vec::with_capacity(dimension);
            for item in items {
                let element = item
                    .as_i64()
                    .and_then(|v| i8::try_from(v).ok())
                    .ok_or_else(|| {
                        Error::type_conversion(item, "i8")
                            .context(err!("invalid element for `{table}`.`{column}`"))
                    })?;
                buf.push(element);
            }
            Ok(Value::Blob(buf.as_bytes().to_vec()))
        }
    }
}

/// Encodes a query vector for a `MATCH` parameter.
pub(crate) fn query_vector_blob(vector: &QueryVector) -> Value {
    match vector {
        QueryVector::F32(v) => Value::Blob(v.as_bytes().to_vec()),
        QueryVector::I8(v) => Value::Blob(v.as_bytes().to_vec()),
    }
}

/// Folds typographic quotes and apostrophes to ASCII.
pub(crate) fn fold_smart_quotes(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            ch => ch,
        })
        .collect()
}

fn kind_name(kind: &ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Number => "Number",
        ColumnKind::Bool => "Bool",
        ColumnKind::String => "String",
        ColumnKind::StringArray => "StringArray",
        ColumnKind::Bytes => "Bytes",
        ColumnKind::Json => "Json",
        ColumnKind::FullText => "FullText",
        ColumnKind::ForeignKey { .. } => "ForeignKey",
        ColumnKind::Vector { .. } => "Vector",
    }
}
