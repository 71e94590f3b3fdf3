use super::Row;
use crate::{Error, Result};

/// A single database value.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    /// Boolean value
    Bool(bool),

    /// Signed 64-bit integer
    I64(i64),

    /// 64-bit float
    F64(f64),

    /// Null value
    #[default]
    Null,

    /// String value
    String(String),

    /// Raw bytes
    Blob(Vec<u8>),

    /// A list of values of the same type
    List(Vec<Value>),

    /// An arbitrary JSON document
    Json(serde_json::Value),

    /// A nested row, produced by foreign-key resolution
    Record(Row),
}

impl Value {
    pub const fn null() -> Self {
        Self::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub const fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(v) => Some(*v),
            Self::I64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(&**v),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(v) => Some(&**v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(&**v),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Row> {
        match self {
            Self::Record(row) => Some(row),
            _ => None,
        }
    }

    pub fn to_bool(self) -> Result<bool> {
        match self {
            Self::Bool(v) => Ok(v),
            _ => Err(Error::type_conversion(&self, "bool")),
        }
    }

    pub fn to_i64(self) -> Result<i64> {
        match self {
            Self::I64(v) => Ok(v),
            _ => Err(Error::type_conversion(&self, "i64")),
        }
    }

    pub fn to_string(self) -> Result<String> {
        match self {
            Self::String(v) => Ok(v),
            _ => Err(Error::type_conversion(&self, "String")),
        }
    }

    pub fn to_record(self) -> Result<Row> {
        match self {
            Self::Record(row) => Ok(row),
            _ => Err(Error::type_conversion(&self, "Record")),
        }
    }

    #[track_caller]
    pub fn expect_string(&self) -> &str {
        match self {
            Self::String(v) => v,
            _ => panic!("expected String; value={self:#?}"),
        }
    }

    #[track_caller]
    pub fn expect_record(&self) -> &Row {
        match self {
            Self::Record(row) => row,
            _ => panic!("expected Record; value={self:#?}"),
        }
    }

    /// The variant name, used in conversion error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Bool",
            Self::I64(_) => "I64",
            Self::F64(_) => "F64",
            Self::Null => "Null",
            Self::String(_) => "String",
            Self::Blob(_) => "Blob",
            Self::List(_) => "List",
            Self::Json(_) => "Json",
            Self::Record(_) => "Record",
        }
    }

    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl AsRef<Self> for Value {
    fn as_ref(&self) -> &Self {
        self
    }
}

impl From<bool> for Value {
    fn from(src: bool) -> Self {
        Self::Bool(src)
    }
}

impl From<i64> for Value {
    fn from(src: i64) -> Self {
        Self::I64(src)
    }
}

impl From<i32> for Value {
    fn from(src: i32) -> Self {
        Self::I64(src as i64)
    }
}

impl From<f64> for Value {
    fn from(src: f64) -> Self {
        Self::F64(src)
    }
}

impl From<f32> for Value {
    fn from(src: f32) -> Self {
        Self::F64(src as f64)
    }
}

impl From<String> for Value {
    fn from(src: String) -> Self {
        Self::String(src)
    }
}

impl From<&String> for Value {
    fn from(src: &String) -> Self {
        Self::String(src.clone())
    }
}

impl From<&str> for Value {
    fn from(src: &str) -> Self {
        Self::String(src.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(src: Vec<u8>) -> Self {
        Self::Blob(src)
    }
}

impl From<Vec<Value>> for Value {
    fn from(src: Vec<Value>) -> Self {
        Self::List(src)
    }
}

impl From<serde_json::Value> for Value {
    fn from(src: serde_json::Value) -> Self {
        Self::Json(src)
    }
}

impl From<Row> for Value {
    fn from(src: Row) -> Self {
        Self::Record(src)
    }
}

impl From<Vec<String>> for Value {
    fn from(src: Vec<String>) -> Self {
        Self::List(src.into_iter().map(Value::String).collect())
    }
}

impl From<Vec<&str>> for Value {
    fn from(src: Vec<&str>) -> Self {
        Self::List(src.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<f32>> for Value {
    fn from(src: Vec<f32>) -> Self {
        Self::List(src.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<i64>> for Value {
    fn from(src: Vec<i64>) -> Self {
        Self::List(src.into_iter().map(Value::I64).collect())
    }
}

impl<T> From<Option<T>> for Value
where
    Self: From<T>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::from(value),
            None => Self::Null,
        }
    }
}
